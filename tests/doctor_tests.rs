// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bankbook::commands::doctor;
use bankbook::coordinator::{Coordinator, RecordTransaction};
use bankbook::db;
use rusqlite::Connection;

fn setup() -> Coordinator {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO institutions(id, name) VALUES (1, 'Bank One');
        INSERT INTO accounts(id, name, institution_id) VALUES (1, 'Checking', 1);
        INSERT INTO categories(id, name, kind) VALUES
            (1, 'Salary', 'income'),
            (2, 'Groceries', 'expense');
        "#,
    )
    .unwrap();
    let mut coord = Coordinator::new(conn);
    for (amount, category) in [("100", 1), ("30", 2)] {
        coord
            .record_transaction(&RecordTransaction {
                account_id: 1,
                amount: amount.parse().unwrap(),
                category_id: category,
                is_transfer: false,
                target_account_id: None,
            })
            .unwrap();
    }
    coord
}

#[test]
fn healthy_ledger_has_no_findings() {
    let coord = setup();
    let findings = doctor::audit(coord.connection()).unwrap();
    assert!(findings.is_empty());
}

#[test]
fn stale_cached_balance_is_flagged() {
    let coord = setup();
    coord
        .connection()
        .execute("UPDATE accounts SET balance='999' WHERE id=1", [])
        .unwrap();
    let findings = doctor::audit(coord.connection()).unwrap();
    assert!(findings.iter().any(|f| f.issue == "stale_balance"));
}

#[test]
fn corrupted_audit_trail_is_flagged() {
    let coord = setup();
    coord
        .connection()
        .execute(
            "UPDATE balance_changes SET balance_after='12345'
             WHERE id=(SELECT MIN(id) FROM balance_changes)",
            [],
        )
        .unwrap();
    let findings = doctor::audit(coord.connection()).unwrap();
    assert!(findings.iter().any(|f| f.issue == "audit_trail_mismatch"));
}

#[test]
fn dangling_category_reference_is_flagged() {
    let coord = setup();
    coord
        .connection()
        .execute_batch(
            r#"
            PRAGMA foreign_keys = OFF;
            INSERT INTO transactions(account_id, amount, direction, category_id)
                VALUES (1, '10', 'debit', 77);
            PRAGMA foreign_keys = ON;
            "#,
        )
        .unwrap();
    let findings = doctor::audit(coord.connection()).unwrap();
    assert!(findings.iter().any(|f| f.issue == "missing_category"));
}

#[test]
fn repair_clears_findings_after_manual_edit() {
    let mut coord = setup();
    coord
        .connection()
        .execute("UPDATE accounts SET balance='999' WHERE id=1", [])
        .unwrap();
    assert!(!doctor::audit(coord.connection()).unwrap().is_empty());

    coord.recompute_account(1).unwrap();
    assert!(doctor::audit(coord.connection()).unwrap().is_empty());
}
