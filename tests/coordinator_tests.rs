// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bankbook::coordinator::{Coordinator, Receipt, RecordTransaction};
use bankbook::db;
use bankbook::error::LedgerError;
use rusqlite::Connection;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> Coordinator {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO institutions(id, name) VALUES (1, 'Bank One');
        INSERT INTO accounts(id, name, institution_id) VALUES
            (1, 'Checking', 1),
            (2, 'Savings', 1);
        INSERT INTO categories(id, name, kind) VALUES
            (1, 'Salary', 'income'),
            (2, 'Groceries', 'expense'),
            (3, 'Internal', 'expense');
        "#,
    )
    .unwrap();
    Coordinator::new(conn)
}

fn record(coord: &mut Coordinator, account_id: i64, amount: &str, category_id: i64) -> Receipt {
    coord
        .record_transaction(&RecordTransaction {
            account_id,
            amount: dec(amount),
            category_id,
            is_transfer: false,
            target_account_id: None,
        })
        .unwrap()
}

fn changes(coord: &Coordinator, account_id: i64) -> Vec<Decimal> {
    coord
        .balance_history(account_id)
        .unwrap()
        .iter()
        .map(|c| c.balance_after)
        .collect()
}

fn count(coord: &Coordinator, sql: &str) -> i64 {
    coord.connection().query_row(sql, [], |r| r.get(0)).unwrap()
}

#[test]
fn income_then_expense_then_delete_income() {
    let mut coord = setup();

    let income = record(&mut coord, 1, "100", 1);
    assert_eq!(income.new_balance, dec("100"));
    assert_eq!(changes(&coord, 1), vec![dec("100")]);

    let expense = record(&mut coord, 1, "30", 2);
    assert_eq!(expense.new_balance, dec("70"));
    assert_eq!(changes(&coord, 1), vec![dec("100"), dec("70")]);

    coord.delete_transaction(income.transaction_id).unwrap();
    assert_eq!(coord.get_balance(1).unwrap(), dec("-30"));
    assert_eq!(changes(&coord, 1), vec![dec("-30")]);
}

#[test]
fn deleting_middle_transaction_recalculates() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);
    let t2 = record(&mut coord, 1, "30", 2);
    record(&mut coord, 1, "50", 1);

    coord.delete_transaction(t2.transaction_id).unwrap();

    assert_eq!(coord.get_balance(1).unwrap(), dec("150"));
    assert_eq!(changes(&coord, 1), vec![dec("100"), dec("150")]);
}

#[test]
fn transfer_debits_source_and_credits_target() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);

    let receipt = coord
        .record_transaction(&RecordTransaction {
            account_id: 1,
            amount: dec("40"),
            category_id: 3,
            is_transfer: true,
            target_account_id: Some(2),
        })
        .unwrap();

    assert_eq!(receipt.new_balance, dec("60"));
    assert_eq!(coord.get_balance(1).unwrap(), dec("60"));
    assert_eq!(coord.get_balance(2).unwrap(), dec("40"));

    // both legs present, mutually linked, opposite directions
    let (source_dir, source_target, source_peer): (String, Option<i64>, Option<i64>) = coord
        .connection()
        .query_row(
            "SELECT direction, target_account_id, peer_transaction_id
             FROM transactions WHERE id=?1",
            [receipt.transaction_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(source_dir, "debit");
    assert_eq!(source_target, Some(2));
    let peer_id = source_peer.expect("source leg links its peer");

    let (peer_dir, peer_account, peer_target, peer_peer): (String, i64, Option<i64>, Option<i64>) =
        coord
            .connection()
            .query_row(
                "SELECT direction, account_id, target_account_id, peer_transaction_id
                 FROM transactions WHERE id=?1",
                [peer_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
    assert_eq!(peer_dir, "credit");
    assert_eq!(peer_account, 2);
    assert_eq!(peer_target, Some(1));
    assert_eq!(peer_peer, Some(receipt.transaction_id));

    assert_eq!(changes(&coord, 1), vec![dec("100"), dec("60")]);
    assert_eq!(changes(&coord, 2), vec![dec("40")]);
}

#[test]
fn transfer_to_missing_target_rolls_back_both_legs() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);

    let err = coord
        .record_transaction(&RecordTransaction {
            account_id: 1,
            amount: dec("40"),
            category_id: 3,
            is_transfer: true,
            target_account_id: Some(99),
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(99)));

    // the source leg must not survive the failed target leg
    assert_eq!(count(&coord, "SELECT COUNT(*) FROM transactions"), 1);
    assert_eq!(count(&coord, "SELECT COUNT(*) FROM balance_changes"), 1);
    assert_eq!(coord.get_balance(1).unwrap(), dec("100"));
}

#[test]
fn deleting_either_transfer_leg_removes_both() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);

    let receipt = coord
        .record_transaction(&RecordTransaction {
            account_id: 1,
            amount: dec("40"),
            category_id: 3,
            is_transfer: true,
            target_account_id: Some(2),
        })
        .unwrap();

    // delete the source leg; the target leg goes with it
    coord.delete_transaction(receipt.transaction_id).unwrap();
    assert_eq!(count(&coord, "SELECT COUNT(*) FROM transactions WHERE is_transfer=1"), 0);
    assert_eq!(coord.get_balance(1).unwrap(), dec("100"));
    assert_eq!(coord.get_balance(2).unwrap(), dec("0"));
    assert_eq!(changes(&coord, 2), Vec::<Decimal>::new());

    // again, deleting the target leg this time
    let receipt = coord
        .record_transaction(&RecordTransaction {
            account_id: 1,
            amount: dec("25"),
            category_id: 3,
            is_transfer: true,
            target_account_id: Some(2),
        })
        .unwrap();
    let peer_id: i64 = coord
        .connection()
        .query_row(
            "SELECT peer_transaction_id FROM transactions WHERE id=?1",
            [receipt.transaction_id],
            |r| r.get(0),
        )
        .unwrap();
    coord.delete_transaction(peer_id).unwrap();
    assert_eq!(count(&coord, "SELECT COUNT(*) FROM transactions WHERE is_transfer=1"), 0);
    assert_eq!(coord.get_balance(1).unwrap(), dec("100"));
    assert_eq!(coord.get_balance(2).unwrap(), dec("0"));
}

#[test]
fn missing_references_are_typed_errors() {
    let mut coord = setup();

    let err = coord
        .record_transaction(&RecordTransaction {
            account_id: 42,
            amount: dec("10"),
            category_id: 1,
            is_transfer: false,
            target_account_id: None,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(42)));

    let err = coord
        .record_transaction(&RecordTransaction {
            account_id: 1,
            amount: dec("10"),
            category_id: 42,
            is_transfer: false,
            target_account_id: None,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::CategoryNotFound(42)));

    let err = coord.delete_transaction(42).unwrap_err();
    assert!(matches!(err, LedgerError::TransactionNotFound(42)));

    let err = coord.get_balance(42).unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(42)));
}

#[test]
fn non_positive_amounts_are_rejected() {
    let mut coord = setup();
    for amount in ["0", "-5"] {
        let err = coord
            .record_transaction(&RecordTransaction {
                account_id: 1,
                amount: dec(amount),
                category_id: 1,
                is_transfer: false,
                target_account_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }
    assert_eq!(count(&coord, "SELECT COUNT(*) FROM transactions"), 0);
}

#[test]
fn recompute_account_is_idempotent() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);
    record(&mut coord, 1, "30", 2);

    let first = coord.recompute_account(1).unwrap();
    let first_changes: Vec<(i64, Decimal)> = coord
        .balance_history(1)
        .unwrap()
        .iter()
        .map(|c| (c.transaction_id, c.balance_after))
        .collect();

    let second = coord.recompute_account(1).unwrap();
    let second_changes: Vec<(i64, Decimal)> = coord
        .balance_history(1)
        .unwrap()
        .iter()
        .map(|c| (c.transaction_id, c.balance_after))
        .collect();

    assert_eq!(first, dec("70"));
    assert_eq!(first, second);
    assert_eq!(first_changes, second_changes);
    assert_eq!(coord.get_balance(1).unwrap(), dec("70"));
}

#[test]
fn recompute_surfaces_integrity_fault() {
    let mut coord = setup();
    record(&mut coord, 1, "100", 1);

    // simulate a CRUD-layer bug: a transaction pointing at a category that
    // does not exist
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

    let err = coord.recompute_account(1).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Integrity {
            category_id: 77,
            ..
        }
    ));
    // the failed recompute must not have touched the stored audit trail
    assert_eq!(changes(&coord, 1), vec![dec("100")]);
    assert_eq!(coord.get_balance(1).unwrap(), dec("100"));
}

#[test]
fn history_is_ordered_and_complete() {
    let mut coord = setup();
    let a = record(&mut coord, 1, "10", 1);
    let b = record(&mut coord, 1, "20", 2);
    let c = record(&mut coord, 1, "30", 1);

    let history = coord.get_history(1).unwrap();
    let ids: Vec<i64> = history.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![a.transaction_id, b.transaction_id, c.transaction_id]);
    assert_eq!(coord.get_history(2).unwrap().len(), 0);

    // running-sum invariant over the audit trail
    let after = changes(&coord, 1);
    assert_eq!(after[0], history[0].signed_amount());
    for i in 1..after.len() {
        assert_eq!(after[i] - after[i - 1], history[i].signed_amount());
    }
}
