// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Direction;
use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub struct Finding {
    pub issue: &'static str,
    pub detail: String,
}

/// Read-only consistency audit: cached balances against the signed
/// transaction sum, and stored audit trails against the recomputed running
/// sum. Repairs go through `account recompute`, never through here.
pub fn audit(conn: &Connection) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();

    // 1) Transactions referencing a missing category
    let mut stmt = conn.prepare(
        "SELECT t.id, t.category_id FROM transactions t
         LEFT JOIN categories c ON t.category_id=c.id
         WHERE c.id IS NULL",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let tx_id: i64 = r.get(0)?;
        let cat_id: i64 = r.get(1)?;
        findings.push(Finding {
            issue: "missing_category",
            detail: format!("transaction {} references category {}", tx_id, cat_id),
        });
    }

    // 2) Per-account running sums
    let mut stmt2 = conn.prepare("SELECT id, name, balance FROM accounts ORDER BY id")?;
    let accounts = stmt2.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let accounts: Vec<_> = accounts.collect::<rusqlite::Result<_>>()?;

    for (account_id, name, cached) in accounts {
        let cached: Decimal = cached
            .parse()
            .with_context(|| format!("Invalid balance for account '{}'", name))?;

        let mut stmt = conn.prepare(
            "SELECT amount, direction FROM transactions
             WHERE account_id=?1 ORDER BY created_at, id",
        )?;
        let mut cur = stmt.query(params![account_id])?;
        let mut expected = Vec::new();
        let mut running = Decimal::ZERO;
        while let Some(r) = cur.next()? {
            let amount: String = r.get(0)?;
            let amount: Decimal = amount
                .parse()
                .with_context(|| format!("Invalid amount on account '{}'", name))?;
            let direction: Direction = r.get(1)?;
            running += direction.signed(amount);
            expected.push(running);
        }

        if cached != running {
            findings.push(Finding {
                issue: "stale_balance",
                detail: format!("account '{}': cached {} != computed {}", name, cached, running),
            });
        }

        let mut stmt = conn.prepare(
            "SELECT b.balance_after FROM balance_changes b
             JOIN transactions t ON b.transaction_id=t.id
             WHERE b.account_id=?1 ORDER BY t.created_at, t.id",
        )?;
        let mut cur = stmt.query(params![account_id])?;
        let mut stored = Vec::new();
        while let Some(r) = cur.next()? {
            let v: String = r.get(0)?;
            let v: Decimal = v
                .parse()
                .with_context(|| format!("Invalid balance change on account '{}'", name))?;
            stored.push(v);
        }

        if stored != expected {
            findings.push(Finding {
                issue: "audit_trail_mismatch",
                detail: format!(
                    "account '{}': {} stored changes do not match {} expected",
                    name,
                    stored.len(),
                    expected.len()
                ),
            });
        }
    }

    Ok(findings)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let findings = audit(conn)?;
    if findings.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = findings
            .iter()
            .map(|f| vec![f.issue.to_string(), f.detail.clone()])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
