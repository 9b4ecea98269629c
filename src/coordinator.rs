// Copyright (c) 2025 Bankbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction coordinator: turns domain requests into engine calls wrapped
//! in a single storage transaction.
//!
//! Every multi-step operation (paired transfer legs, delete + recompute)
//! runs inside one IMMEDIATE transaction, so the database write lock is held
//! across "read balance -> compute -> write balance" and either everything
//! commits or nothing does. `SQLITE_BUSY` is retried a bounded number of
//! times before surfacing as [`LedgerError::Conflict`].

use std::collections::HashMap;

use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::{Account, BalanceChange, Category, Direction, Transaction};

/// Request to record one ledger entry, or a transfer pair when `is_transfer`
/// and `target_account_id` are both set.
#[derive(Debug, Clone)]
pub struct RecordTransaction {
    pub account_id: i64,
    pub amount: Decimal, // positive magnitude
    pub category_id: i64,
    pub is_transfer: bool,
    pub target_account_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_id: i64,
    pub new_balance: Decimal,
}

const BUSY_RETRIES: u32 = 3;

/// Service object owning the storage connection. Constructed once at process
/// start and passed to the request layer; there is no ambient global state.
pub struct Coordinator {
    conn: Connection,
}

impl Coordinator {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Read access for the CRUD/reporting layers that sit outside the
    /// balance-consistency core.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Record an income/expense entry, or a transfer pair.
    ///
    /// A transfer debits the source account and credits the target account;
    /// both legs and both balance updates commit as one unit. The returned
    /// receipt describes the source leg.
    pub fn record_transaction(&mut self, req: &RecordTransaction) -> Result<Receipt> {
        if req.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(req.amount));
        }
        let transfer_target = if req.is_transfer {
            req.target_account_id
        } else {
            None
        };
        let receipt = self.with_write_tx(|db| {
            let account = get_account(db, req.account_id)?;
            let category = get_category(db, req.category_id)?;

            // Transfers debit the source regardless of category kind; plain
            // entries take their sign from the category.
            let direction = match transfer_target {
                Some(_) => Direction::Debit,
                None => Direction::from_kind(category.kind),
            };
            let source = insert_leg(
                db,
                &account,
                req.amount,
                req.category_id,
                direction,
                req.is_transfer,
                req.target_account_id,
                None,
            )?;

            if let Some(target_id) = transfer_target {
                let target = get_account(db, target_id)?;
                let target_leg = insert_leg(
                    db,
                    &target,
                    req.amount,
                    req.category_id,
                    Direction::Credit,
                    true,
                    Some(req.account_id),
                    Some(source.transaction_id),
                )?;
                db.execute(
                    "UPDATE transactions SET peer_transaction_id=?1 WHERE id=?2",
                    params![target_leg.transaction_id, source.transaction_id],
                )?;
            }
            Ok(source)
        })?;
        info!(
            "recorded transaction {} on account {} (balance {})",
            receipt.transaction_id, req.account_id, receipt.new_balance
        );
        Ok(receipt)
    }

    /// Delete a transaction and rebuild the balance state of every account
    /// it touched.
    ///
    /// If the transaction is one leg of a transfer, the peer leg is deleted
    /// in the same storage transaction and both accounts are recomputed, in
    /// ascending account-id order. Deletion and recomputation succeed or
    /// fail together.
    pub fn delete_transaction(&mut self, transaction_id: i64) -> Result<()> {
        self.with_write_tx(|db| {
            let target = get_transaction_opt(db, transaction_id)?
                .ok_or(LedgerError::TransactionNotFound(transaction_id))?;
            let mut doomed = vec![target.clone()];
            if let Some(peer_id) = target.peer_transaction_id {
                if let Some(peer) = get_transaction_opt(db, peer_id)? {
                    doomed.push(peer);
                }
            }
            let mut accounts: Vec<i64> = doomed.iter().map(|t| t.account_id).collect();
            accounts.sort_unstable();
            accounts.dedup();

            for t in &doomed {
                db.execute(
                    "DELETE FROM balance_changes WHERE transaction_id=?1",
                    params![t.id],
                )?;
                db.execute("DELETE FROM transactions WHERE id=?1", params![t.id])?;
            }
            for account_id in accounts {
                recompute_in_tx(db, account_id)?;
            }
            Ok(())
        })?;
        info!("deleted transaction {} and recomputed", transaction_id);
        Ok(())
    }

    /// Rebuild one account's balance and audit trail from its history.
    /// Repair entry point; same replace-all semantics as the deletion path.
    pub fn recompute_account(&mut self, account_id: i64) -> Result<Decimal> {
        let balance = self.with_write_tx(|db| recompute_in_tx(db, account_id))?;
        info!("recomputed account {} (balance {})", account_id, balance);
        Ok(balance)
    }

    pub fn get_balance(&self, account_id: i64) -> Result<Decimal> {
        get_account(&self.conn, account_id).map(|a| a.balance)
    }

    /// The account's transactions in ascending creation order.
    pub fn get_history(&self, account_id: i64) -> Result<Vec<Transaction>> {
        let _ = get_account(&self.conn, account_id)?;
        list_transactions(&self.conn, account_id)
    }

    /// The account's audit trail in application order.
    pub fn balance_history(&self, account_id: i64) -> Result<Vec<BalanceChange>> {
        let _ = get_account(&self.conn, account_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.account_id, b.transaction_id, b.balance_after
             FROM balance_changes b
             JOIN transactions t ON b.transaction_id = t.id
             WHERE b.account_id = ?1
             ORDER BY t.created_at, t.id",
        )?;
        let rows = stmt.query_map(params![account_id], map_balance_change)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Run `op` inside an IMMEDIATE transaction, retrying a bounded number
    /// of times when the write lock is contended. Any error rolls the whole
    /// transaction back.
    fn with_write_tx<T, F>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(LedgerError::from)
                .and_then(|tx| {
                    let value = op(&tx)?;
                    tx.commit()?;
                    Ok(value)
                });
            match result {
                Err(e) if is_busy(&e) => {
                    if attempts >= BUSY_RETRIES {
                        warn!("write lock still contended after {} attempts", attempts);
                        return Err(LedgerError::Conflict(attempts));
                    }
                }
                other => return other,
            }
        }
    }
}

/// Insert one transaction row, apply it through the engine, and persist the
/// balance update plus its audit row. Runs inside the caller's transaction.
#[allow(clippy::too_many_arguments)]
fn insert_leg(
    db: &rusqlite::Transaction<'_>,
    account: &Account,
    amount: Decimal,
    category_id: i64,
    direction: Direction,
    is_transfer: bool,
    target_account_id: Option<i64>,
    peer_transaction_id: Option<i64>,
) -> Result<Receipt> {
    db.execute(
        "INSERT INTO transactions(account_id, amount, direction, category_id, is_transfer, target_account_id, peer_transaction_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            account.id,
            amount.to_string(),
            direction,
            category_id,
            is_transfer,
            target_account_id,
            peer_transaction_id
        ],
    )?;
    let tx_id = db.last_insert_rowid();
    let row = get_transaction_opt(db, tx_id)?.ok_or(LedgerError::TransactionNotFound(tx_id))?;
    let (new_balance, entry) = ledger::apply_transaction(account, &row);
    db.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2",
        params![new_balance.to_string(), account.id],
    )?;
    db.execute(
        "INSERT INTO balance_changes(account_id, transaction_id, balance_after)
         VALUES (?1, ?2, ?3)",
        params![account.id, entry.transaction_id, entry.balance_after.to_string()],
    )?;
    Ok(Receipt {
        transaction_id: tx_id,
        new_balance,
    })
}

/// Replace an account's entire audit trail and cached balance with the
/// engine's recomputation of its remaining history.
fn recompute_in_tx(db: &rusqlite::Transaction<'_>, account_id: i64) -> Result<Decimal> {
    let _ = get_account(db, account_id)?;
    let transactions = list_transactions(db, account_id)?;
    let categories = load_categories(db)?;
    let (final_balance, entries) = ledger::recompute(&transactions, &categories)?;

    db.execute(
        "DELETE FROM balance_changes WHERE account_id=?1",
        params![account_id],
    )?;
    for entry in &entries {
        db.execute(
            "INSERT INTO balance_changes(account_id, transaction_id, balance_after)
             VALUES (?1, ?2, ?3)",
            params![account_id, entry.transaction_id, entry.balance_after.to_string()],
        )?;
    }
    db.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2",
        params![final_balance.to_string(), account_id],
    )?;
    Ok(final_balance)
}

fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        "SELECT id, name, institution_id, balance FROM accounts WHERE id=?1",
        params![id],
        map_account,
    )
    .optional()?
    .ok_or(LedgerError::AccountNotFound(id))
}

fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, kind FROM categories WHERE id=?1",
        params![id],
        |r| {
            Ok(Category {
                id: r.get(0)?,
                name: r.get(1)?,
                kind: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(LedgerError::CategoryNotFound(id))
}

fn get_transaction_opt(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let row = conn
        .query_row(
            "SELECT id, account_id, amount, direction, category_id, is_transfer,
                    target_account_id, peer_transaction_id, created_at
             FROM transactions WHERE id=?1",
            params![id],
            map_transaction,
        )
        .optional()?;
    Ok(row)
}

fn list_transactions(conn: &Connection, account_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, amount, direction, category_id, is_transfer,
                target_account_id, peer_transaction_id, created_at
         FROM transactions WHERE account_id=?1
         ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![account_id], map_transaction)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn load_categories(conn: &Connection) -> Result<HashMap<i64, Category>> {
    let mut stmt = conn.prepare("SELECT id, name, kind FROM categories")?;
    let rows = stmt.query_map([], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            kind: r.get(2)?,
        })
    })?;
    let mut map = HashMap::new();
    for row in rows {
        let c = row?;
        map.insert(c.id, c);
    }
    Ok(map)
}

fn map_account(r: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        name: r.get(1)?,
        institution_id: r.get(2)?,
        balance: decimal_column(r, 3)?,
    })
}

fn map_transaction(r: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        account_id: r.get(1)?,
        amount: decimal_column(r, 2)?,
        direction: r.get(3)?,
        category_id: r.get(4)?,
        is_transfer: r.get(5)?,
        target_account_id: r.get(6)?,
        peer_transaction_id: r.get(7)?,
        created_at: r.get(8)?,
    })
}

fn map_balance_change(r: &rusqlite::Row<'_>) -> rusqlite::Result<BalanceChange> {
    Ok(BalanceChange {
        id: r.get(0)?,
        account_id: r.get(1)?,
        transaction_id: r.get(2)?,
        balance_after: decimal_column(r, 3)?,
    })
}

fn decimal_column(r: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn is_busy(err: &LedgerError) -> bool {
    matches!(
        err,
        LedgerError::Db(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}
