// Copyright (c) 2025 Bankbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance engine: pure computations over an account's transaction history.
//!
//! Owns the invariant "balance == sum of signed transaction amounts up to and
//! including each point in time". Nothing here touches storage; the
//! coordinator persists whatever these functions return inside its own
//! storage transaction.

use std::collections::HashMap;

use log::debug;
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{Account, Category, Transaction};

/// A computed audit row, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub transaction_id: i64,
    pub balance_after: Decimal,
}

/// Apply one transaction on top of an account's cached balance.
///
/// Returns the new balance and the audit row recording it. The caller must
/// persist both (and the transaction row itself) in a single storage
/// transaction.
pub fn apply_transaction(account: &Account, tx: &Transaction) -> (Decimal, BalanceEntry) {
    let new_balance = account.balance + tx.signed_amount();
    let entry = BalanceEntry {
        transaction_id: tx.id,
        balance_after: new_balance,
    };
    (new_balance, entry)
}

/// Rebuild an account's balance state from scratch.
///
/// `transactions` must be every non-deleted transaction of one account in
/// ascending creation order (ties broken by id). Starts from zero, applies
/// each snapshotted signed delta in turn, and emits the full replacement
/// audit trail. Idempotent: the same history always yields the same entries
/// and final balance. The emitted entries must fully replace the account's
/// prior audit rows, never merge with them.
///
/// A transaction referencing a category absent from `categories` aborts the
/// whole recompute with [`LedgerError::Integrity`]; skipping it silently
/// would desynchronize the running sum.
pub fn recompute(
    transactions: &[Transaction],
    categories: &HashMap<i64, Category>,
) -> Result<(Decimal, Vec<BalanceEntry>)> {
    let mut balance = Decimal::ZERO;
    let mut entries = Vec::with_capacity(transactions.len());
    for tx in transactions {
        if !categories.contains_key(&tx.category_id) {
            return Err(LedgerError::Integrity {
                transaction_id: tx.id,
                category_id: tx.category_id,
            });
        }
        balance += tx.signed_amount();
        entries.push(BalanceEntry {
            transaction_id: tx.id,
            balance_after: balance,
        });
    }
    debug!(
        "recomputed {} entries, final balance {}",
        entries.len(),
        balance
    );
    Ok((balance, entries))
}
