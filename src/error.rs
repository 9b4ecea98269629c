// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

/// Typed failures surfaced by the ledger engine and the coordinator.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("category {0} not found")]
    CategoryNotFound(i64),

    #[error("transaction {0} not found")]
    TransactionNotFound(i64),

    /// A transaction references a category that no longer exists. The CRUD
    /// layer let a dangling foreign reference through; recomputation aborts
    /// rather than desynchronize the running sum.
    #[error("transaction {transaction_id} references missing category {category_id}")]
    Integrity {
        transaction_id: i64,
        category_id: i64,
    },

    /// Write-lock contention that survived the bounded retry loop.
    #[error("database write lock still contended after {0} attempts")]
    Conflict(u32),

    #[error("amount must be a positive magnitude, got {0}")]
    InvalidAmount(Decimal),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl LedgerError {
    /// Transient failures the caller may retry; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
