// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction executor contract

use super::result::{StatementResult, TransactionResult};
use super::statement::{Batch, Statement};
use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;

/// Runs a batch of statements as one atomic unit
///
/// Implementations must:
/// - execute statements strictly in batch order on a single connection/transaction
/// - either commit every statement or roll back all of them
/// - resolve with one result per statement, keyed by statement id
/// - reject with exactly one classified [`crate::QueryError`] otherwise
///
/// Two implementations exist:
/// - [`super::RelationalExecutor`]: pooled MySQL connections
/// - [`super::SimulatedExecutor`]: deterministic in-memory double for tests
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Execute all statements of `batch` in one transaction
    async fn execute_transactions(&self, batch: &Batch) -> QueryResult<TransactionResult>;

    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Reject a write that was required to match a row but matched none
pub(crate) fn enforce_match(statement: &Statement, result: &StatementResult) -> QueryResult<()> {
    match result {
        StatementResult::Ok(packet) if statement.requires_match() && packet.affected_rows == 0 => {
            Err(QueryError::EmptySqlResult(format!(
                "Statement {} ({}) matched no rows",
                statement.id(),
                statement.verb()
            )))
        }
        _ => Ok(()),
    }
}
