// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Update-verify protocol
//!
//! A conditional update is submitted as `[UPDATE, SELECT]` in one batch. The UPDATE's
//! row counters alone decide the outcome:
//!
//! | changed | affected | outcome |
//! |---|---|---|
//! | 1 | any | changed, resolve with the selected row |
//! | 0 | 1 | matched but identical, `ItemAlreadyExists` |
//! | otherwise | | no match, `EmptySqlResult` |

use crate::db::{Batch, OkPacket, Statement, TransactionExecutor, TransactionResult};
use crate::error::{QueryError, QueryResult};
use serde::de::DeserializeOwned;

/// Classification of a conditional UPDATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Changed,
    Unchanged,
    NotFound,
}

impl UpdateOutcome {
    pub fn classify(packet: &OkPacket) -> Self {
        if packet.changed_rows == 1 {
            UpdateOutcome::Changed
        } else if packet.changed_rows == 0 && packet.affected_rows == 1 {
            UpdateOutcome::Unchanged
        } else {
            UpdateOutcome::NotFound
        }
    }
}

/// Submit `update` and its verification `select` atomically and classify the result
///
/// `what` names the addressed row in error messages, e.g. `category 'IPA'`.
pub async fn update_verified<T: DeserializeOwned>(
    executor: &dyn TransactionExecutor,
    update: Statement,
    select: Statement,
    what: &str,
) -> QueryResult<T> {
    let mut batch = Batch::new();
    let update_id = batch.push(update);
    let select_id = batch.push(select);
    let result = executor.execute_transactions(&batch).await?;
    verify_update(&result, update_id, select_id, what)
}

/// Classify the UPDATE at `update_id` of a committed batch and read back `select_id`
///
/// Used directly by batches that carry extra statements around the pair.
pub fn verify_update<T: DeserializeOwned>(
    result: &TransactionResult,
    update_id: usize,
    select_id: usize,
    what: &str,
) -> QueryResult<T> {
    match UpdateOutcome::classify(&result.ok_packet(update_id)?) {
        UpdateOutcome::Changed => result
            .decode::<T>(select_id)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                QueryError::UnexpectedSqlResult(format!(
                    "Updated {} but could not read it back",
                    what
                ))
            }),
        UpdateOutcome::Unchanged => Err(QueryError::ItemAlreadyExists(format!(
            "{} already has these values",
            what
        ))),
        UpdateOutcome::NotFound => Err(QueryError::EmptySqlResult(format!(
            "{} not found",
            what
        ))),
    }
}

/// Submit a one-statement DELETE and require that it matched
pub async fn delete_verified(
    executor: &dyn TransactionExecutor,
    delete: Statement,
    what: &str,
) -> QueryResult<()> {
    let result = executor.execute_transactions(&Batch::from(delete)).await?;
    if result.ok_packet(1)?.affected_rows == 0 {
        return Err(QueryError::EmptySqlResult(format!("{} not found", what)));
    }
    Ok(())
}

/// Submit a one-statement INSERT and resolve with the generated id
pub async fn insert_returning_id(
    executor: &dyn TransactionExecutor,
    insert: Statement,
) -> QueryResult<i64> {
    let result = executor.execute_transactions(&Batch::from(insert)).await?;
    inserted_id(&result, 1)
}

/// Generated id of the INSERT at `id`, which must be at least 1
pub fn inserted_id(result: &TransactionResult, id: usize) -> QueryResult<i64> {
    let packet = result.ok_packet(id)?;
    i64::try_from(packet.insert_id)
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| {
            QueryError::UnexpectedSqlResult(format!(
                "Insert reported invalid id {}",
                packet.insert_id
            ))
        })
}

/// Submit a keyed SELECT and require at least one row
pub async fn select_some<T: DeserializeOwned>(
    executor: &dyn TransactionExecutor,
    select: Statement,
    what: &str,
) -> QueryResult<Vec<T>> {
    let rows = select_all::<T>(executor, select).await?;
    if rows.is_empty() {
        return Err(QueryError::EmptySqlResult(format!("{} not found", what)));
    }
    Ok(rows)
}

/// Submit a SELECT and decode every row
pub async fn select_all<T: DeserializeOwned>(
    executor: &dyn TransactionExecutor,
    select: Statement,
) -> QueryResult<Vec<T>> {
    let result = executor.execute_transactions(&Batch::from(select)).await?;
    result.decode(1)
}
