// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory executor for tests
//!
//! [`SimulatedExecutor`] interprets statements by verb against a small JSON dataset
//! and exposes knobs that force every outcome a caller must handle:
//!
//! - store unreachable: every batch fails with `GeneralServerError`
//! - insert fails / insert duplicate: INSERTs fail with `GeneralServerError` /
//!   `ItemAlreadyExists`
//! - selector index: UPDATE and DELETE counters (0 changed, 1 matched-unchanged,
//!   2+ no match)
//!
//! SELECT addresses rows by the first integer parameter (1-based position) or else by
//! the first text parameter (rows with a text column containing it).
//!
//! Writes go to a staged copy of the dataset that replaces the live rows only when
//! the whole batch succeeded.

use super::executor::{enforce_match, TransactionExecutor};
use super::result::{OkPacket, Row, StatementResult, TransactionResult};
use super::statement::{Batch, Param, Statement, Verb};
use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Selector index forcing the "changed" outcome
pub const SELECT_CHANGED: usize = 0;
/// Selector index forcing the "matched but unchanged" outcome
pub const SELECT_NO_OP: usize = 1;
/// Selector index forcing the "no match" outcome
pub const SELECT_NOT_FOUND: usize = 2;

#[derive(Debug)]
struct SimulatedState {
    reachable: bool,
    insert_fails: bool,
    insert_duplicate: bool,
    selector: usize,
    rows: Vec<Row>,
    next_id: i64,
    executed_batches: usize,
}

/// Deterministic stand-in for a relational store
#[derive(Debug)]
pub struct SimulatedExecutor {
    state: Mutex<SimulatedState>,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExecutor {
    /// Reachable store holding the two default rows
    pub fn new() -> Self {
        Self::with_rows(vec![
            json!({"id": 1, "name": "product"}),
            json!({"id": 2, "name": "F1"}),
        ])
    }

    /// Reachable store holding `rows`; non-object values are ignored
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let rows: Vec<Row> = rows
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect();
        let next_id = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            state: Mutex::new(SimulatedState {
                reachable: true,
                insert_fails: false,
                insert_duplicate: false,
                selector: SELECT_CHANGED,
                rows,
                next_id,
                executed_batches: 0,
            }),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn set_insert_fails(&self, fails: bool) {
        self.state.lock().insert_fails = fails;
    }

    pub fn set_insert_duplicate(&self, duplicate: bool) {
        self.state.lock().insert_duplicate = duplicate;
    }

    pub fn set_selector(&self, index: usize) {
        self.state.lock().selector = index;
    }

    pub fn selector(&self) -> usize {
        self.state.lock().selector
    }

    /// Current committed rows
    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    /// Batches that committed
    pub fn executed_batches(&self) -> usize {
        self.state.lock().executed_batches
    }
}

#[async_trait]
impl TransactionExecutor for SimulatedExecutor {
    async fn execute_transactions(&self, batch: &Batch) -> QueryResult<TransactionResult> {
        let mut state = self.state.lock();
        if !state.reachable {
            return Err(QueryError::GeneralServerError(
                "Simulated store is unreachable".to_string(),
            ));
        }

        let mut staged = state.rows.clone();
        let mut next_id = state.next_id;
        let mut results = TransactionResult::new();

        for statement in batch.statements() {
            let result = match statement.verb() {
                Verb::Select => handle_select(&staged, statement),
                Verb::Insert => handle_insert(&state, &mut staged, &mut next_id, statement),
                Verb::Update => Ok(handle_update(state.selector)),
                Verb::Delete => Ok(handle_delete(state.selector, &mut staged, statement)),
            }
            .and_then(|result| enforce_match(statement, &result).map(|_| result));
            match result {
                Ok(result) => results.insert(statement.id(), result),
                Err(error) => {
                    log::debug!(
                        "Simulated batch rolled back at statement {}: {}",
                        statement.id(),
                        error
                    );
                    return Err(error);
                }
            }
        }

        state.rows = staged;
        state.next_id = next_id;
        state.executed_batches += 1;
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}

/// Position addressed by the first integer parameter, if any
fn addressed_slot(rows: &[Row], statement: &Statement) -> Option<QueryResult<usize>> {
    let n = statement.parameters().iter().find_map(Param::as_int)?;
    if n < 1 || n as usize > rows.len() {
        return Some(Err(QueryError::EmptySqlResult(format!(
            "No row at position {} ({} rows)",
            n,
            rows.len()
        ))));
    }
    Some(Ok(n as usize - 1))
}

fn text_filter(statement: &Statement) -> Option<String> {
    statement
        .parameters()
        .iter()
        .find_map(Param::as_text)
        .map(|text| text.trim_matches('%').to_string())
}

/// A row matches a text parameter when any of its text columns contains it
fn text_matches(row: &Row, needle: &str) -> bool {
    row.values()
        .filter_map(Value::as_str)
        .any(|text| text.contains(needle))
}

fn handle_select(rows: &[Row], statement: &Statement) -> QueryResult<StatementResult> {
    if let Some(slot) = addressed_slot(rows, statement) {
        return Ok(StatementResult::Rows(vec![rows[slot?].clone()]));
    }
    let selected = match text_filter(statement) {
        Some(needle) => rows
            .iter()
            .filter(|row| text_matches(row, &needle))
            .cloned()
            .collect(),
        None => rows.to_vec(),
    };
    Ok(StatementResult::Rows(selected))
}

fn handle_insert(
    state: &SimulatedState,
    rows: &mut Vec<Row>,
    next_id: &mut i64,
    statement: &Statement,
) -> QueryResult<StatementResult> {
    if state.insert_fails {
        return Err(QueryError::GeneralServerError(
            "Simulated insert failure".to_string(),
        ));
    }
    if state.insert_duplicate {
        return Err(QueryError::from_statement_failure(
            "Duplicate entry for key 'name'",
        ));
    }

    let id = *next_id;
    *next_id += 1;
    let mut row = Row::new();
    row.insert("id".to_string(), Value::from(id));
    if let Some(name) = statement.parameters().iter().find_map(Param::as_text) {
        row.insert("name".to_string(), Value::from(name));
    }
    rows.push(row);
    Ok(StatementResult::Ok(OkPacket::inserted(id as u64)))
}

fn handle_update(selector: usize) -> StatementResult {
    let packet = match selector {
        SELECT_CHANGED => OkPacket::counted(1, 1),
        SELECT_NO_OP => OkPacket::counted(1, 0),
        _ => OkPacket::counted(0, 0),
    };
    StatementResult::Ok(packet)
}

fn handle_delete(selector: usize, rows: &mut Vec<Row>, statement: &Statement) -> StatementResult {
    if selector >= SELECT_NOT_FOUND {
        return StatementResult::Ok(OkPacket::counted(0, 0));
    }

    let position = match addressed_slot(rows, statement) {
        Some(Ok(slot)) => Some(slot),
        Some(Err(_)) => None,
        None => text_filter(statement)
            .and_then(|needle| rows.iter().position(|row| text_matches(row, &needle))),
    };
    if let Some(position) = position {
        rows.remove(position);
    }
    StatementResult::Ok(OkPacket::counted(1, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_at(slot: i64) -> Batch {
        Batch::from(Statement::select(
            "SELECT * FROM elements WHERE id = ?",
            vec![slot.into()],
        ))
    }

    #[tokio::test]
    async fn test_select_all_rows() {
        let executor = SimulatedExecutor::new();
        let batch = Batch::from(Statement::select("SELECT * FROM elements", vec![]));
        let result = executor.execute_transactions(&batch).await.unwrap();
        assert_eq!(result.rows(1).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_select_past_end_is_empty_result() {
        let executor = SimulatedExecutor::new();
        let err = executor.execute_transactions(&select_at(100)).await.unwrap_err();
        assert!(err.is_empty_result());

        let result = executor.execute_transactions(&select_at(2)).await.unwrap();
        assert_eq!(result.rows(1).unwrap()[0]["name"], "F1");
    }

    #[tokio::test]
    async fn test_unreachable_rejects_every_verb() {
        let executor = SimulatedExecutor::new();
        executor.set_reachable(false);
        for statement in [
            Statement::select("SELECT * FROM t", vec![]),
            Statement::insert("INSERT INTO t (name) VALUES (?)", vec!["x".into()]),
            Statement::update("UPDATE t SET name = ?", vec!["x".into()]),
            Statement::delete("DELETE FROM t WHERE id = ?", vec![1.into()]),
        ] {
            let err = executor
                .execute_transactions(&Batch::from(statement))
                .await
                .unwrap_err();
            assert!(matches!(err, QueryError::GeneralServerError(_)));
        }
    }

    #[tokio::test]
    async fn test_selector_drives_update_counters() {
        let executor = SimulatedExecutor::new();
        let batch = Batch::from(Statement::update("UPDATE t SET name = ?", vec!["x".into()]));

        let expected = [(0, (1, 1)), (1, (1, 0)), (2, (0, 0)), (3, (0, 0))];
        for (selector, (affected, changed)) in expected {
            executor.set_selector(selector);
            let packet = executor
                .execute_transactions(&batch)
                .await
                .unwrap()
                .ok_packet(1)
                .unwrap();
            assert_eq!((packet.affected_rows, packet.changed_rows), (affected, changed));
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_rows_untouched() {
        let executor = SimulatedExecutor::new();
        let batch = Batch::new()
            .with(Statement::insert(
                "INSERT INTO t (name) VALUES (?)",
                vec!["IPA".into()],
            ))
            .with(Statement::delete("DELETE FROM t WHERE id = ?", vec![1.into()]))
            .with(Statement::select("SELECT * FROM t WHERE id = ?", vec![100.into()]));

        let err = executor.execute_transactions(&batch).await.unwrap_err();
        assert!(err.is_empty_result());
        assert_eq!(executor.row_count(), 2);
        assert_eq!(executor.rows()[0]["name"], "product");
        assert_eq!(executor.executed_batches(), 0);
    }

    #[tokio::test]
    async fn test_insert_flags() {
        let executor = SimulatedExecutor::new();
        let insert = Batch::from(Statement::insert(
            "INSERT INTO t (name) VALUES (?)",
            vec!["IPA".into()],
        ));

        let packet = executor
            .execute_transactions(&insert)
            .await
            .unwrap()
            .ok_packet(1)
            .unwrap();
        assert_eq!(packet.insert_id, 3);
        assert_eq!(executor.row_count(), 3);

        executor.set_insert_duplicate(true);
        let err = executor.execute_transactions(&insert).await.unwrap_err();
        assert!(err.is_item_already_exists());

        executor.set_insert_duplicate(false);
        executor.set_insert_fails(true);
        let err = executor.execute_transactions(&insert).await.unwrap_err();
        assert!(matches!(err, QueryError::GeneralServerError(_)));
        assert_eq!(executor.row_count(), 3);
    }

    #[tokio::test]
    async fn test_required_match_rolls_back_batch() {
        let executor = SimulatedExecutor::new();
        executor.set_selector(SELECT_NOT_FOUND);
        let batch = Batch::new()
            .with(Statement::insert(
                "INSERT INTO t (name) VALUES (?)",
                vec!["IPA".into()],
            ))
            .with(
                Statement::update(
                    "UPDATE c SET balance = balance - ? WHERE id = ?",
                    vec![2.5.into(), 9.into()],
                )
                .requiring_match(),
            );

        let err = executor.execute_transactions(&batch).await.unwrap_err();
        assert!(err.is_empty_result());
        assert_eq!(executor.row_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_verb_never_reaches_executor() {
        let err = Statement::parse("NON-EXISTENT FROM t", vec![]).unwrap_err();
        assert!(matches!(err, QueryError::GeneralServerError(_)));
    }
}
