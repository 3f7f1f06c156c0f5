// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Per-statement results of an executed batch

use crate::error::{QueryError, QueryResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A result row, column name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Write outcome reported by the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkPacket {
    /// Rows matched by the statement's predicate
    pub affected_rows: u64,
    /// Rows whose stored values actually changed
    pub changed_rows: u64,
    /// Id generated by an INSERT, 0 otherwise
    pub insert_id: u64,
}

impl OkPacket {
    pub fn inserted(insert_id: u64) -> Self {
        Self {
            affected_rows: 1,
            changed_rows: 0,
            insert_id,
        }
    }

    pub fn counted(affected_rows: u64, changed_rows: u64) -> Self {
        Self {
            affected_rows,
            changed_rows,
            insert_id: 0,
        }
    }
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    Rows(Vec<Row>),
    Ok(OkPacket),
}

/// Results of a committed batch, keyed by statement id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionResult {
    results: BTreeMap<usize, StatementResult>,
}

impl TransactionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: usize, result: StatementResult) {
        self.results.insert(id, result);
    }

    pub fn get(&self, id: usize) -> Option<&StatementResult> {
        self.results.get(&id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Rows returned by statement `id`
    pub fn rows(&self, id: usize) -> QueryResult<&[Row]> {
        match self.results.get(&id) {
            Some(StatementResult::Rows(rows)) => Ok(rows),
            Some(StatementResult::Ok(_)) => Err(QueryError::UnexpectedSqlResult(format!(
                "Statement {} returned a write result where rows were expected",
                id
            ))),
            None => Err(missing(id)),
        }
    }

    /// Write outcome of statement `id`
    pub fn ok_packet(&self, id: usize) -> QueryResult<OkPacket> {
        match self.results.get(&id) {
            Some(StatementResult::Ok(packet)) => Ok(*packet),
            Some(StatementResult::Rows(_)) => Err(QueryError::UnexpectedSqlResult(format!(
                "Statement {} returned rows where a write result was expected",
                id
            ))),
            None => Err(missing(id)),
        }
    }

    /// Decode the rows of statement `id` into typed records
    pub fn decode<T: DeserializeOwned>(&self, id: usize) -> QueryResult<Vec<T>> {
        self.rows(id)?.iter().map(decode_row).collect()
    }
}

/// Decode a single row into a typed record
pub fn decode_row<T: DeserializeOwned>(row: &Row) -> QueryResult<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(row.clone()))?)
}

fn missing(id: usize) -> QueryError {
    QueryError::UnexpectedSqlResult(format!("No result for statement {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        id: i64,
        name: String,
    }

    #[test]
    fn test_typed_access() {
        let mut result = TransactionResult::new();
        result.insert(1, StatementResult::Ok(OkPacket::counted(1, 1)));
        let row = json!({"id": 3, "name": "IPA"}).as_object().cloned().unwrap();
        result.insert(2, StatementResult::Rows(vec![row]));

        assert_eq!(result.ok_packet(1).unwrap().changed_rows, 1);
        let decoded: Vec<Named> = result.decode(2).unwrap();
        assert_eq!(
            decoded,
            vec![Named {
                id: 3,
                name: "IPA".to_string()
            }]
        );

        assert!(result.rows(1).is_err());
        assert!(result.ok_packet(2).is_err());
        assert!(matches!(
            result.rows(3),
            Err(QueryError::UnexpectedSqlResult(_))
        ));
    }

    #[test]
    fn test_malformed_row_is_unexpected() {
        let row = json!({"id": "not-a-number"}).as_object().cloned().unwrap();
        let err = decode_row::<Named>(&row).unwrap_err();
        assert_eq!(err.kind(), "UnexpectedSQLResult");
    }
}
