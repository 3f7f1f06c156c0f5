// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Query error types
//!
//! Every fallible operation in the persistence layer resolves to exactly one of
//! four error kinds. The HTTP boundary reads [`QueryError::status`] and never
//! inspects the message.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors produced by executors and entity query modules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Uniqueness violation on insert, or an update that matched a row without changing it
    #[error("Item already exists: {0}")]
    ItemAlreadyExists(String),

    /// No row matched the requested key
    #[error("Empty SQL result: {0}")]
    EmptySqlResult(String),

    /// Store unreachable, pool exhausted, or a timeout expired
    #[error("General server error: {0}")]
    GeneralServerError(String),

    /// Commit failure, malformed driver response, or any other statement failure
    #[error("Unexpected SQL result: {0}")]
    UnexpectedSqlResult(String),
}

/// Result alias used by every fallible persistence operation
pub type QueryResult<T> = Result<T, QueryError>;

static DUPLICATE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duplicate entry '(?P<value>.*)' for key '(?P<key>[^']+)'")
        .expect("duplicate entry pattern is valid")
});

impl QueryError {
    /// HTTP-style status the boundary maps this error to
    pub fn status(&self) -> u16 {
        match self {
            QueryError::ItemAlreadyExists(_) => 403,
            QueryError::EmptySqlResult(_) => 204,
            QueryError::GeneralServerError(_) | QueryError::UnexpectedSqlResult(_) => 500,
        }
    }

    /// Stable kind name used in JSON error envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::ItemAlreadyExists(_) => "ItemAlreadyExists",
            QueryError::EmptySqlResult(_) => "EmptySQLResult",
            QueryError::GeneralServerError(_) => "GeneralServerError",
            QueryError::UnexpectedSqlResult(_) => "UnexpectedSQLResult",
        }
    }

    /// Detail message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            QueryError::ItemAlreadyExists(m)
            | QueryError::EmptySqlResult(m)
            | QueryError::GeneralServerError(m)
            | QueryError::UnexpectedSqlResult(m) => m,
        }
    }

    pub fn is_item_already_exists(&self) -> bool {
        matches!(self, QueryError::ItemAlreadyExists(_))
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, QueryError::EmptySqlResult(_))
    }

    /// Classify a failed statement by its driver message
    ///
    /// Uniqueness violations are recognised by the word "duplicate" anywhere in the
    /// message. When the message has MySQL's `Duplicate entry '..' for key '..'` shape
    /// the offending key is kept in the detail.
    pub fn from_statement_failure(message: &str) -> Self {
        if let Some(caps) = DUPLICATE_ENTRY.captures(message) {
            return QueryError::ItemAlreadyExists(format!(
                "'{}' already exists for key '{}'",
                &caps["value"], &caps["key"]
            ));
        }
        if message.to_ascii_lowercase().contains("duplicate") {
            QueryError::ItemAlreadyExists(message.to_string())
        } else {
            QueryError::UnexpectedSqlResult(message.to_string())
        }
    }
}

impl Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut body = serializer.serialize_struct("QueryError", 3)?;
        body.serialize_field("error", self.kind())?;
        body.serialize_field("status", &self.status())?;
        body.serialize_field("message", self.message())?;
        body.end()
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                match QueryError::from_statement_failure(db.message()) {
                    exists @ QueryError::ItemAlreadyExists(_) => exists,
                    _ => QueryError::ItemAlreadyExists(db.message().to_string()),
                }
            }
            sqlx::Error::Database(db) => QueryError::from_statement_failure(db.message()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => QueryError::GeneralServerError(error.to_string()),
            sqlx::Error::RowNotFound => QueryError::EmptySqlResult(error.to_string()),
            _ => QueryError::UnexpectedSqlResult(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        QueryError::UnexpectedSqlResult(format!("Malformed row: {}", error))
    }
}
