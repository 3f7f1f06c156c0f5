// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Statements and batches
//!
//! A [`Statement`] is one parameterized SQL operation. Its [`Verb`] is fixed when the
//! statement is built, so executors dispatch on a closed enum instead of re-reading
//! the command text.

use crate::error::{QueryError, QueryResult};
use crate::key::{EntityKey, Table};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Select,
    Insert,
    Update,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Select => "SELECT",
            Verb::Insert => "INSERT",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for Verb {
    type Err = QueryError;

    /// Case-sensitive match on the leading SQL keyword
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SELECT" => Ok(Verb::Select),
            "INSERT" => Ok(Verb::Insert),
            "UPDATE" => Ok(Verb::Update),
            "DELETE" => Ok(Verb::Delete),
            other => Err(QueryError::GeneralServerError(format!(
                "Unsupported statement verb: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// SQL NULL; also stands in for values the caller left unset
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Param {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Param::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Param::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v as i64)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<u32> for Param {
    fn from(v: u32) -> Self {
        Param::Int(v as i64)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<&String> for Param {
    fn from(v: &String) -> Self {
        Param::Text(v.clone())
    }
}

impl From<NaiveDate> for Param {
    fn from(v: NaiveDate) -> Self {
        Param::Date(v)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(v: NaiveDateTime) -> Self {
        Param::DateTime(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Param::Null,
        }
    }
}

/// Row addressed by an UPDATE
///
/// Executors that cannot tell matched rows from changed rows use this to snapshot
/// the addressed rows before and after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTarget {
    pub table: Table,
    pub key: EntityKey,
}

/// One parameterized operation inside a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    id: usize,
    verb: Verb,
    command: String,
    parameters: Vec<Param>,
    target: Option<RowTarget>,
    require_match: bool,
}

impl Statement {
    fn new(verb: Verb, command: impl Into<String>, parameters: Vec<Param>) -> Self {
        Self {
            id: 0,
            verb,
            command: command.into(),
            parameters,
            target: None,
            require_match: false,
        }
    }

    pub fn select(command: impl Into<String>, parameters: Vec<Param>) -> Self {
        Self::new(Verb::Select, command, parameters)
    }

    pub fn insert(command: impl Into<String>, parameters: Vec<Param>) -> Self {
        Self::new(Verb::Insert, command, parameters)
    }

    pub fn update(command: impl Into<String>, parameters: Vec<Param>) -> Self {
        Self::new(Verb::Update, command, parameters)
    }

    pub fn delete(command: impl Into<String>, parameters: Vec<Param>) -> Self {
        Self::new(Verb::Delete, command, parameters)
    }

    /// Build a statement from raw SQL, taking the verb from its first token
    pub fn parse(command: impl Into<String>, parameters: Vec<Param>) -> QueryResult<Self> {
        let command = command.into();
        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .parse::<Verb>()?;
        Ok(Self::new(verb, command, parameters))
    }

    /// Attach the row this UPDATE addresses
    pub fn targeting(mut self, table: Table, key: EntityKey) -> Self {
        self.target = Some(RowTarget { table, key });
        self
    }

    /// Fail the whole batch with `EmptySqlResult` if this write matches no row
    pub fn requiring_match(mut self) -> Self {
        self.require_match = true;
        self
    }

    pub fn requires_match(&self) -> bool {
        self.require_match
    }

    /// Positional id within the batch (1-based, 0 before the statement is batched)
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    pub fn target(&self) -> Option<&RowTarget> {
        self.target.as_ref()
    }
}

/// Ordered statements submitted as one atomic unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    statements: Vec<Statement>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement, assigning the next positional id
    pub fn push(&mut self, mut statement: Statement) -> usize {
        statement.id = self.statements.len() + 1;
        let id = statement.id;
        self.statements.push(statement);
        id
    }

    /// Builder form of [`Batch::push`]
    pub fn with(mut self, statement: Statement) -> Self {
        self.push(statement);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Id of the last statement, the batch completion sentinel
    pub fn last_id(&self) -> Option<usize> {
        self.statements.last().map(Statement::id)
    }
}

impl From<Statement> for Batch {
    fn from(statement: Statement) -> Self {
        Batch::new().with(statement)
    }
}

impl FromIterator<Statement> for Batch {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for statement in iter {
            batch.push(statement);
        }
        batch
    }
}
