// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Dual-key entity addressing
//!
//! Callers address rows with a single string that is either the numeric id or the
//! unique name. The string is resolved once into an [`EntityKey`] and that value is
//! handed to every statement that must address the same row.

use crate::db::statement::Param;
use crate::error::{QueryError, QueryResult};
use std::fmt;

/// Column layout of an entity table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    /// Table name
    pub name: &'static str,
    /// Surrogate key column assigned by the store
    pub id_column: &'static str,
    /// Unique name column, absent for tables that are only addressed by id
    pub name_column: Option<&'static str>,
}

impl Table {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            id_column: "id",
            name_column: Some("name"),
        }
    }

    pub const fn id_only(name: &'static str) -> Self {
        Self {
            name,
            id_column: "id",
            name_column: None,
        }
    }
}

/// An entity lookup key: the numeric id or the unique name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    ById(i64),
    ByName(String),
}

impl EntityKey {
    /// Resolve a raw key: anything that parses as an integer is an id
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => EntityKey::ById(id),
            Err(_) => EntityKey::ByName(trimmed.to_string()),
        }
    }

    /// Filter used by reads: exact id, or name containment
    pub fn read_filter(&self, table: &Table) -> QueryResult<(String, Param)> {
        match self {
            EntityKey::ById(id) => Ok((format!("{} = ?", table.id_column), Param::Int(*id))),
            EntityKey::ByName(name) => {
                let column = self.name_column(table)?;
                Ok((
                    format!("{} LIKE ?", column),
                    Param::Text(format!("%{}%", name)),
                ))
            }
        }
    }

    /// Filter used by writes: exact id, or exact name
    pub fn write_filter(&self, table: &Table) -> QueryResult<(String, Param)> {
        match self {
            EntityKey::ById(id) => Ok((format!("{} = ?", table.id_column), Param::Int(*id))),
            EntityKey::ByName(name) => {
                let column = self.name_column(table)?;
                Ok((format!("{} = ?", column), Param::Text(name.clone())))
            }
        }
    }

    /// Filter for the SELECT paired with an UPDATE that may rename the row
    ///
    /// A row addressed by name is looked up under its new name when one was supplied,
    /// so the verification read still lands on the row the UPDATE touched.
    pub fn verify_filter(
        &self,
        table: &Table,
        new_name: Option<&str>,
    ) -> QueryResult<(String, Vec<Param>)> {
        match self {
            EntityKey::ById(id) => Ok((
                format!("{} = ?", table.id_column),
                vec![Param::Int(*id)],
            )),
            EntityKey::ByName(name) => {
                let column = self.name_column(table)?;
                Ok((
                    format!("{} = COALESCE(?, ?)", column),
                    vec![new_name.into(), Param::Text(name.clone())],
                ))
            }
        }
    }

    fn name_column(&self, table: &Table) -> QueryResult<&'static str> {
        table.name_column.ok_or_else(|| {
            QueryError::EmptySqlResult(format!(
                "{} rows can only be addressed by id, got '{}'",
                table.name, self
            ))
        })
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::ById(id) => write!(f, "{}", id),
            EntityKey::ByName(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        EntityKey::ById(id)
    }
}

impl From<&str> for EntityKey {
    fn from(raw: &str) -> Self {
        EntityKey::parse(raw)
    }
}

impl From<String> for EntityKey {
    fn from(raw: String) -> Self {
        EntityKey::parse(&raw)
    }
}
