// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Category queries

use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CATEGORIES: Table = Table::named("categories");

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

pub struct CategoryQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl CategoryQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_categories(&self) -> QueryResult<Vec<Category>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select("SELECT id, name FROM categories ORDER BY name", vec![]),
        )
        .await
    }

    /// Categories matching `key`: one by id, or every name containing it
    pub async fn get_category(&self, key: &EntityKey) -> QueryResult<Vec<Category>> {
        let (filter, param) = key.read_filter(&CATEGORIES)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT id, name FROM categories WHERE {}", filter),
                vec![param],
            ),
            &format!("category '{}'", key),
        )
        .await
    }

    pub async fn create_category(&self, name: &str) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert("INSERT INTO categories (name) VALUES (?)", vec![name.into()]),
        )
        .await
    }

    pub async fn update_category_name(
        &self,
        key: &EntityKey,
        new_name: &str,
    ) -> QueryResult<Category> {
        let (filter, param) = key.write_filter(&CATEGORIES)?;
        let update = Statement::update(
            format!("UPDATE categories SET name = ? WHERE {}", filter),
            vec![new_name.into(), param],
        )
        .targeting(CATEGORIES, key.clone());

        let (verify, params) = key.verify_filter(&CATEGORIES, Some(new_name))?;
        let select = Statement::select(
            format!("SELECT id, name FROM categories WHERE {}", verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            update,
            select,
            &format!("category '{}'", key),
        )
        .await
    }

    pub async fn delete_category(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&CATEGORIES)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM categories WHERE {}", filter), vec![param]),
            &format!("category '{}'", key),
        )
        .await
    }
}
