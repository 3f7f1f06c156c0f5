// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Hot key queries
//!
//! Hot keys are the quick-sale buttons of the register, each bound to a product.

use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const HOT_KEYS: Table = Table::named("hot_keys");

const COLUMNS: &str = "id, name, product_id, position";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotKey {
    pub id: i64,
    pub name: String,
    pub product_id: Option<i64>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewHotKey {
    pub name: String,
    pub product_id: Option<i64>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotKeyUpdate {
    pub name: Option<String>,
    pub product_id: Option<i64>,
    pub position: Option<i64>,
}

pub struct HotKeyQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl HotKeyQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_hot_keys(&self) -> QueryResult<Vec<HotKey>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM hot_keys ORDER BY position, name", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_hot_key(&self, key: &EntityKey) -> QueryResult<Vec<HotKey>> {
        let (filter, param) = key.read_filter(&HOT_KEYS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM hot_keys WHERE {}", COLUMNS, filter),
                vec![param],
            ),
            &format!("hot key '{}'", key),
        )
        .await
    }

    pub async fn create_hot_key(&self, hot_key: &NewHotKey) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert(
                "INSERT INTO hot_keys (name, product_id, position) VALUES (?, ?, ?)",
                vec![
                    hot_key.name.as_str().into(),
                    hot_key.product_id.into(),
                    hot_key.position.into(),
                ],
            ),
        )
        .await
    }

    pub async fn update_hot_key(
        &self,
        key: &EntityKey,
        update: &HotKeyUpdate,
    ) -> QueryResult<HotKey> {
        let (filter, param) = key.write_filter(&HOT_KEYS)?;
        let statement = Statement::update(
            format!(
                "UPDATE hot_keys SET name = COALESCE(?, name), \
                 product_id = COALESCE(?, product_id), position = COALESCE(?, position) WHERE {}",
                filter
            ),
            vec![
                update.name.clone().into(),
                update.product_id.into(),
                update.position.into(),
                param,
            ],
        )
        .targeting(HOT_KEYS, key.clone());

        let (verify, params) = key.verify_filter(&HOT_KEYS, update.name.as_deref())?;
        let select = Statement::select(
            format!("SELECT {} FROM hot_keys WHERE {}", COLUMNS, verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            statement,
            select,
            &format!("hot key '{}'", key),
        )
        .await
    }

    pub async fn delete_hot_key(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&HOT_KEYS)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM hot_keys WHERE {}", filter), vec![param]),
            &format!("hot key '{}'", key),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimulatedExecutor;
    use serde_json::json;

    #[tokio::test]
    async fn test_rebind_hot_key() {
        let executor = Arc::new(SimulatedExecutor::with_rows(vec![
            json!({"id": 1, "name": "F1", "product_id": 4, "position": 1}),
            json!({"id": 2, "name": "F2", "product_id": null, "position": 2}),
        ]));
        let queries = HotKeyQueries::new(executor.clone());

        let update = HotKeyUpdate {
            product_id: Some(7),
            ..Default::default()
        };
        let hot_key = queries
            .update_hot_key(&EntityKey::parse("F2"), &update)
            .await
            .unwrap();
        assert_eq!(hot_key.position, Some(2));

        executor.set_reachable(false);
        let err = queries.get_hot_keys().await.unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
