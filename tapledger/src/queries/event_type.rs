// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Event type queries

use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const EVENT_TYPES: Table = Table::named("event_types");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub id: i64,
    pub name: String,
}

pub struct EventTypeQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl EventTypeQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_event_types(&self) -> QueryResult<Vec<EventType>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select("SELECT id, name FROM event_types ORDER BY name", vec![]),
        )
        .await
    }

    pub async fn get_event_type(&self, key: &EntityKey) -> QueryResult<Vec<EventType>> {
        let (filter, param) = key.read_filter(&EVENT_TYPES)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT id, name FROM event_types WHERE {}", filter),
                vec![param],
            ),
            &format!("event type '{}'", key),
        )
        .await
    }

    pub async fn create_event_type(&self, name: &str) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert("INSERT INTO event_types (name) VALUES (?)", vec![name.into()]),
        )
        .await
    }

    pub async fn update_event_type_name(
        &self,
        key: &EntityKey,
        new_name: &str,
    ) -> QueryResult<EventType> {
        let (filter, param) = key.write_filter(&EVENT_TYPES)?;
        let update = Statement::update(
            format!("UPDATE event_types SET name = ? WHERE {}", filter),
            vec![new_name.into(), param],
        )
        .targeting(EVENT_TYPES, key.clone());

        let (verify, params) = key.verify_filter(&EVENT_TYPES, Some(new_name))?;
        let select = Statement::select(
            format!("SELECT id, name FROM event_types WHERE {}", verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            update,
            select,
            &format!("event type '{}'", key),
        )
        .await
    }

    pub async fn delete_event_type(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&EVENT_TYPES)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM event_types WHERE {}", filter), vec![param]),
            &format!("event type '{}'", key),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::simulated::SELECT_NO_OP;
    use crate::db::SimulatedExecutor;

    #[tokio::test]
    async fn test_rename_twice_reports_no_op() {
        let executor = Arc::new(SimulatedExecutor::new());
        let queries = EventTypeQueries::new(executor.clone());
        let key = EntityKey::parse("1");

        let renamed = queries.update_event_type_name(&key, "product").await.unwrap();
        assert_eq!(renamed.id, 1);

        executor.set_selector(SELECT_NO_OP);
        let err = queries
            .update_event_type_name(&key, "product")
            .await
            .unwrap_err();
        assert!(err.is_item_already_exists());
    }
}
