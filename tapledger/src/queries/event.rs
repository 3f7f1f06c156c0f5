// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Event queries

use super::event_type::EVENT_TYPES;
use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const EVENTS: Table = Table::named("events");

const COLUMNS: &str = "id, name, event_type_id, date";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub event_type_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub event_type_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub event_type_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

pub struct EventQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl EventQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_events(&self) -> QueryResult<Vec<Event>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM events ORDER BY date DESC, name", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_event(&self, key: &EntityKey) -> QueryResult<Vec<Event>> {
        let (filter, param) = key.read_filter(&EVENTS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM events WHERE {}", COLUMNS, filter),
                vec![param],
            ),
            &format!("event '{}'", key),
        )
        .await
    }

    /// Events whose type matches `event_type`
    pub async fn get_events_by_type(&self, event_type: &EntityKey) -> QueryResult<Vec<Event>> {
        let (filter, param) = event_type.read_filter(&EVENT_TYPES)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!(
                    "SELECT {} FROM events WHERE event_type_id IN \
                     (SELECT id FROM event_types WHERE {}) ORDER BY date DESC",
                    COLUMNS, filter
                ),
                vec![param],
            ),
            &format!("events of type '{}'", event_type),
        )
        .await
    }

    pub async fn create_event(&self, event: &NewEvent) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert(
                "INSERT INTO events (name, event_type_id, date) VALUES (?, ?, ?)",
                vec![
                    event.name.as_str().into(),
                    event.event_type_id.into(),
                    event.date.into(),
                ],
            ),
        )
        .await
    }

    pub async fn update_event(&self, key: &EntityKey, update: &EventUpdate) -> QueryResult<Event> {
        let (filter, param) = key.write_filter(&EVENTS)?;
        let statement = Statement::update(
            format!(
                "UPDATE events SET name = COALESCE(?, name), \
                 event_type_id = COALESCE(?, event_type_id), date = COALESCE(?, date) WHERE {}",
                filter
            ),
            vec![
                update.name.clone().into(),
                update.event_type_id.into(),
                update.date.into(),
                param,
            ],
        )
        .targeting(EVENTS, key.clone());

        let (verify, params) = key.verify_filter(&EVENTS, update.name.as_deref())?;
        let select = Statement::select(
            format!("SELECT {} FROM events WHERE {}", COLUMNS, verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            statement,
            select,
            &format!("event '{}'", key),
        )
        .await
    }

    pub async fn delete_event(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&EVENTS)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM events WHERE {}", filter), vec![param]),
            &format!("event '{}'", key),
        )
        .await
    }
}
