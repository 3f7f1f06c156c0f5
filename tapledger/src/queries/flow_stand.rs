// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Flow stand queries
//!
//! A flow stand is the meter reading of one tap. Recording a reading stores it on the
//! stand and appends a history row to `flow_readings` in the same batch.

use crate::db::{Batch, Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const FLOW_STANDS: Table = Table::named("flow_stands");

const COLUMNS: &str = "id, name, product_id, reading";
const READING_COLUMNS: &str = "id, flow_stand_id, event_id, reading, recorded_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStand {
    pub id: i64,
    pub name: String,
    pub product_id: Option<i64>,
    #[serde(default)]
    pub reading: f64,
}

/// One historical meter reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReading {
    pub id: i64,
    pub flow_stand_id: i64,
    pub event_id: Option<i64>,
    pub reading: f64,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFlowStand {
    pub name: String,
    pub product_id: Option<i64>,
    pub reading: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowStandUpdate {
    pub name: Option<String>,
    pub product_id: Option<i64>,
}

pub struct FlowStandQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl FlowStandQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_flow_stands(&self) -> QueryResult<Vec<FlowStand>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM flow_stands ORDER BY name", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_flow_stand(&self, key: &EntityKey) -> QueryResult<Vec<FlowStand>> {
        let (filter, param) = key.read_filter(&FLOW_STANDS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM flow_stands WHERE {}", COLUMNS, filter),
                vec![param],
            ),
            &format!("flow stand '{}'", key),
        )
        .await
    }

    pub async fn create_flow_stand(&self, stand: &NewFlowStand) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert(
                "INSERT INTO flow_stands (name, product_id, reading) VALUES (?, ?, ?)",
                vec![
                    stand.name.as_str().into(),
                    stand.product_id.into(),
                    stand.reading.into(),
                ],
            ),
        )
        .await
    }

    pub async fn update_flow_stand(
        &self,
        key: &EntityKey,
        update: &FlowStandUpdate,
    ) -> QueryResult<FlowStand> {
        let (filter, param) = key.write_filter(&FLOW_STANDS)?;
        let statement = Statement::update(
            format!(
                "UPDATE flow_stands SET name = COALESCE(?, name), \
                 product_id = COALESCE(?, product_id) WHERE {}",
                filter
            ),
            vec![update.name.clone().into(), update.product_id.into(), param],
        )
        .targeting(FLOW_STANDS, key.clone());

        let (verify, params) = key.verify_filter(&FLOW_STANDS, update.name.as_deref())?;
        let select = Statement::select(
            format!("SELECT {} FROM flow_stands WHERE {}", COLUMNS, verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            statement,
            select,
            &format!("flow stand '{}'", key),
        )
        .await
    }

    /// Store a new meter reading and append it to the stand's history
    ///
    /// The history row is only written when the reading differs from the stored one,
    /// so recording the same value twice fails with `ItemAlreadyExists` and leaves no
    /// trace.
    pub async fn record_reading(
        &self,
        key: &EntityKey,
        reading: f64,
        event_id: Option<i64>,
    ) -> QueryResult<FlowStand> {
        let (filter, param) = key.write_filter(&FLOW_STANDS)?;
        let (verify, verify_params) = key.verify_filter(&FLOW_STANDS, None)?;

        let mut batch = Batch::new();
        batch.push(Statement::insert(
            format!(
                "INSERT INTO flow_readings (flow_stand_id, event_id, reading, recorded_at) \
                 SELECT id, ?, ?, NOW() FROM flow_stands WHERE {} AND reading <> ?",
                filter
            ),
            vec![event_id.into(), reading.into(), param.clone(), reading.into()],
        ));
        let update_id = batch.push(
            Statement::update(
                format!("UPDATE flow_stands SET reading = ? WHERE {}", filter),
                vec![reading.into(), param],
            )
            .targeting(FLOW_STANDS, key.clone()),
        );
        let select_id = batch.push(Statement::select(
            format!("SELECT {} FROM flow_stands WHERE {}", COLUMNS, verify),
            verify_params,
        ));

        let result = self.executor.execute_transactions(&batch).await?;
        log::debug!("Recorded reading {} on flow stand '{}'", reading, key);
        protocol::verify_update(
            &result,
            update_id,
            select_id,
            &format!("flow stand '{}'", key),
        )
    }

    /// Reading history of a stand, oldest first
    pub async fn get_readings(&self, key: &EntityKey) -> QueryResult<Vec<FlowReading>> {
        let (filter, param) = key.read_filter(&FLOW_STANDS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!(
                    "SELECT {} FROM flow_readings WHERE flow_stand_id IN \
                     (SELECT id FROM flow_stands WHERE {}) ORDER BY recorded_at, id",
                    READING_COLUMNS, filter
                ),
                vec![param],
            ),
            &format!("readings of flow stand '{}'", key),
        )
        .await
    }

    pub async fn delete_flow_stand(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&FLOW_STANDS)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(
                format!("DELETE FROM flow_stands WHERE {}", filter),
                vec![param],
            ),
            &format!("flow stand '{}'", key),
        )
        .await
    }
}
