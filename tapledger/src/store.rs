// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Store facade
//!
//! [`PosStore`] owns the executor and hands out the entity query modules, all sharing
//! the same pool.

use crate::db::{DatabaseConfig, RelationalExecutor, TransactionExecutor};
use crate::error::QueryResult;
use crate::queries::{
    AuthenticationQueries, CategoryQueries, CustomerQueries, EventQueries, EventTypeQueries,
    FlowStandQueries, HotKeyQueries, ProductQueries, SaleQueries,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct PosStore {
    executor: Arc<dyn TransactionExecutor>,
    session_ttl: Duration,
}

impl PosStore {
    /// Wrap an existing executor, using the default session time to live
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self {
            executor,
            session_ttl: DatabaseConfig::default().session_ttl,
        }
    }

    /// Open a pooled MySQL store
    pub async fn connect(config: DatabaseConfig) -> QueryResult<Self> {
        config.validate()?;
        let executor = RelationalExecutor::connect(&config).await?;
        log::info!(
            "Store ready with up to {} connections",
            config.max_connections
        );
        Ok(Self {
            executor: Arc::new(executor),
            session_ttl: config.session_ttl,
        })
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn executor(&self) -> Arc<dyn TransactionExecutor> {
        self.executor.clone()
    }

    pub fn categories(&self) -> CategoryQueries {
        CategoryQueries::new(self.executor.clone())
    }

    pub fn customers(&self) -> CustomerQueries {
        CustomerQueries::new(self.executor.clone())
    }

    pub fn products(&self) -> ProductQueries {
        ProductQueries::new(self.executor.clone())
    }

    pub fn event_types(&self) -> EventTypeQueries {
        EventTypeQueries::new(self.executor.clone())
    }

    pub fn events(&self) -> EventQueries {
        EventQueries::new(self.executor.clone())
    }

    pub fn hot_keys(&self) -> HotKeyQueries {
        HotKeyQueries::new(self.executor.clone())
    }

    pub fn flow_stands(&self) -> FlowStandQueries {
        FlowStandQueries::new(self.executor.clone())
    }

    pub fn sales(&self) -> SaleQueries {
        SaleQueries::new(self.executor.clone())
    }

    pub fn authentication(&self) -> AuthenticationQueries {
        AuthenticationQueries::new(self.executor.clone(), self.session_ttl)
    }
}

impl std::fmt::Debug for PosStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosStore")
            .field("backend", &self.executor.backend_name())
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
