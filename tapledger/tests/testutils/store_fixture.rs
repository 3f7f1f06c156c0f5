//! Simulated store fixture
//!
//! Uses only the public API: a [`SimulatedExecutor`] wrapped in a [`PosStore`].

use serde_json::{json, Value};
use std::sync::Arc;
use tapledger::{PosStore, SimulatedExecutor};

pub struct StoreFixture {
    pub executor: Arc<SimulatedExecutor>,
    pub store: PosStore,
}

impl StoreFixture {
    /// Store holding the two default rows (`product`, `F1`)
    pub fn new() -> Self {
        super::init_logger();
        Self::from_executor(SimulatedExecutor::new())
    }

    pub fn with_rows(rows: Vec<Value>) -> Self {
        super::init_logger();
        Self::from_executor(SimulatedExecutor::with_rows(rows))
    }

    /// A small product catalog with ids 1..=3
    pub fn with_catalog() -> Self {
        Self::with_rows(vec![
            json!({"id": 1, "name": "Pilsner", "category_id": 1, "price": 4.5, "volume_ml": 500}),
            json!({"id": 2, "name": "Stout", "category_id": 1, "price": 5.0, "volume_ml": 330}),
            json!({"id": 3, "name": "Cola", "category_id": 2, "price": 2.5, "volume_ml": null}),
        ])
    }

    fn from_executor(executor: SimulatedExecutor) -> Self {
        let executor = Arc::new(executor);
        let store = PosStore::new(executor.clone());
        Self { executor, store }
    }
}
