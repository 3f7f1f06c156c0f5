// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Tapledger - transactional persistence core for a point-of-sale service
//!
//! Tapledger stores the catalog, customers, events, tap readings, sales and login
//! sessions of a bar or event point of sale in a relational store.
//!
//! # Features
//!
//! - **Atomic batches**: every operation is an ordered batch of statements that
//!   commits or rolls back as a whole
//! - **Update-verify protocol**: updates report changed, unchanged or not found
//!   from the store's own row counters
//! - **Dual-key addressing**: rows are addressed by numeric id or unique name
//! - **Four error kinds**: each maps to one HTTP status at the service boundary
//! - **Simulated executor**: an in-memory store with forced outcomes for tests
//!
//! # Usage
//!
//! ```ignore
//! let store = PosStore::connect(DatabaseConfig::from_env()?).await?;
//! let category = store
//!     .categories()
//!     .update_category_name(&EntityKey::parse("Beer"), "Craft Beer")
//!     .await?;
//! ```

pub mod db;
pub mod error;
pub mod key;
pub mod protocol;
pub mod queries;
pub mod store;

pub use db::{
    Batch, DatabaseConfig, OkPacket, Param, RelationalExecutor, SimulatedExecutor, Statement,
    TransactionExecutor, TransactionResult,
};
pub use error::{QueryError, QueryResult};
pub use key::{EntityKey, Table};
pub use store::PosStore;

/// Tapledger version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tapledger crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
