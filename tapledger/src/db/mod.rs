// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Transactional persistence layer
//!
//! This module turns an ordered list of statements into one atomic unit against a
//! relational store.
//!
//! # Components
//! - [`Statement`] / [`Batch`]: parameterized operations with positional ids
//! - [`TransactionExecutor`]: the atomic batch contract
//! - [`RelationalExecutor`]: pooled MySQL implementation
//! - [`SimulatedExecutor`]: in-memory implementation with forced outcomes for tests
//! - [`DatabaseConfig`]: pool size, timeouts and connection URL

pub mod config;
pub mod executor;
pub mod relational;
pub mod result;
pub mod simulated;
pub mod statement;

pub use config::DatabaseConfig;
pub use executor::TransactionExecutor;
pub use relational::{PoolStatus, RelationalExecutor, TransactionPhase};
pub use result::{OkPacket, Row, StatementResult, TransactionResult};
pub use simulated::SimulatedExecutor;
pub use statement::{Batch, Param, RowTarget, Statement, Verb};
