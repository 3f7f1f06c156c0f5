// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Entity query modules
//!
//! One module per table family. Each builds its statements, submits them through a
//! shared [`crate::db::TransactionExecutor`] and decodes typed records.

pub mod authentication;
pub mod category;
pub mod customer;
pub mod event;
pub mod event_type;
pub mod flow_stand;
pub mod hot_key;
pub mod product;
pub mod sale;

pub use authentication::{AuthenticationQueries, Clock, FixedClock, Session, SystemClock};
pub use category::{Category, CategoryQueries};
pub use customer::{Customer, CustomerQueries, CustomerUpdate, NewCustomer};
pub use event::{Event, EventQueries, EventUpdate, NewEvent};
pub use event_type::{EventType, EventTypeQueries};
pub use flow_stand::{FlowReading, FlowStand, FlowStandQueries, FlowStandUpdate, NewFlowStand};
pub use hot_key::{HotKey, HotKeyQueries, HotKeyUpdate, NewHotKey};
pub use product::{NewProduct, Product, ProductQueries, ProductUpdate};
pub use sale::{NewSale, Sale, SaleQueries, SaleUpdate, UserSale};
