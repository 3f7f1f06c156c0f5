// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Customer queries
//!
//! Customers carry a running balance that sales debit.

use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CUSTOMERS: Table = Table::named("customers");

const COLUMNS: &str = "id, name, email, phone, balance";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub balance: Option<f64>,
}

/// Sparse customer update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub balance: Option<f64>,
}

pub struct CustomerQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl CustomerQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_customers(&self) -> QueryResult<Vec<Customer>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM customers ORDER BY name", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_customer(&self, key: &EntityKey) -> QueryResult<Vec<Customer>> {
        let (filter, param) = key.read_filter(&CUSTOMERS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM customers WHERE {}", COLUMNS, filter),
                vec![param],
            ),
            &format!("customer '{}'", key),
        )
        .await
    }

    pub async fn create_customer(&self, customer: &NewCustomer) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert(
                "INSERT INTO customers (name, email, phone, balance) VALUES (?, ?, ?, COALESCE(?, 0))",
                vec![
                    customer.name.as_str().into(),
                    customer.email.clone().into(),
                    customer.phone.clone().into(),
                    customer.balance.into(),
                ],
            ),
        )
        .await
    }

    pub async fn update_customer(
        &self,
        key: &EntityKey,
        update: &CustomerUpdate,
    ) -> QueryResult<Customer> {
        let (filter, param) = key.write_filter(&CUSTOMERS)?;
        let statement = Statement::update(
            format!(
                "UPDATE customers SET name = COALESCE(?, name), email = COALESCE(?, email), \
                 phone = COALESCE(?, phone), balance = COALESCE(?, balance) WHERE {}",
                filter
            ),
            vec![
                update.name.clone().into(),
                update.email.clone().into(),
                update.phone.clone().into(),
                update.balance.into(),
                param,
            ],
        )
        .targeting(CUSTOMERS, key.clone());

        let (verify, params) = key.verify_filter(&CUSTOMERS, update.name.as_deref())?;
        let select = Statement::select(
            format!("SELECT {} FROM customers WHERE {}", COLUMNS, verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            statement,
            select,
            &format!("customer '{}'", key),
        )
        .await
    }

    pub async fn delete_customer(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&CUSTOMERS)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM customers WHERE {}", filter), vec![param]),
            &format!("customer '{}'", key),
        )
        .await
    }
}
