// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Sale queries
//!
//! Every sale debits the buying customer's balance in the same batch that writes the
//! sale, and changing or deleting a sale corrects the balance the same way. Sales are
//! addressed by id only.

use super::customer::CUSTOMERS;
use super::event::EVENTS;
use crate::db::{Batch, Statement, TransactionExecutor};
use crate::error::{QueryError, QueryResult};
use crate::key::{EntityKey, Table};
use crate::protocol;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SALES: Table = Table::id_only("sales");

const COLUMNS: &str = "id, customer_id, product_id, event_id, quantity, unit_price, sold_at";

const LINE_QUERY: &str = "SELECT s.id AS sale_id, c.id AS customer_id, c.name AS customer_name, \
     p.name AS product_name, s.quantity, s.quantity * s.unit_price AS total, s.sold_at \
     FROM sales s \
     JOIN customers c ON c.id = s.customer_id \
     JOIN products p ON p.id = s.product_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub event_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: f64,
    pub sold_at: NaiveDateTime,
}

/// A sale joined with its customer and product names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSale {
    pub sale_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub product_name: String,
    pub quantity: i64,
    pub total: f64,
    pub sold_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_id: i64,
    pub product_id: i64,
    pub event_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: f64,
    /// Defaults to the store's current time
    pub sold_at: Option<NaiveDateTime>,
}

impl NewSale {
    pub fn total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleUpdate {
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub event_id: Option<i64>,
}

pub struct SaleQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl SaleQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_sales(&self) -> QueryResult<Vec<Sale>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM sales ORDER BY sold_at DESC, id DESC", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_sale(&self, id: i64) -> QueryResult<Sale> {
        let rows = protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM sales WHERE id = ?", COLUMNS),
                vec![id.into()],
            ),
            &format!("sale {}", id),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| QueryError::EmptySqlResult(format!("sale {} not found", id)))
    }

    /// Write the sale and debit the customer in one batch
    ///
    /// A missing customer rolls the sale back and fails with `EmptySqlResult`.
    pub async fn create_sale(&self, sale: &NewSale) -> QueryResult<i64> {
        let mut batch = Batch::new();
        // Debit first: a missing customer must stop the batch before the insert
        batch.push(
            Statement::update(
                "UPDATE customers SET balance = balance - ? WHERE id = ?",
                vec![sale.total().into(), sale.customer_id.into()],
            )
            .requiring_match(),
        );
        let insert_id = batch.push(Statement::insert(
            "INSERT INTO sales (customer_id, product_id, event_id, quantity, unit_price, sold_at) \
             VALUES (?, ?, ?, ?, ?, COALESCE(?, NOW()))",
            vec![
                sale.customer_id.into(),
                sale.product_id.into(),
                sale.event_id.into(),
                sale.quantity.into(),
                sale.unit_price.into(),
                sale.sold_at.into(),
            ],
        ));

        let result = self.executor.execute_transactions(&batch).await?;
        let id = protocol::inserted_id(&result, insert_id)?;
        log::debug!(
            "Sale {} debited {:.2} from customer {}",
            id,
            sale.total(),
            sale.customer_id
        );
        Ok(id)
    }

    /// Change a sale and move the difference onto the customer's balance
    pub async fn update_sale(&self, id: i64, update: &SaleUpdate) -> QueryResult<Sale> {
        let key = EntityKey::ById(id);
        let (filter, param) = key.write_filter(&SALES)?;

        let mut batch = Batch::new();
        // Runs first so it still sees the old quantity and price. The delta is computed
        // before it touches the balance, so an unchanged total adds exactly zero.
        batch.push(Statement::update(
            "UPDATE customers c JOIN sales s ON s.customer_id = c.id \
             SET c.balance = c.balance + (s.quantity * s.unit_price \
             - COALESCE(?, s.quantity) * COALESCE(?, s.unit_price)) WHERE s.id = ?",
            vec![update.quantity.into(), update.unit_price.into(), id.into()],
        ));
        let update_id = batch.push(
            Statement::update(
                format!(
                    "UPDATE sales SET quantity = COALESCE(?, quantity), \
                     unit_price = COALESCE(?, unit_price), event_id = COALESCE(?, event_id) \
                     WHERE {}",
                    filter
                ),
                vec![
                    update.quantity.into(),
                    update.unit_price.into(),
                    update.event_id.into(),
                    param.clone(),
                ],
            )
            .targeting(SALES, key.clone()),
        );
        let select_id = batch.push(Statement::select(
            format!("SELECT {} FROM sales WHERE {}", COLUMNS, filter),
            vec![param],
        ));

        let result = self.executor.execute_transactions(&batch).await?;
        protocol::verify_update(&result, update_id, select_id, &format!("sale {}", id))
    }

    /// Delete a sale and credit its total back to the customer
    pub async fn delete_sale(&self, id: i64) -> QueryResult<()> {
        let batch = Batch::new()
            .with(Statement::update(
                "UPDATE customers c JOIN sales s ON s.customer_id = c.id \
                 SET c.balance = c.balance + s.quantity * s.unit_price WHERE s.id = ?",
                vec![id.into()],
            ))
            .with(
                Statement::delete("DELETE FROM sales WHERE id = ?", vec![id.into()])
                    .requiring_match(),
            );

        self.executor
            .execute_transactions(&batch)
            .await
            .map_err(|err| match err {
                QueryError::EmptySqlResult(_) => {
                    QueryError::EmptySqlResult(format!("sale {} not found", id))
                }
                other => other,
            })?;
        Ok(())
    }

    /// Sales of customers matching `customer`, newest first
    pub async fn get_user_sales(&self, customer: &EntityKey) -> QueryResult<Vec<UserSale>> {
        let (filter, param) = customer.read_filter(&CUSTOMERS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!(
                    "{} WHERE s.customer_id IN (SELECT id FROM customers WHERE {}) \
                     ORDER BY s.sold_at DESC",
                    LINE_QUERY, filter
                ),
                vec![param],
            ),
            &format!("sales of customer '{}'", customer),
        )
        .await
    }

    /// Sales made during events matching `event`, newest first
    pub async fn get_event_sales(&self, event: &EntityKey) -> QueryResult<Vec<UserSale>> {
        let (filter, param) = event.read_filter(&EVENTS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!(
                    "{} WHERE s.event_id IN (SELECT id FROM events WHERE {}) \
                     ORDER BY s.sold_at DESC",
                    LINE_QUERY, filter
                ),
                vec![param],
            ),
            &format!("sales of event '{}'", event),
        )
        .await
    }
}
