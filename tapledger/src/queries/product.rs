// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Product queries

use super::category::CATEGORIES;
use crate::db::{Statement, TransactionExecutor};
use crate::error::QueryResult;
use crate::key::{EntityKey, Table};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PRODUCTS: Table = Table::named("products");

const COLUMNS: &str = "id, name, category_id, price, volume_ml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// Serving size for draught products
    pub volume_ml: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: Option<i64>,
    pub price: f64,
    pub volume_ml: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<f64>,
    pub volume_ml: Option<i64>,
}

pub struct ProductQueries {
    executor: Arc<dyn TransactionExecutor>,
}

impl ProductQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn get_products(&self) -> QueryResult<Vec<Product>> {
        protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM products ORDER BY name", COLUMNS),
                vec![],
            ),
        )
        .await
    }

    pub async fn get_product(&self, key: &EntityKey) -> QueryResult<Vec<Product>> {
        let (filter, param) = key.read_filter(&PRODUCTS)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!("SELECT {} FROM products WHERE {}", COLUMNS, filter),
                vec![param],
            ),
            &format!("product '{}'", key),
        )
        .await
    }

    /// Products in the categories matching `category`
    pub async fn get_products_by_category(&self, category: &EntityKey) -> QueryResult<Vec<Product>> {
        let (filter, param) = category.read_filter(&CATEGORIES)?;
        protocol::select_some(
            self.executor.as_ref(),
            Statement::select(
                format!(
                    "SELECT {} FROM products WHERE category_id IN \
                     (SELECT id FROM categories WHERE {}) ORDER BY name",
                    COLUMNS, filter
                ),
                vec![param],
            ),
            &format!("products in category '{}'", category),
        )
        .await
    }

    pub async fn create_product(&self, product: &NewProduct) -> QueryResult<i64> {
        protocol::insert_returning_id(
            self.executor.as_ref(),
            Statement::insert(
                "INSERT INTO products (name, category_id, price, volume_ml) VALUES (?, ?, ?, ?)",
                vec![
                    product.name.as_str().into(),
                    product.category_id.into(),
                    product.price.into(),
                    product.volume_ml.into(),
                ],
            ),
        )
        .await
    }

    pub async fn update_product(
        &self,
        key: &EntityKey,
        update: &ProductUpdate,
    ) -> QueryResult<Product> {
        let (filter, param) = key.write_filter(&PRODUCTS)?;
        let statement = Statement::update(
            format!(
                "UPDATE products SET name = COALESCE(?, name), \
                 category_id = COALESCE(?, category_id), price = COALESCE(?, price), \
                 volume_ml = COALESCE(?, volume_ml) WHERE {}",
                filter
            ),
            vec![
                update.name.clone().into(),
                update.category_id.into(),
                update.price.into(),
                update.volume_ml.into(),
                param,
            ],
        )
        .targeting(PRODUCTS, key.clone());

        let (verify, params) = key.verify_filter(&PRODUCTS, update.name.as_deref())?;
        let select = Statement::select(
            format!("SELECT {} FROM products WHERE {}", COLUMNS, verify),
            params,
        );

        protocol::update_verified(
            self.executor.as_ref(),
            statement,
            select,
            &format!("product '{}'", key),
        )
        .await
    }

    pub async fn delete_product(&self, key: &EntityKey) -> QueryResult<()> {
        let (filter, param) = key.write_filter(&PRODUCTS)?;
        protocol::delete_verified(
            self.executor.as_ref(),
            Statement::delete(format!("DELETE FROM products WHERE {}", filter), vec![param]),
            &format!("product '{}'", key),
        )
        .await
    }
}
