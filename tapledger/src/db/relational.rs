// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Pool-backed MySQL executor
//!
//! Every batch runs on its own pooled connection inside one transaction:
//!
//! ```text
//! Idle -> ConnectionAcquired -> TransactionOpen -> StatementsRunning
//!      -> Committed | RolledBack -> ConnectionReleased
//! ```
//!
//! The connection is held by a [`Checkout`] guard, so it goes back to the pool on
//! every exit path, including a transaction timeout dropping the future.

use super::config::DatabaseConfig;
use super::executor::{enforce_match, TransactionExecutor};
use super::result::{OkPacket, Row, StatementResult, TransactionResult};
use super::statement::{Batch, Param, RowTarget, Statement, Verb};
use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnection, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, Connection, Row as SqlxRow, TypeInfo};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of one batch on the relational executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Idle,
    ConnectionAcquired,
    TransactionOpen,
    StatementsRunning,
    Committed,
    RolledBack,
    ConnectionReleased,
}

impl fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionPhase::Idle => "idle",
            TransactionPhase::ConnectionAcquired => "connection acquired",
            TransactionPhase::TransactionOpen => "transaction open",
            TransactionPhase::StatementsRunning => "statements running",
            TransactionPhase::Committed => "committed",
            TransactionPhase::RolledBack => "rolled back",
            TransactionPhase::ConnectionReleased => "connection released",
        };
        f.write_str(name)
    }
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle or checked out
    pub size: u32,
    /// Open connections waiting in the pool
    pub idle: usize,
    /// Connections currently held by running batches
    pub checked_out: usize,
    /// Connections handed back since the executor was created
    pub released_total: u64,
}

#[derive(Debug, Default)]
struct CheckoutCounters {
    checked_out: AtomicUsize,
    released_total: AtomicU64,
}

/// A pooled connection held for the duration of one batch
struct Checkout {
    conn: PoolConnection<MySql>,
    counters: Arc<CheckoutCounters>,
    batch: u64,
}

impl Checkout {
    fn new(conn: PoolConnection<MySql>, counters: Arc<CheckoutCounters>, batch: u64) -> Self {
        counters.checked_out.fetch_add(1, Ordering::SeqCst);
        Self {
            conn,
            counters,
            batch,
        }
    }
}

impl Deref for Checkout {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &*self.conn
    }
}

impl DerefMut for Checkout {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.conn
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        self.counters.checked_out.fetch_sub(1, Ordering::SeqCst);
        self.counters.released_total.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Batch {}: {}",
            self.batch,
            TransactionPhase::ConnectionReleased
        );
    }
}

/// Executor backed by a bounded MySQL connection pool
#[derive(Clone)]
pub struct RelationalExecutor {
    pool: MySqlPool,
    transaction_timeout: Duration,
    counters: Arc<CheckoutCounters>,
    next_batch: Arc<AtomicU64>,
}

impl RelationalExecutor {
    /// Open the pool and establish a first connection
    pub async fn connect(config: &DatabaseConfig) -> QueryResult<Self> {
        config.validate()?;
        let pool = Self::pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| {
                QueryError::GeneralServerError(format!("Failed to connect to database: {}", e))
            })?;
        Ok(Self::from_pool(pool, config.transaction_timeout))
    }

    /// Create the pool without connecting; connections open on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> QueryResult<Self> {
        config.validate()?;
        let pool = Self::pool_options(config)
            .connect_lazy(&config.url)
            .map_err(|e| {
                QueryError::GeneralServerError(format!("Invalid database URL: {}", e))
            })?;
        Ok(Self::from_pool(pool, config.transaction_timeout))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool, transaction_timeout: Duration) -> Self {
        Self {
            pool,
            transaction_timeout,
            counters: Arc::new(CheckoutCounters::default()),
            next_batch: Arc::new(AtomicU64::new(1)),
        }
    }

    fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
    }

    pub fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            checked_out: self.counters.checked_out.load(Ordering::SeqCst),
            released_total: self.counters.released_total.load(Ordering::SeqCst),
        }
    }

    /// Close the pool, waiting for checked-out connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run_batch(&self, batch_no: u64, batch: &Batch) -> QueryResult<TransactionResult> {
        log::debug!(
            "Batch {}: {} ({} statements)",
            batch_no,
            TransactionPhase::Idle,
            batch.len()
        );

        let conn = self.pool.acquire().await.map_err(|e| {
            log::warn!("Batch {}: failed to acquire connection: {}", batch_no, e);
            QueryError::GeneralServerError(format!("Database unavailable: {}", e))
        })?;
        let mut checkout = Checkout::new(conn, self.counters.clone(), batch_no);
        log::debug!("Batch {}: {}", batch_no, TransactionPhase::ConnectionAcquired);

        let mut tx = checkout.begin().await.map_err(|e| {
            log::warn!("Batch {}: failed to begin transaction: {}", batch_no, e);
            QueryError::GeneralServerError(format!("Failed to begin transaction: {}", e))
        })?;
        log::debug!("Batch {}: {}", batch_no, TransactionPhase::TransactionOpen);

        let mut results = TransactionResult::new();
        log::debug!("Batch {}: {}", batch_no, TransactionPhase::StatementsRunning);
        for statement in batch.statements() {
            let outcome = match run_statement(&mut *tx, statement).await {
                Ok(result) => enforce_match(statement, &result).map(|_| result),
                Err(error) => Err(error),
            };
            match outcome {
                Ok(result) => results.insert(statement.id(), result),
                Err(error) => {
                    log::warn!(
                        "Batch {}: statement {} ({}) failed: {}",
                        batch_no,
                        statement.id(),
                        statement.verb(),
                        error
                    );
                    if let Err(e) = tx.rollback().await {
                        log::warn!("Batch {}: rollback failed: {}", batch_no, e);
                    }
                    log::debug!("Batch {}: {}", batch_no, TransactionPhase::RolledBack);
                    return Err(error);
                }
            }
        }

        // A failed commit leaves the transaction open; dropping it queues the rollback
        // before the connection is handed back.
        tx.commit().await.map_err(|e| {
            log::warn!(
                "Batch {}: commit failed, {}: {}",
                batch_no,
                TransactionPhase::RolledBack,
                e
            );
            QueryError::UnexpectedSqlResult(format!("Failed to commit transaction: {}", e))
        })?;
        log::debug!("Batch {}: {}", batch_no, TransactionPhase::Committed);

        Ok(results)
    }
}

#[async_trait]
impl TransactionExecutor for RelationalExecutor {
    async fn execute_transactions(&self, batch: &Batch) -> QueryResult<TransactionResult> {
        if batch.is_empty() {
            return Ok(TransactionResult::new());
        }

        let batch_no = self.next_batch.fetch_add(1, Ordering::Relaxed);
        let run = self.run_batch(batch_no, batch);
        match tokio::time::timeout(self.transaction_timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Batch {}: timed out after {:?}, {}",
                    batch_no,
                    self.transaction_timeout,
                    TransactionPhase::RolledBack
                );
                Err(QueryError::GeneralServerError(format!(
                    "Transaction timed out after {:?}",
                    self.transaction_timeout
                )))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}

async fn run_statement(
    conn: &mut MySqlConnection,
    statement: &Statement,
) -> QueryResult<StatementResult> {
    match statement.verb() {
        Verb::Select => {
            let rows = bind_params(sqlx::query(statement.command()), statement.parameters())
                .fetch_all(&mut *conn)
                .await?;
            let rows = rows.iter().map(row_to_json).collect::<QueryResult<Vec<_>>>()?;
            Ok(StatementResult::Rows(rows))
        }
        Verb::Update => match statement.target() {
            Some(target) => update_with_snapshot(conn, statement, target).await,
            None => {
                let done = bind_params(sqlx::query(statement.command()), statement.parameters())
                    .execute(&mut *conn)
                    .await?;
                Ok(StatementResult::Ok(OkPacket::counted(
                    done.rows_affected(),
                    done.rows_affected(),
                )))
            }
        },
        Verb::Insert | Verb::Delete => {
            let done = bind_params(sqlx::query(statement.command()), statement.parameters())
                .execute(&mut *conn)
                .await?;
            Ok(StatementResult::Ok(OkPacket {
                affected_rows: done.rows_affected(),
                changed_rows: 0,
                insert_id: done.last_insert_id(),
            }))
        }
    }
}

/// Run an UPDATE and report matched and changed rows separately
///
/// The addressed rows are locked and read before the write and re-read by id after it;
/// a row counts as changed only when some column differs.
async fn update_with_snapshot(
    conn: &mut MySqlConnection,
    statement: &Statement,
    target: &RowTarget,
) -> QueryResult<StatementResult> {
    let table = &target.table;
    let (clause, key) = target.key.write_filter(table)?;

    let lock_sql = format!("SELECT * FROM {} WHERE {} FOR UPDATE", table.name, clause);
    let before = bind_params(sqlx::query(&lock_sql), std::slice::from_ref(&key))
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(row_to_json)
        .collect::<QueryResult<Vec<Row>>>()?;

    let done = bind_params(sqlx::query(statement.command()), statement.parameters())
        .execute(&mut *conn)
        .await?;

    let ids: Vec<Param> = before
        .iter()
        .filter_map(|row| row.get(table.id_column).and_then(Value::as_i64))
        .map(Param::Int)
        .collect();

    let mut changed = 0u64;
    if !ids.is_empty() {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let reread_sql = format!(
            "SELECT * FROM {} WHERE {} IN ({})",
            table.name, table.id_column, placeholders
        );
        let after = bind_params(sqlx::query(&reread_sql), &ids)
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(row_to_json)
            .collect::<QueryResult<Vec<Row>>>()?;

        for old in &before {
            let id = old.get(table.id_column);
            let new = after.iter().find(|row| row.get(table.id_column) == id);
            if new != Some(old) {
                changed += 1;
            }
        }
    }

    Ok(StatementResult::Ok(OkPacket {
        affected_rows: before.len() as u64,
        changed_rows: changed,
        insert_id: done.last_insert_id(),
    }))
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Param],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Param::Null => query.bind(None::<String>),
            Param::Bool(v) => query.bind(*v),
            Param::Int(v) => query.bind(*v),
            Param::Float(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.as_str()),
            Param::Date(v) => query.bind(*v),
            Param::DateTime(v) => query.bind(*v),
        };
    }
    query
}

fn row_to_json(row: &MySqlRow) -> QueryResult<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> QueryResult<Value> {
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(idx)?.map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(idx)?.map(Value::from),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::from(f64::from(v))),
        "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(serde_json::to_value)
            .transpose()?,
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(serde_json::to_value)
            .transpose()?,
        "NULL" => None,
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}
