//! Live MySQL fixture
//!
//! Connects to `TAPLEDGER_TEST_DATABASE_URL`, applies `sql/schema.sql` and empties
//! every table. Live tests share one database, so they run `#[serial]`. Tests skip themselves when the variable is unset.

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tapledger::{PosStore, RelationalExecutor};

pub const ENV_TEST_DATABASE_URL: &str = "TAPLEDGER_TEST_DATABASE_URL";

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Children before parents, so foreign keys never block the cleanup
const TABLES: &[&str] = &[
    "sessions",
    "google_logins",
    "logins",
    "flow_readings",
    "flow_stands",
    "sales",
    "hot_keys",
    "events",
    "event_types",
    "products",
    "customers",
    "categories",
];

pub struct LiveFixture {
    pub executor: Arc<RelationalExecutor>,
    pub store: PosStore,
    pub pool_size: u32,
}

impl LiveFixture {
    /// `None` when no test database is configured
    pub async fn connect(pool_size: u32) -> Option<Self> {
        super::init_logger();
        let url = match std::env::var(ENV_TEST_DATABASE_URL) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                eprintln!("{} not set, skipping live database test", ENV_TEST_DATABASE_URL);
                return None;
            }
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await
            .expect("Failed to connect to test database");

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .expect("Failed to apply schema");
        for table in TABLES {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&pool)
                .await
                .expect("Failed to empty table");
        }

        let executor = Arc::new(RelationalExecutor::from_pool(pool, Duration::from_secs(10)));
        let store = PosStore::new(executor.clone());
        Some(Self {
            executor,
            store,
            pool_size,
        })
    }
}
