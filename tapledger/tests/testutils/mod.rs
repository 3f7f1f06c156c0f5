//! Test utilities for Tapledger integration tests
//!
//! Two fixture types available:
//! - StoreFixture: store backed by the simulated executor
//! - LiveFixture: store backed by a real MySQL server, only when
//!   `TAPLEDGER_TEST_DATABASE_URL` is set

#![allow(dead_code)]

pub mod live_fixture;
pub mod store_fixture;

/// Route `log` output through the test harness
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
