// Copyright (c) 2024-2025 Tapledger Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Session authentication
//!
//! Sessions are bound to a password login or a Google login and expire after a fixed
//! time to live. `authenticate_user` never fails: any store error is logged and
//! treated as "not authenticated".

use crate::db::{Batch, Statement, TransactionExecutor};
use crate::error::{QueryError, QueryResult};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of the current time in Unix seconds
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_secs: i64) -> Self {
        Self {
            now: AtomicI64::new(now_secs),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs() as i64, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub login_id: Option<i64>,
    pub google_login_id: Option<i64>,
    pub expires: i64,
}

/// Which login table a session is registered against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginKind {
    Password,
    Google,
}

impl LoginKind {
    fn insert_sql(&self) -> &'static str {
        match self {
            LoginKind::Password => {
                "INSERT INTO sessions (session_id, login_id, expires) \
                 SELECT ?, id, ? FROM logins WHERE email = ?"
            }
            LoginKind::Google => {
                "INSERT INTO sessions (session_id, google_login_id, expires) \
                 SELECT ?, id, ? FROM google_logins WHERE email = ?"
            }
        }
    }
}

pub struct AuthenticationQueries {
    executor: Arc<dyn TransactionExecutor>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AuthenticationQueries {
    pub fn new(executor: Arc<dyn TransactionExecutor>, session_ttl: Duration) -> Self {
        Self::with_clock(executor, session_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        executor: Arc<dyn TransactionExecutor>,
        session_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            executor,
            clock,
            session_ttl,
        }
    }

    /// Whether `session` names a live session
    ///
    /// An expired session is deleted on sight.
    pub async fn authenticate_user(&self, session: &str) -> bool {
        match self.check_session(session).await {
            Ok(valid) => valid,
            Err(err) => {
                log::warn!("Session check failed: {}", err);
                false
            }
        }
    }

    async fn check_session(&self, session: &str) -> QueryResult<bool> {
        let sessions: Vec<Session> = protocol::select_all(
            self.executor.as_ref(),
            Statement::select(
                "SELECT session_id, login_id, google_login_id, expires \
                 FROM sessions WHERE session_id = ?",
                vec![session.into()],
            ),
        )
        .await?;

        let Some(found) = sessions.first() else {
            return Ok(false);
        };
        if found.expires > self.clock.now_secs() {
            return Ok(true);
        }

        log::debug!("Session expired at {}, removing it", found.expires);
        self.delete_session(session).await?;
        Ok(false)
    }

    /// Bind `session` to the password login with `email`
    ///
    /// Resolves `false` when no such login exists or the session id is taken.
    pub async fn register_session(&self, session: &str, email: &str) -> QueryResult<bool> {
        self.register(LoginKind::Password, session, email).await
    }

    /// Bind `session` to the Google login with `email`
    pub async fn register_google_session(&self, session: &str, email: &str) -> QueryResult<bool> {
        self.register(LoginKind::Google, session, email).await
    }

    async fn register(&self, kind: LoginKind, session: &str, email: &str) -> QueryResult<bool> {
        let expires = self.clock.now_secs() + self.session_ttl.as_secs() as i64;
        let insert = Statement::insert(
            kind.insert_sql(),
            vec![session.into(), expires.into(), email.into()],
        );

        match self.executor.execute_transactions(&Batch::from(insert)).await {
            Ok(result) => Ok(result.ok_packet(1)?.affected_rows == 1),
            Err(QueryError::ItemAlreadyExists(message)) => {
                log::debug!("Session not registered: {}", message);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// End `session`; `false` when it did not exist
    pub async fn logout(&self, session: &str) -> QueryResult<bool> {
        self.delete_session(session).await
    }

    /// Remove every expired session, returning how many were removed
    pub async fn purge_expired_sessions(&self) -> QueryResult<u64> {
        let delete = Statement::delete(
            "DELETE FROM sessions WHERE expires <= ?",
            vec![self.clock.now_secs().into()],
        );
        let result = self.executor.execute_transactions(&Batch::from(delete)).await?;
        let purged = result.ok_packet(1)?.affected_rows;
        if purged > 0 {
            log::debug!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    async fn delete_session(&self, session: &str) -> QueryResult<bool> {
        let delete = Statement::delete(
            "DELETE FROM sessions WHERE session_id = ?",
            vec![session.into()],
        );
        let result = self.executor.execute_transactions(&Batch::from(delete)).await?;
        Ok(result.ok_packet(1)?.affected_rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimulatedExecutor;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(3600);

    fn setup(now: i64) -> (Arc<SimulatedExecutor>, Arc<FixedClock>, AuthenticationQueries) {
        let executor = Arc::new(SimulatedExecutor::with_rows(vec![
            json!({"session_id": "live-session", "login_id": 1, "google_login_id": null, "expires": 5000}),
            json!({"session_id": "old-session", "login_id": 1, "google_login_id": null, "expires": 1000}),
        ]));
        let clock = Arc::new(FixedClock::new(now));
        let queries = AuthenticationQueries::with_clock(executor.clone(), TTL, clock.clone());
        (executor, clock, queries)
    }

    #[tokio::test]
    async fn test_live_session_authenticates() {
        let (_, _, queries) = setup(2000);
        assert!(queries.authenticate_user("live-session").await);
        assert!(!queries.authenticate_user("unknown").await);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let (executor, _, queries) = setup(2000);
        assert!(!queries.authenticate_user("old-session").await);
        assert_eq!(executor.row_count(), 1);
        assert_eq!(executor.rows()[0]["session_id"], "live-session");
    }

    #[tokio::test]
    async fn test_sessions_expire_as_time_passes() {
        let (_, clock, queries) = setup(2000);
        assert!(queries.authenticate_user("live-session").await);
        clock.advance(Duration::from_secs(3000));
        assert!(!queries.authenticate_user("live-session").await);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_authenticated() {
        let (executor, _, queries) = setup(2000);
        executor.set_reachable(false);
        assert!(!queries.authenticate_user("live-session").await);
    }

    #[tokio::test]
    async fn test_register_session() {
        let (executor, _, queries) = setup(2000);
        assert!(queries
            .register_session("new-session", "ann@example.com")
            .await
            .unwrap());

        executor.set_insert_duplicate(true);
        assert!(!queries
            .register_google_session("new-session", "ann@example.com")
            .await
            .unwrap());

        executor.set_insert_duplicate(false);
        executor.set_insert_fails(true);
        let err = queries
            .register_session("other", "ann@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn test_purge_reports_removed_count() {
        let (executor, _, queries) = setup(2000);
        executor.set_selector(crate::db::simulated::SELECT_NOT_FOUND);
        assert_eq!(queries.purge_expired_sessions().await.unwrap(), 0);

        executor.set_reachable(false);
        assert!(queries.purge_expired_sessions().await.is_err());
    }

    #[tokio::test]
    async fn test_logout() {
        let (executor, _, queries) = setup(2000);
        assert!(queries.logout("live-session").await.unwrap());
        assert_eq!(executor.row_count(), 1);
    }
}
