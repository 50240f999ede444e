//! Session repository
//!
//! - `SessionRepository` trait defining the interface for login sessions
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions of a redactor
    async fn delete_by_redactor(&self, redactor_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;

    /// Add one to the session's visit counter and return the new value
    async fn increment_visits(&self, id: &str) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_session_sqlite(self.pool.sqlite()?, session).await,
            DatabaseDriver::Mysql => create_session_mysql(self.pool.mysql()?, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_session_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_session_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn delete_by_redactor(&self, redactor_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sessions_by_redactor_sqlite(self.pool.sqlite()?, redactor_id).await
            }
            DatabaseDriver::Mysql => {
                delete_sessions_by_redactor_mysql(self.pool.mysql()?, redactor_id).await
            }
        }
    }

    async fn delete_expired(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_expired_sessions_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => delete_expired_sessions_mysql(self.pool.mysql()?).await,
        }
    }

    async fn increment_visits(&self, id: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => increment_visits_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => increment_visits_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, redactor_id, visits, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.redactor_id)
    .bind(session.visits)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, redactor_id, visits, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    row.map(|row| row_to_session_sqlite(&row)).transpose()
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_sessions_by_redactor_sqlite(pool: &SqlitePool, redactor_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE redactor_id = ?")
        .bind(redactor_id)
        .execute(pool)
        .await
        .context("Failed to delete sessions by redactor")?;

    Ok(())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

async fn increment_visits_sqlite(pool: &SqlitePool, id: &str) -> Result<i64> {
    let visits: Option<i64> =
        sqlx::query_scalar("UPDATE sessions SET visits = visits + 1 WHERE id = ? RETURNING visits")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to count session visit")?;

    Ok(visits.unwrap_or(0))
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        redactor_id: row.try_get("redactor_id")?,
        visits: row.try_get("visits")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, redactor_id, visits, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.redactor_id)
    .bind(session.visits)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, redactor_id, visits, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    row.map(|row| row_to_session_mysql(&row)).transpose()
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_sessions_by_redactor_mysql(pool: &MySqlPool, redactor_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE redactor_id = ?")
        .bind(redactor_id)
        .execute(pool)
        .await
        .context("Failed to delete sessions by redactor")?;

    Ok(())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

async fn increment_visits_mysql(pool: &MySqlPool, id: &str) -> Result<i64> {
    // MySQL has no UPDATE ... RETURNING
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE sessions SET visits = visits + 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to count session visit")?;

    let visits: Option<i64> = sqlx::query_scalar("SELECT visits FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to read session visits")?;

    tx.commit().await.context("Failed to commit visit count")?;
    Ok(visits.unwrap_or(0))
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        redactor_id: row.try_get("redactor_id")?,
        visits: row.try_get("visits")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_redactor(pool: &DynDatabasePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO redactors (username, password_hash) VALUES (?, 'hash')")
            .bind(username)
            .execute(pool.sqlite().unwrap())
            .await
            .expect("Failed to create redactor")
            .last_insert_rowid()
    }

    fn create_test_session(redactor_id: i64, expires_in_days: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            redactor_id,
            visits: 0,
            expires_at: now + Duration::days(expires_in_days),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (pool, repo) = setup_test_repo().await;
        let redactor_id = create_test_redactor(&pool, "alice").await;

        let session = repo.create(&create_test_session(redactor_id, 7)).await.unwrap();
        let fetched = repo.get_by_id(&session.id).await.unwrap().unwrap();

        assert_eq!(fetched.redactor_id, redactor_id);
        assert_eq!(fetched.visits, 0);
        assert!(!fetched.is_expired());
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_visits() {
        let (pool, repo) = setup_test_repo().await;
        let redactor_id = create_test_redactor(&pool, "alice").await;
        let session = repo.create(&create_test_session(redactor_id, 7)).await.unwrap();

        assert_eq!(repo.increment_visits(&session.id).await.unwrap(), 1);
        assert_eq!(repo.increment_visits(&session.id).await.unwrap(), 2);
        assert_eq!(repo.increment_visits("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_sessions() {
        let (pool, repo) = setup_test_repo().await;
        let redactor_id = create_test_redactor(&pool, "alice").await;
        let live = repo.create(&create_test_session(redactor_id, 7)).await.unwrap();
        let stale = repo.create(&create_test_session(redactor_id, -1)).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_sessions() {
        let (pool, repo) = setup_test_repo().await;
        let alice = create_test_redactor(&pool, "alice").await;
        let bob = create_test_redactor(&pool, "bob").await;
        let a1 = repo.create(&create_test_session(alice, 7)).await.unwrap();
        let a2 = repo.create(&create_test_session(alice, 7)).await.unwrap();
        let b1 = repo.create(&create_test_session(bob, 7)).await.unwrap();

        repo.delete(&a1.id).await.unwrap();
        assert!(repo.get_by_id(&a1.id).await.unwrap().is_none());

        repo.delete_by_redactor(alice).await.unwrap();
        assert!(repo.get_by_id(&a2.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&b1.id).await.unwrap().is_some());
    }
}
