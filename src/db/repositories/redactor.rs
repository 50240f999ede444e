//! Redactor repository
//!
//! - `RedactorRepository` trait defining the interface for redactor accounts
//! - `SqlxRedactorRepository` implementing the trait for SQLite and MySQL
//!
//! Redactors are listed by username, except in the admin listing which
//! orders by experience first.

use crate::config::DatabaseDriver;
use crate::db::{contains_pattern, DynDatabasePool};
use crate::models::{ListParams, Newspaper, Redactor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::newspaper::{row_to_newspaper_mysql, row_to_newspaper_sqlite};

/// Redactor repository trait
#[async_trait]
pub trait RedactorRepository: Send + Sync {
    /// Create a new redactor
    async fn create(&self, redactor: &Redactor) -> Result<Redactor>;

    /// Get redactor by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Redactor>>;

    /// Get redactor by exact username
    async fn get_by_username(&self, username: &str) -> Result<Option<Redactor>>;

    /// Redactors with the given IDs, ordered by username. Unknown IDs are skipped.
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Redactor>>;

    /// List all redactors
    async fn list(&self) -> Result<Vec<Redactor>>;

    /// Redactors whose username contains `needle`, ignoring case. Empty matches all.
    async fn filter_by_substring(&self, needle: &str) -> Result<Vec<Redactor>>;

    /// Number of redactors matching `needle`
    async fn count_matching(&self, needle: &str) -> Result<i64>;

    /// One page of the redactors matching `needle`
    async fn find_page(&self, needle: &str, params: &ListParams) -> Result<Vec<Redactor>>;

    /// Save profile and permission fields
    async fn update(&self, redactor: &Redactor) -> Result<Redactor>;

    /// Record a successful login
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Delete a redactor; returns false when no such redactor exists
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Total number of redactors
    async fn count(&self) -> Result<i64>;

    /// Newspapers the redactor publishes, ordered by title
    async fn newspapers_of(&self, redactor_id: i64) -> Result<Vec<Newspaper>>;

    /// Admin listing: search on years of experience, ordered by experience
    /// then username
    async fn list_for_admin(&self, query: &str) -> Result<Vec<Redactor>>;
}

/// SQLx-based redactor repository implementation
pub struct SqlxRedactorRepository {
    pool: DynDatabasePool,
}

impl SqlxRedactorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RedactorRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Column list for `redactors r`, shared with the newspaper repository.
pub(super) const REDACTOR_COLUMNS: &str = "r.id, r.username, r.password_hash, r.first_name, \
     r.last_name, r.email, r.years_of_experience, r.is_staff, r.is_superuser, r.is_active, \
     r.date_joined, r.last_login";

#[async_trait]
impl RedactorRepository for SqlxRedactorRepository {
    async fn create(&self, redactor: &Redactor) -> Result<Redactor> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_redactor_sqlite(self.pool.sqlite()?, redactor).await,
            DatabaseDriver::Mysql => create_redactor_mysql(self.pool.mysql()?, redactor).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Redactor>> {
        let sql = format!("SELECT {} FROM redactors r WHERE r.id = ?", REDACTOR_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get redactor by ID")?;
                row.map(|row| row_to_redactor_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get redactor by ID")?;
                row.map(|row| row_to_redactor_mysql(&row)).transpose()
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Redactor>> {
        let sql = format!("SELECT {} FROM redactors r WHERE r.username = ?", REDACTOR_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(username)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get redactor by username")?;
                row.map(|row| row_to_redactor_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(username)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get redactor by username")?;
                row.map(|row| row_to_redactor_mysql(&row)).transpose()
            }
        }
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Redactor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_many_sqlite(self.pool.sqlite()?, ids).await,
            DatabaseDriver::Mysql => get_many_mysql(self.pool.mysql()?, ids).await,
        }
    }

    async fn list(&self) -> Result<Vec<Redactor>> {
        self.filter_by_substring("").await
    }

    async fn filter_by_substring(&self, needle: &str) -> Result<Vec<Redactor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_redactors_sqlite(self.pool.sqlite()?, needle, None).await,
            DatabaseDriver::Mysql => find_redactors_mysql(self.pool.mysql()?, needle, None).await,
        }
    }

    async fn count_matching(&self, needle: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let count: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM redactors WHERE LOWER(username) LIKE ? ESCAPE '\\'",
                )
                .bind(contains_pattern(needle))
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count redactors")?;
                Ok(count)
            }
            DatabaseDriver::Mysql => {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM redactors WHERE LOWER(username) LIKE ?")
                        .bind(contains_pattern(needle))
                        .fetch_one(self.pool.mysql()?)
                        .await
                        .context("Failed to count redactors")?;
                Ok(count)
            }
        }
    }

    async fn find_page(&self, needle: &str, params: &ListParams) -> Result<Vec<Redactor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_redactors_sqlite(self.pool.sqlite()?, needle, Some(params)).await
            }
            DatabaseDriver::Mysql => {
                find_redactors_mysql(self.pool.mysql()?, needle, Some(params)).await
            }
        }
    }

    async fn update(&self, redactor: &Redactor) -> Result<Redactor> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_redactor_sqlite(self.pool.sqlite()?, redactor).await?,
            DatabaseDriver::Mysql => update_redactor_mysql(self.pool.mysql()?, redactor).await?,
        }
        Ok(redactor.clone())
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let sql = "UPDATE redactors SET last_login = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to record login")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to record login")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Sessions and publisher links cascade
        let sql = "DELETE FROM redactors WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete redactor")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete redactor")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        self.count_matching("").await
    }

    async fn newspapers_of(&self, redactor_id: i64) -> Result<Vec<Newspaper>> {
        let sql = r#"
            SELECT n.id, n.title, n.content, n.published_date, n.topic_id,
                   n.created_at, n.updated_at
            FROM newspapers n
            JOIN newspaper_publishers p ON p.newspaper_id = n.id
            WHERE p.redactor_id = ?
            ORDER BY n.title, n.id
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(redactor_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to load redactor newspapers")?;
                rows.iter().map(row_to_newspaper_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(redactor_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to load redactor newspapers")?;
                rows.iter().map(row_to_newspaper_mysql).collect()
            }
        }
    }

    async fn list_for_admin(&self, query: &str) -> Result<Vec<Redactor>> {
        let pattern = contains_pattern(query.trim());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let sql = format!(
                    "SELECT {} FROM redactors r \
                     WHERE CAST(r.years_of_experience AS TEXT) LIKE ? ESCAPE '\\' \
                     ORDER BY r.years_of_experience, r.username",
                    REDACTOR_COLUMNS
                );
                let rows = sqlx::query(&sql)
                    .bind(pattern)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list redactors for admin")?;
                rows.iter().map(row_to_redactor_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let sql = format!(
                    "SELECT {} FROM redactors r \
                     WHERE CAST(r.years_of_experience AS CHAR) LIKE ? \
                     ORDER BY r.years_of_experience, r.username",
                    REDACTOR_COLUMNS
                );
                let rows = sqlx::query(&sql)
                    .bind(pattern)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list redactors for admin")?;
                rows.iter().map(row_to_redactor_mysql).collect()
            }
        }
    }
}

const UPDATE_REDACTOR: &str = r#"
    UPDATE redactors
    SET username = ?, first_name = ?, last_name = ?, email = ?,
        years_of_experience = ?, is_staff = ?, is_superuser = ?, is_active = ?
    WHERE id = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_redactor_sqlite(pool: &SqlitePool, redactor: &Redactor) -> Result<Redactor> {
    let result = sqlx::query(
        r#"
        INSERT INTO redactors (username, password_hash, first_name, last_name, email,
                               years_of_experience, is_staff, is_superuser, is_active, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&redactor.username)
    .bind(&redactor.password_hash)
    .bind(&redactor.first_name)
    .bind(&redactor.last_name)
    .bind(&redactor.email)
    .bind(redactor.years_of_experience)
    .bind(redactor.is_staff)
    .bind(redactor.is_superuser)
    .bind(redactor.is_active)
    .bind(redactor.date_joined)
    .execute(pool)
    .await
    .context("Failed to create redactor")?;

    Ok(Redactor {
        id: result.last_insert_rowid(),
        ..redactor.clone()
    })
}

async fn update_redactor_sqlite(pool: &SqlitePool, redactor: &Redactor) -> Result<()> {
    sqlx::query(UPDATE_REDACTOR)
        .bind(&redactor.username)
        .bind(&redactor.first_name)
        .bind(&redactor.last_name)
        .bind(&redactor.email)
        .bind(redactor.years_of_experience)
        .bind(redactor.is_staff)
        .bind(redactor.is_superuser)
        .bind(redactor.is_active)
        .bind(redactor.id)
        .execute(pool)
        .await
        .context("Failed to update redactor")?;
    Ok(())
}

async fn get_many_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Redactor>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM redactors r WHERE r.id IN ({}) ORDER BY r.username",
        REDACTOR_COLUMNS, placeholders
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load redactors")?;
    rows.iter().map(row_to_redactor_sqlite).collect()
}

async fn find_redactors_sqlite(
    pool: &SqlitePool,
    needle: &str,
    page: Option<&ListParams>,
) -> Result<Vec<Redactor>> {
    let mut sql = format!(
        "SELECT {} FROM redactors r WHERE LOWER(r.username) LIKE ? ESCAPE '\\' ORDER BY r.username",
        REDACTOR_COLUMNS
    );
    if page.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query(&sql).bind(contains_pattern(needle));
    if let Some(params) = page {
        query = query.bind(params.limit()).bind(params.offset());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list redactors")?;
    rows.iter().map(row_to_redactor_sqlite).collect()
}

pub(super) fn row_to_redactor_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Redactor> {
    Ok(Redactor {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        years_of_experience: row.try_get("years_of_experience")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
        last_login: row.try_get("last_login")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_redactor_mysql(pool: &MySqlPool, redactor: &Redactor) -> Result<Redactor> {
    let result = sqlx::query(
        r#"
        INSERT INTO redactors (username, password_hash, first_name, last_name, email,
                               years_of_experience, is_staff, is_superuser, is_active, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&redactor.username)
    .bind(&redactor.password_hash)
    .bind(&redactor.first_name)
    .bind(&redactor.last_name)
    .bind(&redactor.email)
    .bind(redactor.years_of_experience)
    .bind(redactor.is_staff)
    .bind(redactor.is_superuser)
    .bind(redactor.is_active)
    .bind(redactor.date_joined)
    .execute(pool)
    .await
    .context("Failed to create redactor")?;

    Ok(Redactor {
        id: result.last_insert_id() as i64,
        ..redactor.clone()
    })
}

async fn update_redactor_mysql(pool: &MySqlPool, redactor: &Redactor) -> Result<()> {
    sqlx::query(UPDATE_REDACTOR)
        .bind(&redactor.username)
        .bind(&redactor.first_name)
        .bind(&redactor.last_name)
        .bind(&redactor.email)
        .bind(redactor.years_of_experience)
        .bind(redactor.is_staff)
        .bind(redactor.is_superuser)
        .bind(redactor.is_active)
        .bind(redactor.id)
        .execute(pool)
        .await
        .context("Failed to update redactor")?;
    Ok(())
}

async fn get_many_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Redactor>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM redactors r WHERE r.id IN ({}) ORDER BY r.username",
        REDACTOR_COLUMNS, placeholders
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load redactors")?;
    rows.iter().map(row_to_redactor_mysql).collect()
}

async fn find_redactors_mysql(
    pool: &MySqlPool,
    needle: &str,
    page: Option<&ListParams>,
) -> Result<Vec<Redactor>> {
    let mut sql = format!(
        "SELECT {} FROM redactors r WHERE LOWER(r.username) LIKE ? ORDER BY r.username",
        REDACTOR_COLUMNS
    );
    if page.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query(&sql).bind(contains_pattern(needle));
    if let Some(params) = page {
        query = query.bind(params.limit()).bind(params.offset());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list redactors")?;
    rows.iter().map(row_to_redactor_mysql).collect()
}

pub(super) fn row_to_redactor_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Redactor> {
    Ok(Redactor {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        years_of_experience: row.try_get("years_of_experience")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
        last_login: row.try_get("last_login")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxRedactorRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxRedactorRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create(repo: &SqlxRedactorRepository, username: &str, years: i32) -> Redactor {
        let mut redactor = Redactor::new(username, "hash");
        redactor.years_of_experience = years;
        repo.create(&redactor).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_experience() {
        let (_, repo) = setup_test_repo().await;
        let created = create(&repo, "writer", 5).await;

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.years_of_experience, 5);
        assert_eq!(fetched.password_hash, "hash");
        assert!(fetched.is_active);
        assert!(!fetched.is_staff);

        let by_name = repo.get_by_username("writer").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (_, repo) = setup_test_repo().await;
        create(&repo, "writer", 1).await;

        let err = repo.create(&Redactor::new("writer", "hash")).await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_filter_and_pages_by_username() {
        let (_, repo) = setup_test_repo().await;
        for name in ["zoe", "Adam", "bobby", "bob"] {
            create(&repo, name, 1).await;
        }

        let bobs = repo.filter_by_substring("BOB").await.unwrap();
        let names: Vec<&str> = bobs.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "bobby"]);

        assert_eq!(repo.count_matching("").await.unwrap(), 4);
        let page = repo.find_page("", &ListParams::new(2, 3)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "zoe");
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let (_, repo) = setup_test_repo().await;
        let a = create(&repo, "a", 1).await;
        let b = create(&repo, "b", 1).await;

        let found = repo.get_many(&[b.id, 999, a.id]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].username, "a");
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_last_login() {
        let (_, repo) = setup_test_repo().await;
        let mut redactor = create(&repo, "writer", 1).await;

        redactor.first_name = "Ann".to_string();
        redactor.years_of_experience = 12;
        redactor.is_staff = true;
        repo.update(&redactor).await.unwrap();

        let now = Utc::now();
        repo.update_last_login(redactor.id, now).await.unwrap();

        let fetched = repo.get_by_id(redactor.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ann");
        assert_eq!(fetched.years_of_experience, 12);
        assert!(fetched.is_staff);
        assert!(fetched.last_login.is_some());
    }

    #[tokio::test]
    async fn test_delete_redactor() {
        let (_, repo) = setup_test_repo().await;
        let redactor = create(&repo, "writer", 1).await;

        assert!(repo.delete(redactor.id).await.unwrap());
        assert!(!repo.delete(redactor.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_newspapers_of() {
        let (pool, repo) = setup_test_repo().await;
        let redactor = create(&repo, "writer", 1).await;
        let sqlite = pool.sqlite().unwrap();

        for title in ["Zed", "Alpha"] {
            let id = sqlx::query(
                "INSERT INTO newspapers (title, content, published_date) VALUES (?, 'x', '2024-01-01')",
            )
            .bind(title)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
            sqlx::query("INSERT INTO newspaper_publishers (newspaper_id, redactor_id) VALUES (?, ?)")
                .bind(id)
                .bind(redactor.id)
                .execute(sqlite)
                .await
                .unwrap();
        }

        let papers = repo.newspapers_of(redactor.id).await.unwrap();
        let titles: Vec<&str> = papers.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Zed"]);
    }

    #[tokio::test]
    async fn test_list_for_admin_orders_by_experience() {
        let (_, repo) = setup_test_repo().await;
        create(&repo, "carol", 10).await;
        create(&repo, "bob", 2).await;
        create(&repo, "alice", 2).await;

        let all = repo.list_for_admin("").await.unwrap();
        let names: Vec<&str> = all.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);

        let tens = repo.list_for_admin("10").await.unwrap();
        assert_eq!(tens.len(), 1);
        assert_eq!(tens[0].username, "carol");
    }
}
