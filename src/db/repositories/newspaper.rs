//! Newspaper repository
//!
//! - `NewspaperRepository` trait defining the interface for newspaper data access
//! - `SqlxNewspaperRepository` implementing the trait for SQLite and MySQL
//!
//! Publishers live in the `newspaper_publishers` join table. Creating or
//! updating a newspaper writes the row and its publisher set in one
//! transaction.

use crate::config::DatabaseDriver;
use crate::db::{contains_pattern, DynDatabasePool};
use crate::models::{ListParams, Newspaper, NewspaperInput, NewspaperWithTopic, Redactor, Topic};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

use super::redactor::{row_to_redactor_mysql, row_to_redactor_sqlite, REDACTOR_COLUMNS};

/// Newspaper repository trait
#[async_trait]
pub trait NewspaperRepository: Send + Sync {
    /// Create a newspaper together with its publishers
    async fn create(&self, input: &NewspaperInput) -> Result<Newspaper>;

    /// Get newspaper by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Newspaper>>;

    /// All newspapers with their topics, ordered by title
    async fn list(&self) -> Result<Vec<NewspaperWithTopic>>;

    /// Newspapers whose topic name contains `needle`, ignoring case.
    /// Empty matches all, including newspapers without a topic.
    async fn filter_by_topic_name(&self, needle: &str) -> Result<Vec<NewspaperWithTopic>>;

    /// Number of newspapers matching `needle`
    async fn count_matching(&self, needle: &str) -> Result<i64>;

    /// One page of the newspapers matching `needle`
    async fn find_page(&self, needle: &str, params: &ListParams)
        -> Result<Vec<NewspaperWithTopic>>;

    /// Replace a newspaper's fields and publisher set
    async fn update(&self, id: i64, input: &NewspaperInput) -> Result<Newspaper>;

    /// Delete a newspaper; returns false when no such newspaper exists
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Total number of newspapers
    async fn count(&self) -> Result<i64>;

    /// Publishers of a newspaper, ordered by username
    async fn publishers_of(&self, newspaper_id: i64) -> Result<Vec<Redactor>>;

    /// Replace the publisher set of a newspaper
    async fn set_publishers(&self, newspaper_id: i64, redactor_ids: &[i64]) -> Result<()>;

    /// Admin listing: title search, optional topic filter, ordered by
    /// publication date
    async fn list_for_admin(
        &self,
        title_query: &str,
        topic_id: Option<i64>,
    ) -> Result<Vec<NewspaperWithTopic>>;
}

/// SQLx-based newspaper repository implementation
pub struct SqlxNewspaperRepository {
    pool: DynDatabasePool,
}

impl SqlxNewspaperRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewspaperRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Listing filter shared by the public and admin queries
#[derive(Debug, Clone, Copy)]
enum Filter<'a> {
    /// Case-insensitive substring of the topic name; empty = no filter
    TopicName(&'a str),
    /// Case-insensitive substring of the title, optionally one topic only
    Admin {
        title: &'a str,
        topic_id: Option<i64>,
    },
}

impl Filter<'_> {
    fn where_clause(&self, escape: &str) -> String {
        match self {
            Filter::TopicName("") => String::new(),
            Filter::TopicName(_) => format!(" WHERE LOWER(t.name) LIKE ?{}", escape),
            Filter::Admin { topic_id, .. } => {
                let mut clause = format!(" WHERE LOWER(n.title) LIKE ?{}", escape);
                if topic_id.is_some() {
                    clause.push_str(" AND n.topic_id = ?");
                }
                clause
            }
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            Filter::TopicName(_) => " ORDER BY n.title, n.id",
            Filter::Admin { .. } => " ORDER BY n.published_date, n.id",
        }
    }

    fn pattern(&self) -> Option<String> {
        match self {
            Filter::TopicName("") => None,
            Filter::TopicName(needle) => Some(contains_pattern(needle)),
            Filter::Admin { title, .. } => Some(contains_pattern(title)),
        }
    }

    fn topic_id(&self) -> Option<i64> {
        match self {
            Filter::Admin { topic_id, .. } => *topic_id,
            Filter::TopicName(_) => None,
        }
    }
}

const SQLITE_ESCAPE: &str = " ESCAPE '\\'";

const SELECT_WITH_TOPIC: &str = r#"
    SELECT n.id, n.title, n.content, n.published_date, n.topic_id,
           n.created_at, n.updated_at,
           t.name AS topic_name, t.created_at AS topic_created_at
    FROM newspapers n
    LEFT JOIN topics t ON t.id = n.topic_id"#;

const COUNT_WITH_TOPIC: &str =
    "SELECT COUNT(*) FROM newspapers n LEFT JOIN topics t ON t.id = n.topic_id";

const SELECT_NEWSPAPER: &str = r#"
    SELECT id, title, content, published_date, topic_id, created_at, updated_at
    FROM newspapers"#;

#[async_trait]
impl NewspaperRepository for SqlxNewspaperRepository {
    async fn create(&self, input: &NewspaperInput) -> Result<Newspaper> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_newspaper_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_newspaper_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Newspaper>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_newspaper_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_newspaper_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<NewspaperWithTopic>> {
        self.filter_by_topic_name("").await
    }

    async fn filter_by_topic_name(&self, needle: &str) -> Result<Vec<NewspaperWithTopic>> {
        let filter = Filter::TopicName(needle);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_newspapers_sqlite(self.pool.sqlite()?, filter, None).await,
            DatabaseDriver::Mysql => find_newspapers_mysql(self.pool.mysql()?, filter, None).await,
        }
    }

    async fn count_matching(&self, needle: &str) -> Result<i64> {
        let filter = Filter::TopicName(needle);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_newspapers_sqlite(self.pool.sqlite()?, filter).await,
            DatabaseDriver::Mysql => count_newspapers_mysql(self.pool.mysql()?, filter).await,
        }
    }

    async fn find_page(
        &self,
        needle: &str,
        params: &ListParams,
    ) -> Result<Vec<NewspaperWithTopic>> {
        let filter = Filter::TopicName(needle);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_newspapers_sqlite(self.pool.sqlite()?, filter, Some(params)).await
            }
            DatabaseDriver::Mysql => {
                find_newspapers_mysql(self.pool.mysql()?, filter, Some(params)).await
            }
        }
    }

    async fn update(&self, id: i64, input: &NewspaperInput) -> Result<Newspaper> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_newspaper_sqlite(self.pool.sqlite()?, id, input).await,
            DatabaseDriver::Mysql => update_newspaper_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_newspaper_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_newspaper_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        self.count_matching("").await
    }

    async fn publishers_of(&self, newspaper_id: i64) -> Result<Vec<Redactor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => publishers_of_sqlite(self.pool.sqlite()?, newspaper_id).await,
            DatabaseDriver::Mysql => publishers_of_mysql(self.pool.mysql()?, newspaper_id).await,
        }
    }

    async fn set_publishers(&self, newspaper_id: i64, redactor_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut tx = self.pool.sqlite()?.begin().await?;
                replace_publishers_sqlite(&mut tx, newspaper_id, redactor_ids).await?;
                tx.commit().await.context("Failed to commit publishers")
            }
            DatabaseDriver::Mysql => {
                let mut tx = self.pool.mysql()?.begin().await?;
                replace_publishers_mysql(&mut tx, newspaper_id, redactor_ids).await?;
                tx.commit().await.context("Failed to commit publishers")
            }
        }
    }

    async fn list_for_admin(
        &self,
        title_query: &str,
        topic_id: Option<i64>,
    ) -> Result<Vec<NewspaperWithTopic>> {
        let filter = Filter::Admin {
            title: title_query,
            topic_id,
        };
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_newspapers_sqlite(self.pool.sqlite()?, filter, None).await,
            DatabaseDriver::Mysql => find_newspapers_mysql(self.pool.mysql()?, filter, None).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_newspaper_sqlite(pool: &SqlitePool, input: &NewspaperInput) -> Result<Newspaper> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO newspapers (title, content, published_date, topic_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.published_date)
    .bind(input.topic_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create newspaper")?;

    let id = result.last_insert_rowid();
    replace_publishers_sqlite(&mut tx, id, &input.publisher_ids).await?;
    tx.commit().await.context("Failed to commit newspaper")?;

    Ok(newspaper_from_input(id, input, now, now))
}

async fn get_newspaper_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Newspaper>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWSPAPER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get newspaper by ID")?;

    row.map(|row| row_to_newspaper_sqlite(&row)).transpose()
}

async fn find_newspapers_sqlite(
    pool: &SqlitePool,
    filter: Filter<'_>,
    page: Option<&ListParams>,
) -> Result<Vec<NewspaperWithTopic>> {
    let mut sql = format!(
        "{}{}{}",
        SELECT_WITH_TOPIC,
        filter.where_clause(SQLITE_ESCAPE),
        filter.order_by()
    );
    if page.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query(&sql);
    if let Some(pattern) = filter.pattern() {
        query = query.bind(pattern);
    }
    if let Some(topic_id) = filter.topic_id() {
        query = query.bind(topic_id);
    }
    if let Some(params) = page {
        query = query.bind(params.limit()).bind(params.offset());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list newspapers")?;

    rows.iter()
        .map(|row| -> Result<NewspaperWithTopic> {
            let newspaper = row_to_newspaper_sqlite(row)?;
            let topic_name: Option<String> = row.try_get("topic_name")?;
            let topic = match (newspaper.topic_id, topic_name) {
                (Some(id), Some(name)) => Some(Topic {
                    id,
                    name,
                    created_at: row.try_get("topic_created_at")?,
                }),
                _ => None,
            };
            Ok(NewspaperWithTopic { newspaper, topic })
        })
        .collect()
}

async fn count_newspapers_sqlite(pool: &SqlitePool, filter: Filter<'_>) -> Result<i64> {
    let sql = format!("{}{}", COUNT_WITH_TOPIC, filter.where_clause(SQLITE_ESCAPE));
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(pattern) = filter.pattern() {
        query = query.bind(pattern);
    }
    if let Some(topic_id) = filter.topic_id() {
        query = query.bind(topic_id);
    }

    let count: i64 = query
        .fetch_one(pool)
        .await
        .context("Failed to count newspapers")?;
    Ok(count)
}

async fn update_newspaper_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &NewspaperInput,
) -> Result<Newspaper> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE newspapers
        SET title = ?, content = ?, published_date = ?, topic_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.published_date)
    .bind(input.topic_id)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update newspaper")?;

    replace_publishers_sqlite(&mut tx, id, &input.publisher_ids).await?;

    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWSPAPER))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload newspaper")?;
    let newspaper = row_to_newspaper_sqlite(&row)?;

    tx.commit().await.context("Failed to commit newspaper")?;
    Ok(newspaper)
}

async fn delete_newspaper_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    // newspaper_publishers rows go with it (ON DELETE CASCADE)
    let result = sqlx::query("DELETE FROM newspapers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete newspaper")?;

    Ok(result.rows_affected() > 0)
}

async fn publishers_of_sqlite(pool: &SqlitePool, newspaper_id: i64) -> Result<Vec<Redactor>> {
    let sql = format!(
        "SELECT {} FROM redactors r \
         JOIN newspaper_publishers p ON p.redactor_id = r.id \
         WHERE p.newspaper_id = ? ORDER BY r.username",
        REDACTOR_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(newspaper_id)
        .fetch_all(pool)
        .await
        .context("Failed to load publishers")?;

    rows.iter().map(row_to_redactor_sqlite).collect()
}

async fn replace_publishers_sqlite(
    conn: &mut SqliteConnection,
    newspaper_id: i64,
    redactor_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM newspaper_publishers WHERE newspaper_id = ?")
        .bind(newspaper_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear publishers")?;

    for redactor_id in redactor_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO newspaper_publishers (newspaper_id, redactor_id) VALUES (?, ?)",
        )
        .bind(newspaper_id)
        .bind(*redactor_id)
        .execute(&mut *conn)
        .await
        .context("Failed to add publisher")?;
    }

    Ok(())
}

pub(super) fn row_to_newspaper_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Newspaper> {
    Ok(Newspaper {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        published_date: row.try_get("published_date")?,
        topic_id: row.try_get("topic_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_newspaper_mysql(pool: &MySqlPool, input: &NewspaperInput) -> Result<Newspaper> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO newspapers (title, content, published_date, topic_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.published_date)
    .bind(input.topic_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create newspaper")?;

    let id = result.last_insert_id() as i64;
    replace_publishers_mysql(&mut tx, id, &input.publisher_ids).await?;
    tx.commit().await.context("Failed to commit newspaper")?;

    Ok(newspaper_from_input(id, input, now, now))
}

async fn get_newspaper_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Newspaper>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWSPAPER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get newspaper by ID")?;

    row.map(|row| row_to_newspaper_mysql(&row)).transpose()
}

async fn find_newspapers_mysql(
    pool: &MySqlPool,
    filter: Filter<'_>,
    page: Option<&ListParams>,
) -> Result<Vec<NewspaperWithTopic>> {
    let mut sql = format!(
        "{}{}{}",
        SELECT_WITH_TOPIC,
        filter.where_clause(""),
        filter.order_by()
    );
    if page.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query(&sql);
    if let Some(pattern) = filter.pattern() {
        query = query.bind(pattern);
    }
    if let Some(topic_id) = filter.topic_id() {
        query = query.bind(topic_id);
    }
    if let Some(params) = page {
        query = query.bind(params.limit()).bind(params.offset());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list newspapers")?;

    rows.iter()
        .map(|row| -> Result<NewspaperWithTopic> {
            let newspaper = row_to_newspaper_mysql(row)?;
            let topic_name: Option<String> = row.try_get("topic_name")?;
            let topic = match (newspaper.topic_id, topic_name) {
                (Some(id), Some(name)) => Some(Topic {
                    id,
                    name,
                    created_at: row.try_get("topic_created_at")?,
                }),
                _ => None,
            };
            Ok(NewspaperWithTopic { newspaper, topic })
        })
        .collect()
}

async fn count_newspapers_mysql(pool: &MySqlPool, filter: Filter<'_>) -> Result<i64> {
    let sql = format!("{}{}", COUNT_WITH_TOPIC, filter.where_clause(""));
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(pattern) = filter.pattern() {
        query = query.bind(pattern);
    }
    if let Some(topic_id) = filter.topic_id() {
        query = query.bind(topic_id);
    }

    let count: i64 = query
        .fetch_one(pool)
        .await
        .context("Failed to count newspapers")?;
    Ok(count)
}

async fn update_newspaper_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &NewspaperInput,
) -> Result<Newspaper> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE newspapers
        SET title = ?, content = ?, published_date = ?, topic_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.published_date)
    .bind(input.topic_id)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update newspaper")?;

    replace_publishers_mysql(&mut tx, id, &input.publisher_ids).await?;

    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWSPAPER))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload newspaper")?;
    let newspaper = row_to_newspaper_mysql(&row)?;

    tx.commit().await.context("Failed to commit newspaper")?;
    Ok(newspaper)
}

async fn delete_newspaper_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM newspapers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete newspaper")?;

    Ok(result.rows_affected() > 0)
}

async fn publishers_of_mysql(pool: &MySqlPool, newspaper_id: i64) -> Result<Vec<Redactor>> {
    let sql = format!(
        "SELECT {} FROM redactors r \
         JOIN newspaper_publishers p ON p.redactor_id = r.id \
         WHERE p.newspaper_id = ? ORDER BY r.username",
        REDACTOR_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(newspaper_id)
        .fetch_all(pool)
        .await
        .context("Failed to load publishers")?;

    rows.iter().map(row_to_redactor_mysql).collect()
}

async fn replace_publishers_mysql(
    conn: &mut MySqlConnection,
    newspaper_id: i64,
    redactor_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM newspaper_publishers WHERE newspaper_id = ?")
        .bind(newspaper_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear publishers")?;

    for redactor_id in redactor_ids {
        sqlx::query(
            "INSERT IGNORE INTO newspaper_publishers (newspaper_id, redactor_id) VALUES (?, ?)",
        )
        .bind(newspaper_id)
        .bind(*redactor_id)
        .execute(&mut *conn)
        .await
        .context("Failed to add publisher")?;
    }

    Ok(())
}

pub(super) fn row_to_newspaper_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Newspaper> {
    Ok(Newspaper {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        published_date: row.try_get("published_date")?,
        topic_id: row.try_get("topic_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn newspaper_from_input(
    id: i64,
    input: &NewspaperInput,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> Newspaper {
    Newspaper {
        id,
        title: input.title.clone(),
        content: input.content.clone(),
        published_date: input.published_date,
        topic_id: input.topic_id,
        created_at,
        updated_at,
    }
}
