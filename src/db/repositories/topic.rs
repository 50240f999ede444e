//! Topic repository
//!
//! - `TopicRepository` trait defining the interface for topic data access
//! - `SqlxTopicRepository` implementing the trait for SQLite and MySQL
//!
//! Topics are always returned ordered by name.

use crate::config::DatabaseDriver;
use crate::db::{contains_pattern, DynDatabasePool};
use crate::models::{ListParams, Topic};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Topic repository trait
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Create a new topic
    async fn create(&self, topic: &Topic) -> Result<Topic>;

    /// Get topic by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>>;

    /// Get topic by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Topic>>;

    /// List all topics
    async fn list(&self) -> Result<Vec<Topic>>;

    /// Topics whose name contains `needle`, ignoring case. Empty matches all.
    async fn filter_by_substring(&self, needle: &str) -> Result<Vec<Topic>>;

    /// Number of topics matching `needle`
    async fn count_matching(&self, needle: &str) -> Result<i64>;

    /// One page of the topics matching `needle`
    async fn find_page(&self, needle: &str, params: &ListParams) -> Result<Vec<Topic>>;

    /// Rename a topic
    async fn update(&self, topic: &Topic) -> Result<Topic>;

    /// Delete a topic; returns false when no such topic exists
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Total number of topics
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based topic repository implementation
pub struct SqlxTopicRepository {
    pool: DynDatabasePool,
}

impl SqlxTopicRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TopicRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TopicRepository for SqlxTopicRepository {
    async fn create(&self, topic: &Topic) -> Result<Topic> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_topic_sqlite(self.pool.sqlite()?, topic).await,
            DatabaseDriver::Mysql => create_topic_mysql(self.pool.mysql()?, topic).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_topic_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_topic_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_topic_by_name_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => get_topic_by_name_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Topic>> {
        self.filter_by_substring("").await
    }

    async fn filter_by_substring(&self, needle: &str) -> Result<Vec<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_topics_sqlite(self.pool.sqlite()?, needle, None).await
            }
            DatabaseDriver::Mysql => find_topics_mysql(self.pool.mysql()?, needle, None).await,
        }
    }

    async fn count_matching(&self, needle: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_topics_sqlite(self.pool.sqlite()?, needle).await,
            DatabaseDriver::Mysql => count_topics_mysql(self.pool.mysql()?, needle).await,
        }
    }

    async fn find_page(&self, needle: &str, params: &ListParams) -> Result<Vec<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_topics_sqlite(self.pool.sqlite()?, needle, Some(params)).await
            }
            DatabaseDriver::Mysql => {
                find_topics_mysql(self.pool.mysql()?, needle, Some(params)).await
            }
        }
    }

    async fn update(&self, topic: &Topic) -> Result<Topic> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_topic_sqlite(self.pool.sqlite()?, topic).await,
            DatabaseDriver::Mysql => update_topic_mysql(self.pool.mysql()?, topic).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_topic_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_topic_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        self.count_matching("").await
    }
}

const SELECT_TOPICS: &str = "SELECT id, name, created_at FROM topics";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_topic_sqlite(pool: &SqlitePool, topic: &Topic) -> Result<Topic> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO topics (name, created_at) VALUES (?, ?)")
        .bind(&topic.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create topic")?;

    Ok(Topic {
        id: result.last_insert_rowid(),
        name: topic.name.clone(),
        created_at: now,
    })
}

async fn get_topic_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Topic>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TOPICS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get topic by ID")?;

    row.map(|row| row_to_topic_sqlite(&row)).transpose()
}

async fn get_topic_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Topic>> {
    let row = sqlx::query(&format!("{} WHERE name = ?", SELECT_TOPICS))
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get topic by name")?;

    row.map(|row| row_to_topic_sqlite(&row)).transpose()
}

async fn find_topics_sqlite(
    pool: &SqlitePool,
    needle: &str,
    page: Option<&ListParams>,
) -> Result<Vec<Topic>> {
    let mut sql = format!("{} WHERE LOWER(name) LIKE ? ESCAPE '\\' ORDER BY name, id", SELECT_TOPICS);
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
        .context("Failed to list topics")?;

    rows.iter().map(row_to_topic_sqlite).collect()
}

async fn count_topics_sqlite(pool: &SqlitePool, needle: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM topics WHERE LOWER(name) LIKE ? ESCAPE '\\'")
            .bind(contains_pattern(needle))
            .fetch_one(pool)
            .await
            .context("Failed to count topics")?;
    Ok(count)
}

async fn update_topic_sqlite(pool: &SqlitePool, topic: &Topic) -> Result<Topic> {
    sqlx::query("UPDATE topics SET name = ? WHERE id = ?")
        .bind(&topic.name)
        .bind(topic.id)
        .execute(pool)
        .await
        .context("Failed to update topic")?;

    Ok(topic.clone())
}

async fn delete_topic_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    // newspapers.topic_id is set to NULL by the foreign key
    let result = sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete topic")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_topic_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Topic> {
    Ok(Topic {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_topic_mysql(pool: &MySqlPool, topic: &Topic) -> Result<Topic> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO topics (name, created_at) VALUES (?, ?)")
        .bind(&topic.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create topic")?;

    Ok(Topic {
        id: result.last_insert_id() as i64,
        name: topic.name.clone(),
        created_at: now,
    })
}

async fn get_topic_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Topic>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TOPICS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get topic by ID")?;

    row.map(|row| row_to_topic_mysql(&row)).transpose()
}

async fn get_topic_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Topic>> {
    let row = sqlx::query(&format!("{} WHERE name = ?", SELECT_TOPICS))
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get topic by name")?;

    row.map(|row| row_to_topic_mysql(&row)).transpose()
}

async fn find_topics_mysql(
    pool: &MySqlPool,
    needle: &str,
    page: Option<&ListParams>,
) -> Result<Vec<Topic>> {
    let mut sql = format!("{} WHERE LOWER(name) LIKE ? ORDER BY name, id", SELECT_TOPICS);
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
        .context("Failed to list topics")?;

    rows.iter().map(row_to_topic_mysql).collect()
}

async fn count_topics_mysql(pool: &MySqlPool, needle: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topics WHERE LOWER(name) LIKE ?")
        .bind(contains_pattern(needle))
        .fetch_one(pool)
        .await
        .context("Failed to count topics")?;
    Ok(count)
}

async fn update_topic_mysql(pool: &MySqlPool, topic: &Topic) -> Result<Topic> {
    sqlx::query("UPDATE topics SET name = ? WHERE id = ?")
        .bind(&topic.name)
        .bind(topic.id)
        .execute(pool)
        .await
        .context("Failed to update topic")?;

    Ok(topic.clone())
}

async fn delete_topic_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete topic")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_topic_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Topic> {
    Ok(Topic {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxTopicRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTopicRepository::new(pool)
    }

    async fn seed(repo: &SqlxTopicRepository, names: &[&str]) -> Vec<Topic> {
        let mut topics = Vec::new();
        for name in names {
            topics.push(repo.create(&Topic::new(*name)).await.unwrap());
        }
        topics
    }

    #[tokio::test]
    async fn test_create_and_get_topic() {
        let repo = setup_test_repo().await;
        let created = repo.create(&Topic::new("Economy")).await.unwrap();

        assert!(created.id > 0);
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Economy");
        assert!(repo.get_by_name("Economy").await.unwrap().is_some());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_unique_violation() {
        let repo = setup_test_repo().await;
        repo.create(&Topic::new("Economy")).await.unwrap();

        let err = repo.create(&Topic::new("Economy")).await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let repo = setup_test_repo().await;
        seed(&repo, &["Sport", "Art", "Music"]).await;

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Art", "Music", "Sport"]);
    }

    #[tokio::test]
    async fn test_filter_by_substring_case_insensitive() {
        let repo = setup_test_repo().await;
        seed(&repo, &["Test topic", "Other topic"]).await;

        let found = repo.filter_by_substring("test").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Test topic");

        assert_eq!(repo.filter_by_substring("TOPIC").await.unwrap().len(), 2);
        assert_eq!(repo.filter_by_substring("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_filter_treats_wildcards_literally() {
        let repo = setup_test_repo().await;
        seed(&repo, &["100% news", "1000 news", "a_b", "ab"]).await;

        let percent = repo.filter_by_substring("0%").await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "100% news");

        let underscore = repo.filter_by_substring("a_").await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].name, "a_b");
    }

    #[tokio::test]
    async fn test_pages_follow_name_order() {
        let repo = setup_test_repo().await;
        seed(&repo, &["E", "B", "D", "A", "C"]).await;

        assert_eq!(repo.count_matching("").await.unwrap(), 5);
        let page2 = repo.find_page("", &ListParams::new(2, 2)).await.unwrap();
        let names: Vec<&str> = page2.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D"]);

        let page3 = repo.find_page("", &ListParams::new(3, 2)).await.unwrap();
        assert_eq!(page3.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_topic() {
        let repo = setup_test_repo().await;
        let mut topic = repo.create(&Topic::new("Old")).await.unwrap();

        topic.name = "New".to_string();
        repo.update(&topic).await.unwrap();
        assert_eq!(repo.get_by_id(topic.id).await.unwrap().unwrap().name, "New");

        assert!(repo.delete(topic.id).await.unwrap());
        assert!(!repo.delete(topic.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
