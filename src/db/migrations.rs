//! Database migrations
//!
//! Migrations are embedded as SQL strings, one variant per backend, and
//! tracked in the `_migrations` table so `run_migrations` can be called on
//! every start.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Schema of the agency database, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_redactors",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS redactors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                email VARCHAR(254) NOT NULL DEFAULT '',
                years_of_experience INTEGER NOT NULL DEFAULT 0,
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                is_superuser BOOLEAN NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_login TIMESTAMP NULL
            );
            CREATE INDEX IF NOT EXISTS idx_redactors_experience ON redactors(years_of_experience);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS redactors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                email VARCHAR(254) NOT NULL DEFAULT '',
                years_of_experience INT NOT NULL DEFAULT 0,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_login TIMESTAMP NULL
            );
            CREATE INDEX idx_redactors_experience ON redactors(years_of_experience);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                redactor_id INTEGER NOT NULL,
                visits INTEGER NOT NULL DEFAULT 0,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (redactor_id) REFERENCES redactors(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_redactor ON sessions(redactor_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                redactor_id BIGINT NOT NULL,
                visits BIGINT NOT NULL DEFAULT 0,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (redactor_id) REFERENCES redactors(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_redactor ON sessions(redactor_id);
            CREATE INDEX idx_sessions_expires ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_topics",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS topics (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_newspapers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS newspapers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(100) NOT NULL,
                content TEXT NOT NULL,
                published_date DATE NOT NULL,
                topic_id INTEGER NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_newspapers_title ON newspapers(title);
            CREATE INDEX IF NOT EXISTS idx_newspapers_topic ON newspapers(topic_id);
            CREATE INDEX IF NOT EXISTS idx_newspapers_published ON newspapers(published_date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS newspapers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(100) NOT NULL,
                content TEXT NOT NULL,
                published_date DATE NOT NULL,
                topic_id BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_newspapers_title ON newspapers(title);
            CREATE INDEX idx_newspapers_published ON newspapers(published_date);
        "#,
    },
    Migration {
        version: 5,
        name: "create_newspaper_publishers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS newspaper_publishers (
                newspaper_id INTEGER NOT NULL,
                redactor_id INTEGER NOT NULL,
                PRIMARY KEY (newspaper_id, redactor_id),
                FOREIGN KEY (newspaper_id) REFERENCES newspapers(id) ON DELETE CASCADE,
                FOREIGN KEY (redactor_id) REFERENCES redactors(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_newspaper_publishers_redactor ON newspaper_publishers(redactor_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS newspaper_publishers (
                newspaper_id BIGINT NOT NULL,
                redactor_id BIGINT NOT NULL,
                PRIMARY KEY (newspaper_id, redactor_id),
                FOREIGN KEY (newspaper_id) REFERENCES newspapers(id) ON DELETE CASCADE,
                FOREIGN KEY (redactor_id) REFERENCES redactors(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_newspaper_publishers_redactor ON newspaper_publishers(redactor_id);
        "#,
    },
];

/// Run all pending migrations, in version order.
///
/// Returns the number of migrations applied; zero when the schema is already
/// current.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    // Create migrations table
    create_migrations_table(pool).await?;

    // Get applied migrations
    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows =
        sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows =
        sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    // Execute migration SQL (may contain multiple statements)
    for statement in split_sql_statements(migration.up_sqlite) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    // Record the migration
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    // Execute migration SQL (may contain multiple statements)
    for statement in split_sql_statements(migration.up_mysql) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    // Record the migration
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    // Handle last statement without trailing semicolon
    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    // Try to create migrations table (in case it doesn't exist)
    let _ = create_migrations_table(pool).await;

    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    // Try to create migrations table (in case it doesn't exist)
    let _ = create_migrations_table(pool).await;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    async fn seed(pool: &SqlitePool) -> (i64, i64, i64) {
        let redactor_id = sqlx::query("INSERT INTO redactors (username, password_hash) VALUES ('ed', 'x')")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let topic_id = sqlx::query("INSERT INTO topics (name) VALUES ('Politics')")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let newspaper_id = sqlx::query(
            "INSERT INTO newspapers (title, content, published_date, topic_id) VALUES ('Daily', 'text', '2024-01-02', ?)",
        )
        .bind(topic_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        sqlx::query("INSERT INTO newspaper_publishers (newspaper_id, redactor_id) VALUES (?, ?)")
            .bind(newspaper_id)
            .bind(redactor_id)
            .execute(pool)
            .await
            .unwrap();
        (redactor_id, topic_id, newspaper_id)
    }

    #[tokio::test]
    async fn test_topic_name_unique() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite = pool.sqlite().unwrap();

        sqlx::query("INSERT INTO topics (name) VALUES ('Sport')")
            .execute(sqlite)
            .await
            .unwrap();
        let dup = sqlx::query("INSERT INTO topics (name) VALUES ('Sport')")
            .execute(sqlite)
            .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_deleting_topic_nulls_newspaper_reference() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite = pool.sqlite().unwrap();
        let (_, topic_id, newspaper_id) = seed(sqlite).await;

        sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(topic_id)
            .execute(sqlite)
            .await
            .unwrap();

        let row = sqlx::query("SELECT topic_id FROM newspapers WHERE id = ?")
            .bind(newspaper_id)
            .fetch_one(sqlite)
            .await
            .unwrap();
        let topic: Option<i64> = row.get("topic_id");
        assert_eq!(topic, None);
    }

    #[tokio::test]
    async fn test_deleting_redactor_removes_publisher_links() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite = pool.sqlite().unwrap();
        let (redactor_id, _, newspaper_id) = seed(sqlite).await;

        sqlx::query("DELETE FROM redactors WHERE id = ?")
            .bind(redactor_id)
            .execute(sqlite)
            .await
            .unwrap();

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM newspaper_publishers")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(links, 0);
        let papers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM newspapers WHERE id = ?")
            .bind(newspaper_id)
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(papers, 1);
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n-- comment only;\nCREATE INDEX i ON a(id)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("CREATE INDEX"));
    }

    #[test]
    fn test_truncate_sql_handles_multibyte() {
        let sql = "é".repeat(150);
        let truncated = truncate_sql(&sql);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 103);
    }

    #[test]
    fn test_migration_versions_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
        }
        assert_eq!(total_migrations(), MIGRATIONS.len());
        assert_eq!(get_migration(4).map(|m| m.name), Some("create_newspapers"));
        assert!(get_migration(99).is_none());
    }
}
