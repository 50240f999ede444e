//! Database layer
//!
//! Supports SQLite (default, single file) and MySQL. The backend is chosen
//! by configuration and hidden behind the `DatabasePool` trait, so
//! repositories only branch on `pool.driver()` where the SQL differs.
//!
//! ```ignore
//! use inform_agency::config::DatabaseConfig;
//! use inform_agency::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Escape `%`, `_` and `\` so user input matches literally inside a
/// `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lower-cased `%needle%` pattern for case-insensitive substring search.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(&needle.to_lowercase()))
}

/// Whether an error chain bottoms out in a UNIQUE constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
