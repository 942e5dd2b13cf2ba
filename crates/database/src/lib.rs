//! SQLite access for the Marquee messaging backend.
//!
//! Owns pool construction (with the PRAGMAs the service relies on) and the
//! embedded migration set. Row shapes live with the code that queries them.

use anyhow::Result;
use marquee_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod migrations;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

/// Connect and bring the schema up to date in one step.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = prepare_database(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn initialize_database_prepares_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("init.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'messages'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count.0, 1);
    }
}
