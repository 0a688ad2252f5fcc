pub mod subscription_repo;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open (creating if necessary) the subscription database at `path`.
pub async fn init_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database for tests. A single connection is mandatory: each
/// SQLite `:memory:` connection is its own database.
pub async fn init_pool_in_memory() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            subscriber_id   INTEGER NOT NULL,
            source_wallet   TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            scale_factor    TEXT NOT NULL,
            enabled         INTEGER NOT NULL DEFAULT 1,
            created_at      INTEGER NOT NULL,
            last_seen_ts    INTEGER NOT NULL DEFAULT 0,
            last_seen_tx    TEXT NOT NULL DEFAULT '',
            last_seen_li    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (subscriber_id, source_wallet)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
