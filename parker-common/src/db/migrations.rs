//! Database schema migrations
//!
//! Versioned upgrades for databases written by older releases. Tables are
//! created with their current shape by [`crate::db::init`]; migrations only
//! patch tables that already existed before that shape was introduced.
//!
//! Rules:
//! 1. Never modify a released migration; add a new one
//! 2. Every migration must be idempotent (check before ALTER)
//! 3. Prefer ALTER TABLE over DROP/CREATE so user data survives

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// Increment this when adding a migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    Ok(())
}

/// Migration v1: add the `depends_on` column to `system_settings`
///
/// Settings tables from before conditional visibility have no `depends_on`
/// column. Existing rows get NULL; the registry fills it in from the catalog
/// on the next `initialize_defaults`.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !table_exists(pool, "system_settings").await? {
        info!("system_settings table doesn't exist yet - skipping migration v1");
        return Ok(());
    }

    if column_exists(pool, "system_settings", "depends_on").await? {
        return Ok(());
    }

    match sqlx::query("ALTER TABLE system_settings ADD COLUMN depends_on TEXT")
        .execute(pool)
        .await
    {
        Ok(_) => {
            info!("Added depends_on column to system_settings");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            info!("depends_on column added concurrently - skipping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
