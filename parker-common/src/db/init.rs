//! Database initialization
//!
//! Opens (or creates) the library database and brings the schema up to date:
//! 1. `CREATE TABLE IF NOT EXISTS` for every table
//! 2. Versioned migrations for databases created by older releases
//!
//! Settings rows are not seeded here; that is the settings registry's job
//! (`SettingsRegistry::initialize_defaults`), which runs after this.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets request handlers read while the registry or a scan writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
///
/// Split out of [`init_database`] so tests can build the schema on an
/// in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;

    // Library entities (written by the scanner)
    create_series_table(pool).await?;
    create_volumes_table(pool).await?;
    create_comics_table(pool).await?;
    create_tag_tables(pool).await?;

    // Collections
    create_collections_tables(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the system_settings table
///
/// One row per setting key. `value` is owned by the user; every other column
/// is denormalized from the settings catalog and rewritten on startup.
/// `options` and `depends_on` hold JSON text.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            label TEXT,
            description TEXT,
            category TEXT NOT NULL DEFAULT 'general',
            data_type TEXT NOT NULL DEFAULT 'string',
            options TEXT,
            depends_on TEXT,
            is_hidden INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_series_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_volumes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS volumes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            series_id INTEGER REFERENCES series(id),
            volume_number INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_volumes_series ON volumes(series_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the comics table
///
/// One row per archive file. Credits and publishing fields come from the
/// archive's embedded metadata; `metadata_json` keeps the full original block.
pub async fn create_comics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            volume_id INTEGER REFERENCES volumes(id),
            filename TEXT NOT NULL,
            file_path TEXT NOT NULL UNIQUE,
            file_modified_at REAL,
            page_count INTEGER NOT NULL DEFAULT 0,
            number TEXT,
            title TEXT,
            summary TEXT,
            year INTEGER,
            month INTEGER,
            day INTEGER,
            writer TEXT,
            penciller TEXT,
            inker TEXT,
            colorist TEXT,
            letterer TEXT,
            cover_artist TEXT,
            editor TEXT,
            publisher TEXT,
            imprint TEXT,
            format TEXT,
            series_group TEXT,
            scan_information TEXT,
            alternate_series TEXT,
            alternate_number TEXT,
            story_arc TEXT,
            metadata_json TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comics_volume ON comics(volume_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create characters/teams/locations and their comic junction tables
pub async fn create_tag_tables(pool: &SqlitePool) -> Result<()> {
    for (table, junction, column) in [
        ("characters", "comic_characters", "character_id"),
        ("teams", "comic_teams", "team_id"),
        ("locations", "comic_locations", "location_id"),
    ] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {junction} (
                comic_id INTEGER NOT NULL REFERENCES comics(id) ON DELETE CASCADE,
                {column} INTEGER NOT NULL REFERENCES {table}(id) ON DELETE CASCADE,
                PRIMARY KEY (comic_id, {column})
            )
            "#
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Create the collections and collection_items tables
///
/// A collection is an unordered thematic grouping; the same comic appears
/// at most once per collection.
pub async fn create_collections_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            auto_generated INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            comic_id INTEGER NOT NULL REFERENCES comics(id) ON DELETE CASCADE,
            CONSTRAINT unique_collection_comic UNIQUE (collection_id, comic_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_collection_items_comic ON collection_items(comic_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
