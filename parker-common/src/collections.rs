//! Collection membership
//!
//! Collections are unordered thematic groupings. The scanner files each comic
//! into the collection named by its `series_group` tag; collections created
//! that way are marked `auto_generated`.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub auto_generated: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Collection with its number of comics
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CollectionSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub auto_generated: bool,
    pub comic_count: i64,
}

/// Existing collection named `name` (trimmed), created if missing
///
/// # Errors
/// [`Error::InvalidInput`] for a blank name.
pub async fn get_or_create_collection(pool: &SqlitePool, name: &str) -> Result<Collection> {
    let mut conn = pool.acquire().await?;
    ensure_collection(&mut conn, name).await
}

/// Add a comic to a collection, creating the collection if needed
///
/// Returns false when the comic was already a member.
pub async fn add_comic_to_collection(
    pool: &SqlitePool,
    comic_id: i64,
    collection_name: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let added = add_item(&mut tx, comic_id, collection_name).await?;
    tx.commit().await?;
    Ok(added)
}

/// Remove a comic from every collection; returns the number of memberships dropped
pub async fn remove_comic_from_all_collections(pool: &SqlitePool, comic_id: i64) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    remove_items(&mut conn, comic_id).await
}

/// Re-file a comic according to its `series_group`
///
/// Drops all current memberships, then adds the comic to the collection named
/// by `series_group` when it is present and not blank. Runs in one transaction.
pub async fn update_comic_collections(
    pool: &SqlitePool,
    comic_id: i64,
    series_group: Option<&str>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    remove_items(&mut tx, comic_id).await?;

    if let Some(group) = series_group.map(str::trim).filter(|g| !g.is_empty()) {
        add_item(&mut tx, comic_id, group).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Delete collections that contain no comics; returns how many were removed
pub async fn cleanup_empty_collections(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let empty: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT name FROM collections
        WHERE NOT EXISTS (SELECT 1 FROM collection_items i WHERE i.collection_id = collections.id)
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    if empty.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        DELETE FROM collections
        WHERE NOT EXISTS (SELECT 1 FROM collection_items i WHERE i.collection_id = collections.id)
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    for name in &empty {
        info!("Removed empty collection: {}", name);
    }

    Ok(result.rows_affected())
}

/// Every collection with its comic count, by name
pub async fn list_collections(pool: &SqlitePool) -> Result<Vec<CollectionSummary>> {
    let collections = sqlx::query_as::<_, CollectionSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.auto_generated, COUNT(i.id) AS comic_count
        FROM collections c
        LEFT JOIN collection_items i ON i.collection_id = c.id
        GROUP BY c.id
        ORDER BY c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(collections)
}

async fn ensure_collection(conn: &mut SqliteConnection, name: &str) -> Result<Collection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Collection name is empty".to_string()));
    }

    let inserted = sqlx::query("INSERT OR IGNORE INTO collections (name, auto_generated) VALUES (?, 1)")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    if inserted.rows_affected() > 0 {
        info!("Created collection: {}", name);
    }

    let collection = sqlx::query_as::<_, Collection>(
        "SELECT id, name, description, auto_generated, created_at, updated_at
         FROM collections WHERE name = ?",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(collection)
}

async fn add_item(conn: &mut SqliteConnection, comic_id: i64, collection_name: &str) -> Result<bool> {
    let collection = ensure_collection(conn, collection_name).await?;

    let result =
        sqlx::query("INSERT OR IGNORE INTO collection_items (collection_id, comic_id) VALUES (?, ?)")
            .bind(collection.id)
            .bind(comic_id)
            .execute(&mut *conn)
            .await?;

    let added = result.rows_affected() > 0;
    if added {
        info!("Added comic {} to collection '{}'", comic_id, collection.name);
    }
    Ok(added)
}

async fn remove_items(conn: &mut SqliteConnection, comic_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM collection_items WHERE comic_id = ?")
        .bind(comic_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
