//! Comic queries
//!
//! Comics, volumes and series are written by the library scanner; this
//! module only reads them.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqlitePool;

/// One row of the comic listing
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ComicSummary {
    pub id: i64,
    pub filename: String,
    pub series: String,
    pub volume: i64,
    pub number: Option<String>,
    pub title: Option<String>,
    pub page_count: i64,
    pub year: Option<i64>,
}

/// Comic listing with its size
#[derive(Debug, Clone, Serialize)]
pub struct ComicList {
    pub total: usize,
    pub comics: Vec<ComicSummary>,
}

/// Everything known about one comic
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ComicDetail {
    pub id: i64,
    pub filename: String,
    pub file_path: String,

    pub series: Option<String>,
    pub volume: Option<i64>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,

    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,

    pub writer: Option<String>,
    pub penciller: Option<String>,
    pub inker: Option<String>,
    pub colorist: Option<String>,
    pub letterer: Option<String>,
    pub cover_artist: Option<String>,
    pub editor: Option<String>,

    pub publisher: Option<String>,
    pub imprint: Option<String>,
    pub format: Option<String>,
    pub series_group: Option<String>,

    pub page_count: i64,
    pub scan_information: Option<String>,

    #[sqlx(skip)]
    pub characters: Vec<String>,
    #[sqlx(skip)]
    pub teams: Vec<String>,
    #[sqlx(skip)]
    pub locations: Vec<String>,

    pub alternate_series: Option<String>,
    pub alternate_number: Option<String>,
    pub story_arc: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// List every comic that belongs to a series
pub async fn list_comics(pool: &SqlitePool) -> Result<ComicList> {
    let comics = sqlx::query_as::<_, ComicSummary>(
        r#"
        SELECT c.id, c.filename, s.name AS series, v.volume_number AS volume,
               c.number, c.title, c.page_count, c.year
        FROM comics c
        JOIN volumes v ON v.id = c.volume_id
        JOIN series s ON s.id = v.series_id
        ORDER BY c.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ComicList {
        total: comics.len(),
        comics,
    })
}

/// Full detail for one comic, including tag names
///
/// # Errors
/// [`Error::NotFound`] when no comic has this id.
pub async fn get_comic(pool: &SqlitePool, comic_id: i64) -> Result<ComicDetail> {
    let mut comic = sqlx::query_as::<_, ComicDetail>(
        r#"
        SELECT c.id, c.filename, c.file_path,
               s.name AS series, v.volume_number AS volume,
               c.number, c.title, c.summary, c.year, c.month, c.day,
               c.writer, c.penciller, c.inker, c.colorist, c.letterer,
               c.cover_artist, c.editor,
               c.publisher, c.imprint, c.format, c.series_group,
               c.page_count, c.scan_information,
               c.alternate_series, c.alternate_number, c.story_arc,
               c.created_at, c.updated_at
        FROM comics c
        LEFT JOIN volumes v ON v.id = c.volume_id
        LEFT JOIN series s ON s.id = v.series_id
        WHERE c.id = ?
        "#,
    )
    .bind(comic_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Comic not found: {}", comic_id)))?;

    comic.characters = tag_names(pool, TagKind::Character, comic_id).await?;
    comic.teams = tag_names(pool, TagKind::Team, comic_id).await?;
    comic.locations = tag_names(pool, TagKind::Location, comic_id).await?;

    Ok(comic)
}

#[derive(Debug, Clone, Copy)]
enum TagKind {
    Character,
    Team,
    Location,
}

impl TagKind {
    fn query(&self) -> &'static str {
        match self {
            TagKind::Character => {
                "SELECT t.name FROM characters t
                 JOIN comic_characters j ON j.character_id = t.id
                 WHERE j.comic_id = ? ORDER BY t.name"
            }
            TagKind::Team => {
                "SELECT t.name FROM teams t
                 JOIN comic_teams j ON j.team_id = t.id
                 WHERE j.comic_id = ? ORDER BY t.name"
            }
            TagKind::Location => {
                "SELECT t.name FROM locations t
                 JOIN comic_locations j ON j.location_id = t.id
                 WHERE j.comic_id = ? ORDER BY t.name"
            }
        }
    }
}

async fn tag_names(pool: &SqlitePool, kind: TagKind, comic_id: i64) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(kind.query())
        .bind(comic_id)
        .fetch_all(pool)
        .await?;
    Ok(names)
}
