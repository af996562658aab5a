//! `system_settings` table access
//!
//! Row-level reads and writes used by the settings registry. Functions take
//! any SQLite executor so the registry can run them inside one transaction.
//! `options` and `depends_on` are stored as JSON text; NULL means absent.

use crate::settings::types::{
    DataType, DependsOn, SettingDefinition, SettingOption, SettingRecord, SettingValue,
};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

macro_rules! select_settings {
    ($tail:literal) => {
        concat!(
            "SELECT key, value, label, description, category, data_type, ",
            "options, depends_on, is_hidden FROM system_settings ",
            $tail
        )
    };
}

/// Setting row exactly as persisted (value still a raw string, NULL as `None`)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSetting {
    pub key: String,
    pub value: Option<String>,
    pub metadata: SettingMetadata,
    pub is_hidden: bool,
}

/// Catalog-owned columns of a setting row
#[derive(Debug, Clone, PartialEq)]
pub struct SettingMetadata {
    pub label: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub data_type: DataType,
    pub options: Option<Vec<SettingOption>>,
    pub depends_on: Option<DependsOn>,
}

impl SettingMetadata {
    /// Metadata as a fresh row for `definition` would carry it
    pub fn from_definition(definition: &SettingDefinition) -> Self {
        Self {
            label: definition.label.clone(),
            description: definition.description.clone(),
            category: definition.category.clone(),
            data_type: definition.data_type,
            options: definition.options.clone(),
            depends_on: definition.depends_on.clone(),
        }
    }

    /// Metadata after syncing with `definition`
    ///
    /// Label, description, category and type always follow the catalog.
    /// Options and dependency are only replaced when the catalog declares them.
    pub fn synced_with(&self, definition: &SettingDefinition) -> Self {
        Self {
            label: definition.label.clone(),
            description: definition.description.clone(),
            category: definition.category.clone(),
            data_type: definition.data_type,
            options: definition.options.clone().or_else(|| self.options.clone()),
            depends_on: definition
                .depends_on
                .clone()
                .or_else(|| self.depends_on.clone()),
        }
    }
}

impl StoredSetting {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let data_type: String = row.try_get("data_type")?;
        let options: Option<String> = row.try_get("options")?;
        let depends_on: Option<String> = row.try_get("depends_on")?;
        Ok(Self {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            metadata: SettingMetadata {
                label: row.try_get("label")?,
                description: row.try_get("description")?,
                category: row.try_get("category")?,
                data_type: data_type.parse()?,
                options: decode_json(options.as_deref())?,
                depends_on: decode_json(depends_on.as_deref())?,
            },
            is_hidden: row.try_get::<i64, _>("is_hidden")? != 0,
        })
    }

    /// Cast the raw value and produce the public record
    ///
    /// A NULL value stays absent instead of being cast.
    pub fn into_record(self) -> Result<SettingRecord> {
        let value = self.cast_value()?;
        Ok(SettingRecord {
            key: self.key,
            value,
            label: self.metadata.label,
            description: self.metadata.description,
            category: self.metadata.category,
            data_type: self.metadata.data_type,
            options: self.metadata.options,
            depends_on: self.metadata.depends_on,
            is_hidden: self.is_hidden,
        })
    }

    /// Typed value, or `None` for a NULL column
    pub fn cast_value(&self) -> Result<Option<SettingValue>> {
        self.value
            .as_deref()
            .map(|raw| SettingValue::cast(&self.key, raw, self.metadata.data_type))
            .transpose()
    }
}

/// Empty or NULL JSON columns read as absent
fn decode_json<T: serde::de::DeserializeOwned>(raw: Option<&str>) -> Result<Option<T>> {
    match raw {
        Some(text) if !text.trim().is_empty() && text.trim() != "null" => {
            Ok(Some(serde_json::from_str(text)?))
        }
        _ => Ok(None),
    }
}

fn encode_json<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

/// Load every setting row in insertion order
pub async fn load_all<'e, E>(executor: E) -> Result<Vec<StoredSetting>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(select_settings!("ORDER BY rowid"))
        .fetch_all(executor)
        .await?;
    rows.iter().map(StoredSetting::from_row).collect()
}

/// Load visible setting rows in insertion order
pub async fn load_visible<'e, E>(executor: E) -> Result<Vec<StoredSetting>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(select_settings!("WHERE is_hidden = 0 ORDER BY rowid"))
        .fetch_all(executor)
        .await?;
    rows.iter().map(StoredSetting::from_row).collect()
}

/// Load one setting row
pub async fn load_one<'e, E>(executor: E, key: &str) -> Result<Option<StoredSetting>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(select_settings!("WHERE key = ?"))
        .bind(key)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(StoredSetting::from_row).transpose()
}

/// Insert a new row seeded from `definition`, value set to its default
pub async fn insert_default<'e, E>(executor: E, definition: &SettingDefinition) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO system_settings
            (key, value, label, description, category, data_type, options, depends_on)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&definition.key)
    .bind(&definition.default_value)
    .bind(&definition.label)
    .bind(&definition.description)
    .bind(&definition.category)
    .bind(definition.data_type.as_str())
    .bind(encode_json(definition.options.as_ref())?)
    .bind(encode_json(definition.depends_on.as_ref())?)
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrite the catalog-owned columns of an existing row; `value` is untouched
pub async fn update_metadata<'e, E>(executor: E, key: &str, metadata: &SettingMetadata) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE system_settings
        SET label = ?, description = ?, category = ?, data_type = ?,
            options = ?, depends_on = ?, updated_at = CURRENT_TIMESTAMP
        WHERE key = ?
        "#,
    )
    .bind(&metadata.label)
    .bind(&metadata.description)
    .bind(&metadata.category)
    .bind(metadata.data_type.as_str())
    .bind(encode_json(metadata.options.as_ref())?)
    .bind(encode_json(metadata.depends_on.as_ref())?)
    .bind(key)
    .execute(executor)
    .await?;

    Ok(())
}

/// Store a new raw value; returns false when no row matched
pub async fn update_value<'e, E>(executor: E, key: &str, raw: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE system_settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?",
    )
    .bind(raw)
    .bind(key)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
