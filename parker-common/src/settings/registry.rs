//! Settings registry
//!
//! Keeps `system_settings` rows in sync with the catalog and gives typed
//! read/write access to them.
//!
//! Ownership is split per column: the catalog owns the metadata columns
//! (label, description, category, data type, options, dependency) and
//! rewrites them on every [`SettingsRegistry::initialize_defaults`]; the row
//! owns `value`, which only [`SettingsRegistry::update`] changes.

use super::cache::{SettingsCache, SettingsSnapshot};
use super::catalog::Catalog;
use super::types::{DataType, SettingRecord, SettingValue};
use crate::db::settings::{self as settings_db, StoredSetting};
use crate::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows inserted with their default value
    pub created: usize,
    /// Existing rows whose metadata changed
    pub updated: usize,
    /// Existing rows already matching the catalog
    pub unchanged: usize,
}

impl ReconcileReport {
    /// True when the run wrote nothing
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }
}

/// Settings of one category, in row order
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsGroup {
    pub category: String,
    pub settings: Vec<SettingRecord>,
}

/// Visible settings grouped by category
///
/// Categories keep the order in which they were first encountered. Serializes
/// as a JSON object `{category: [record, ...]}` in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSettings(Vec<SettingsGroup>);

impl GroupedSettings {
    fn from_records(records: impl IntoIterator<Item = SettingRecord>) -> Self {
        let mut groups: Vec<SettingsGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            match positions.get(&record.category) {
                Some(&i) => groups[i].settings.push(record),
                None => {
                    positions.insert(record.category.clone(), groups.len());
                    groups.push(SettingsGroup {
                        category: record.category.clone(),
                        settings: vec![record],
                    });
                }
            }
        }

        Self(groups)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|g| g.category.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[SettingRecord]> {
        self.0
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.settings.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingsGroup> {
        self.0.iter()
    }

    /// Every record, category by category
    pub fn records(&self) -> impl Iterator<Item = &SettingRecord> {
        self.0.iter().flat_map(|g| g.settings.iter())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GroupedSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.category, &group.settings)?;
        }
        map.end()
    }
}

/// Typed access to persisted settings
#[derive(Debug, Clone)]
pub struct SettingsRegistry {
    pool: SqlitePool,
    catalog: Arc<Catalog>,
    cache: Arc<SettingsCache>,
}

impl SettingsRegistry {
    pub fn new(pool: SqlitePool, catalog: Arc<Catalog>, cache: Arc<SettingsCache>) -> Self {
        Self {
            pool,
            catalog,
            cache,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<SettingsCache> {
        &self.cache
    }

    /// Reconcile persisted rows with the catalog
    ///
    /// Missing keys are inserted with their default. Existing rows get their
    /// metadata refreshed when it differs from the catalog; `value` is never
    /// touched. Everything runs in one transaction, so a failure leaves the
    /// table as it was. Rows for keys the catalog no longer knows are left alone.
    pub async fn initialize_defaults(&self) -> Result<ReconcileReport> {
        let mut tx = self.pool.begin().await?;

        let existing: HashMap<String, StoredSetting> = settings_db::load_all(&mut *tx)
            .await?
            .into_iter()
            .map(|s| (s.key.clone(), s))
            .collect();

        let mut report = ReconcileReport::default();

        for definition in self.catalog.definitions() {
            match existing.get(&definition.key) {
                None => {
                    settings_db::insert_default(&mut *tx, definition).await?;
                    report.created += 1;
                }
                Some(stored) => {
                    let synced = stored.metadata.synced_with(definition);
                    if synced != stored.metadata {
                        settings_db::update_metadata(&mut *tx, &definition.key, &synced).await?;
                        debug!("Refreshed metadata for setting {}", definition.key);
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
            }
        }

        tx.commit().await?;

        if !report.is_noop() {
            self.cache.invalidate().await;
        }

        info!(
            "Settings reconciled: {} created, {} updated, {} unchanged",
            report.created, report.updated, report.unchanged
        );

        Ok(report)
    }

    /// Typed value of `key`, or `None` when no row exists or its value is NULL
    ///
    /// # Errors
    /// [`Error::Cast`] when an `int` setting holds a non-numeric string.
    pub async fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        Ok(self.get_record(key).await?.and_then(|record| record.value))
    }

    /// Full record for `key`, value cast, or `None` when no row exists
    pub async fn get_record(&self, key: &str) -> Result<Option<SettingRecord>> {
        settings_db::load_one(&self.pool, key)
            .await?
            .map(StoredSetting::into_record)
            .transpose()
    }

    /// Visible settings with typed values, grouped by category
    pub async fn get_all_grouped(&self) -> Result<GroupedSettings> {
        let records = settings_db::load_visible(&self.pool)
            .await?
            .into_iter()
            .map(StoredSetting::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(GroupedSettings::from_records(records))
    }

    /// Store a new value for `key` and return the updated record
    ///
    /// The value is validated against the row's type before anything is
    /// written. On success the shared cache is invalidated once.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if no row exists for `key`
    /// - [`Error::InvalidInput`] if the value does not fit the setting's type
    ///   or is not one of a select setting's options
    pub async fn update(&self, key: &str, value: impl Into<SettingValue>) -> Result<SettingRecord> {
        let value = value.into();
        let mut tx = self.pool.begin().await?;

        let stored = settings_db::load_one(&mut *tx, key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Setting not found: {}", key)))?;

        let raw = value.to_raw(key, stored.metadata.data_type)?;

        if stored.metadata.data_type == DataType::Select {
            if let Some(options) = stored.metadata.options.as_ref().filter(|o| !o.is_empty()) {
                if !options.iter().any(|o| o.value == raw) {
                    return Err(Error::InvalidInput(format!(
                        "{:?} is not an option of setting '{}'",
                        raw, key
                    )));
                }
            }
        }

        settings_db::update_value(&mut *tx, key, &raw).await?;
        tx.commit().await?;

        self.cache.invalidate().await;
        info!("Setting {} updated", key);

        StoredSetting {
            value: Some(raw),
            ..stored
        }
        .into_record()
    }

    /// Current shared snapshot (through the cache)
    pub async fn snapshot(&self) -> Result<Arc<SettingsSnapshot>> {
        self.cache.snapshot().await
    }

    /// Whether `record` is currently relevant given its parent's value
    pub async fn is_active(&self, record: &SettingRecord) -> Result<bool> {
        Ok(self.snapshot().await?.is_active(record.depends_on.as_ref()))
    }
}
