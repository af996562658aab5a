//! Shared settings snapshot
//!
//! Subsystems that read settings on hot paths (login page, scanner, scheduler)
//! go through [`SettingsCache`] instead of the database. The cache holds one
//! immutable [`SettingsSnapshot`]; it is built lazily on the first read and
//! dropped as a whole by [`SettingsCache::invalidate`].

use super::types::{DependsOn, SettingValue};
use crate::db::settings as settings_db;
use crate::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Point-in-time view of every setting, values already cast
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    values: HashMap<String, SettingValue>,
}

impl SettingsSnapshot {
    pub fn new(values: HashMap<String, SettingValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SettingValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(SettingValue::as_int)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(SettingValue::as_bool)
    }

    /// Whether a setting with dependency `depends_on` is currently relevant
    ///
    /// Settings without a dependency are always active.
    pub fn is_active(&self, depends_on: Option<&DependsOn>) -> bool {
        match depends_on {
            Some(dep) => dep.is_satisfied_by(self.get(&dep.key)),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lazily populated, explicitly invalidated settings cache
///
/// Every invalidation bumps a generation counter under the write lock. A
/// load only installs its result if the generation it started from is still
/// current, so a snapshot read before an update can never replace the
/// invalidation that followed the update.
pub struct SettingsCache {
    pool: SqlitePool,
    snapshot: RwLock<Option<Arc<SettingsSnapshot>>>,
    generation: AtomicU64,
    /// Loads thrown away because an invalidation overtook them
    discarded: AtomicU64,
    /// Serializes population so concurrent misses hit the database once
    populate: Mutex<()>,
}

impl SettingsCache {
    /// Create an empty cache reading from `pool`
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            populate: Mutex::new(()),
        }
    }

    /// Current snapshot, loading it from the database on a miss
    pub async fn snapshot(&self) -> Result<Arc<SettingsSnapshot>> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let _populating = self.populate.lock().await;

        loop {
            // Another task may have populated while we waited
            if let Some(snapshot) = self.snapshot.read().await.as_ref() {
                return Ok(Arc::clone(snapshot));
            }

            let started_at = self.generation();
            let loaded = Arc::new(self.load().await?);

            if self.install(started_at, &loaded).await {
                return Ok(loaded);
            }
            // Invalidated mid-load; the loaded data may predate the write
            self.discarded.fetch_add(1, Ordering::AcqRel);
            debug!("Settings cache invalidated during load, reloading");
        }
    }

    /// Install `loaded` unless the cache was invalidated after `started_at`
    async fn install(&self, started_at: u64, loaded: &Arc<SettingsSnapshot>) -> bool {
        let mut slot = self.snapshot.write().await;
        if self.generation.load(Ordering::Acquire) != started_at {
            return false;
        }

        *slot = Some(Arc::clone(loaded));
        debug!(
            "Settings cache populated ({} settings, generation {})",
            loaded.len(),
            started_at
        );
        true
    }

    /// Drop the snapshot; the next read reloads from the database
    pub async fn invalidate(&self) {
        let mut slot = self.snapshot.write().await;
        *slot = None;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Settings cache invalidated (generation {})", generation);
    }

    /// Number of invalidations so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of loads discarded because of a concurrent invalidation
    pub fn discarded_loads(&self) -> u64 {
        self.discarded.load(Ordering::Acquire)
    }

    /// True when a snapshot is currently held
    pub async fn is_populated(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    async fn load(&self) -> Result<SettingsSnapshot> {
        let stored = settings_db::load_all(&self.pool).await?;
        let mut values = HashMap::with_capacity(stored.len());
        for setting in stored {
            // NULL values are left out, so they read as absent
            if let Some(value) = setting.cast_value()? {
                values.insert(setting.key, value);
            }
        }
        Ok(SettingsSnapshot::new(values))
    }
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("generation", &self.generation())
            .field("discarded_loads", &self.discarded_loads())
            .finish_non_exhaustive()
    }
}
