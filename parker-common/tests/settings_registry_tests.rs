//! Integration tests for the settings registry and shared cache
//!
//! Covers reconciliation (seeding, idempotence, value preservation, atomicity),
//! typed reads and writes, grouping and cache coherence.

use parker_common::db::init::create_schema;
use parker_common::settings::{
    Catalog, DataType, SettingOption, SettingValue, SettingsCache, SettingsRegistry,
};
use parker_common::Error;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

fn registry_with(pool: &SqlitePool, catalog: Catalog) -> SettingsRegistry {
    let cache = Arc::new(SettingsCache::new(pool.clone()));
    SettingsRegistry::new(pool.clone(), Arc::new(catalog), cache)
}

async fn initialized_registry() -> (SqlitePool, SettingsRegistry) {
    let pool = setup_test_db().await;
    let registry = registry_with(&pool, Catalog::builtin().unwrap());
    registry.initialize_defaults().await.unwrap();
    (pool, registry)
}

async fn raw_value(pool: &SqlitePool, key: &str) -> Option<String> {
    sqlx::query_scalar::<_, Option<String>>("SELECT value FROM system_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .unwrap()
        .flatten()
}

async fn row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM system_settings")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_every_catalog_key_is_seeded_and_castable() {
    let (pool, registry) = initialized_registry().await;
    let catalog = Catalog::builtin().unwrap();

    assert_eq!(row_count(&pool).await, catalog.len() as i64);

    for definition in catalog.definitions() {
        let value = registry
            .get(&definition.key)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{} was not seeded", definition.key));

        match definition.data_type {
            DataType::Int => assert!(value.as_int().is_some(), "{} not an int", definition.key),
            DataType::Bool => assert!(value.as_bool().is_some(), "{} not a bool", definition.key),
            DataType::String | DataType::Select => {
                assert_eq!(value.as_str(), Some(definition.default_value.as_str()))
            }
        }
    }

    assert_eq!(
        registry.get("scanning.batch_window").await.unwrap(),
        Some(SettingValue::Int(600))
    );
    assert_eq!(
        registry.get("server.opds_enabled").await.unwrap(),
        Some(SettingValue::Bool(false))
    );
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let (pool, registry) = initialized_registry().await;
    let catalog_len = registry.catalog().len();
    let generation = registry.cache().generation();

    let report = registry.initialize_defaults().await.unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, catalog_len);
    assert!(report.is_noop());
    assert_eq!(row_count(&pool).await, catalog_len as i64);
    assert_eq!(registry.cache().generation(), generation, "No-op run must not invalidate");
}

#[tokio::test]
async fn test_first_run_reports_created() {
    let pool = setup_test_db().await;
    let registry = registry_with(&pool, Catalog::builtin().unwrap());

    let report = registry.initialize_defaults().await.unwrap();
    assert_eq!(report.created, registry.catalog().len());
    assert_eq!(report.updated, 0);
}

#[tokio::test]
async fn test_metadata_change_preserves_user_value() {
    let (pool, registry) = initialized_registry().await;

    registry.update("ui.pagination_mode", "classic").await.unwrap();

    let mut definitions = Catalog::builtin().unwrap().definitions().to_vec();
    let pagination = definitions
        .iter_mut()
        .find(|d| d.key == "ui.pagination_mode")
        .unwrap();
    pagination.label = Some("Paging".to_string());
    pagination.description = Some("How long lists are split".to_string());
    pagination.options.as_mut().unwrap().push(SettingOption {
        label: "Endless".to_string(),
        value: "endless".to_string(),
        group: None,
    });

    let changed = registry_with(&pool, Catalog::new(definitions).unwrap());
    let report = changed.initialize_defaults().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);

    let record = changed.get_record("ui.pagination_mode").await.unwrap().unwrap();
    assert_eq!(record.value, Some(SettingValue::from("classic")));
    assert_eq!(record.label.as_deref(), Some("Paging"));
    assert_eq!(record.description.as_deref(), Some("How long lists are split"));
    assert_eq!(record.options.unwrap().len(), 3);
}

#[tokio::test]
async fn test_catalog_without_options_keeps_stored_options() {
    let (pool, _registry) = initialized_registry().await;

    let mut definitions = Catalog::builtin().unwrap().definitions().to_vec();
    let app_name = definitions
        .iter_mut()
        .find(|d| d.key == "general.app_name")
        .unwrap();
    app_name.label = Some("Server Name".to_string());

    sqlx::query(
        "UPDATE system_settings SET options = '[{\"label\":\"X\",\"value\":\"x\"}]'
         WHERE key = 'general.app_name'",
    )
    .execute(&pool)
    .await
    .unwrap();

    let changed = registry_with(&pool, Catalog::new(definitions).unwrap());
    changed.initialize_defaults().await.unwrap();

    let record = changed.get_record("general.app_name").await.unwrap().unwrap();
    assert_eq!(record.label.as_deref(), Some("Server Name"));
    assert_eq!(record.options.unwrap()[0].value, "x");
}

#[tokio::test]
async fn test_reconciliation_is_all_or_nothing() {
    let pool = setup_test_db().await;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_opds BEFORE INSERT ON system_settings
        WHEN NEW.key = 'server.opds_enabled'
        BEGIN
            SELECT RAISE(ABORT, 'rejected');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let registry = registry_with(&pool, Catalog::builtin().unwrap());
    let result = registry.initialize_defaults().await;

    assert!(matches!(result, Err(Error::Database(_))));
    assert_eq!(row_count(&pool).await, 0, "Failed run must roll back every insert");
}

#[tokio::test]
async fn test_bool_round_trip_stores_lowercase() {
    let (pool, registry) = initialized_registry().await;

    let record = registry.update("server.opds_enabled", true).await.unwrap();
    assert_eq!(record.value, Some(SettingValue::Bool(true)));

    assert_eq!(
        registry.get("server.opds_enabled").await.unwrap(),
        Some(SettingValue::Bool(true))
    );
    assert_eq!(raw_value(&pool, "server.opds_enabled").await.as_deref(), Some("true"));

    registry.update("server.opds_enabled", "No").await.unwrap();
    assert_eq!(raw_value(&pool, "server.opds_enabled").await.as_deref(), Some("false"));
}

#[tokio::test]
async fn test_int_update_accepts_numbers_and_numeric_strings() {
    let (pool, registry) = initialized_registry().await;

    registry.update("backup.retention_days", 30_i64).await.unwrap();
    assert_eq!(raw_value(&pool, "backup.retention_days").await.as_deref(), Some("30"));

    registry.update("backup.retention_days", "14").await.unwrap();
    assert_eq!(
        registry.get("backup.retention_days").await.unwrap(),
        Some(SettingValue::Int(14))
    );
}

#[tokio::test]
async fn test_unknown_key_update_fails_without_write() {
    let (pool, registry) = initialized_registry().await;
    let before = row_count(&pool).await;
    let generation = registry.cache().generation();

    let result = registry.update("does.not.exist", "1").await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(row_count(&pool).await, before);
    assert!(raw_value(&pool, "does.not.exist").await.is_none());
    assert_eq!(registry.cache().generation(), generation);
}

#[tokio::test]
async fn test_invalid_values_rejected_without_write() {
    let (pool, registry) = initialized_registry().await;

    let result = registry.update("scanning.batch_window", "ten minutes").await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(raw_value(&pool, "scanning.batch_window").await.as_deref(), Some("600"));

    let result = registry.update("system.parallel_image_processing", "sometimes").await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let result = registry.update("ui.pagination_mode", "scroll").await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(raw_value(&pool, "ui.pagination_mode").await.as_deref(), Some("infinite"));
}

#[tokio::test]
async fn test_get_absent_key_is_none() {
    let (_pool, registry) = initialized_registry().await;
    assert_eq!(registry.get("no.such.key").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_before_initialize_is_none() {
    let pool = setup_test_db().await;
    let registry = registry_with(&pool, Catalog::builtin().unwrap());
    assert_eq!(registry.get("general.app_name").await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupt_int_is_cast_error() {
    let (pool, registry) = initialized_registry().await;
    sqlx::query("UPDATE system_settings SET value = 'abc' WHERE key = 'backup.retention_days'")
        .execute(&pool)
        .await
        .unwrap();

    let result = registry.get("backup.retention_days").await;
    match result {
        Err(Error::Cast { key, data_type, value }) => {
            assert_eq!(key, "backup.retention_days");
            assert_eq!(data_type, "int");
            assert_eq!(value, "abc");
        }
        other => panic!("Expected cast error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_null_value_reads_as_absent() {
    let (pool, registry) = initialized_registry().await;
    sqlx::query("UPDATE system_settings SET value = NULL WHERE key = 'backup.retention_days'")
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(registry.get("backup.retention_days").await.unwrap(), None);

    let record = registry.get_record("backup.retention_days").await.unwrap().unwrap();
    assert_eq!(record.value, None);
    assert_eq!(record.data_type, DataType::Int);

    // One NULL row does not break the other readers
    let grouped = registry.get_all_grouped().await.unwrap();
    let json = serde_json::to_value(&grouped).unwrap();
    let backup = json["backup"].as_array().unwrap();
    let retention = backup
        .iter()
        .find(|r| r["key"] == "backup.retention_days")
        .unwrap();
    assert!(retention["value"].is_null());

    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.get("backup.retention_days"), None);
    assert_eq!(snapshot.get_int("scanning.batch_window"), Some(600));

    // Reconciliation leaves the value alone; an update sets it again
    registry.initialize_defaults().await.unwrap();
    assert_eq!(raw_value(&pool, "backup.retention_days").await, None);

    registry.update("backup.retention_days", 14_i64).await.unwrap();
    assert_eq!(
        registry.get("backup.retention_days").await.unwrap(),
        Some(SettingValue::Int(14))
    );
}

#[tokio::test]
async fn test_grouping_excludes_hidden_and_types_values() {
    let (pool, registry) = initialized_registry().await;
    sqlx::query(
        "INSERT INTO system_settings (key, value, category, data_type, is_hidden)
         VALUES ('internal.secret', 'x', 'general', 'string', 1)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let grouped = registry.get_all_grouped().await.unwrap();

    assert!(grouped.records().all(|r| !r.is_hidden));
    assert!(grouped.records().all(|r| r.key != "internal.secret"));
    assert_eq!(grouped.records().count(), registry.catalog().len());

    for record in grouped.records() {
        match record.data_type {
            DataType::Int => assert!(matches!(record.value, Some(SettingValue::Int(_)))),
            DataType::Bool => assert!(matches!(record.value, Some(SettingValue::Bool(_)))),
            DataType::String | DataType::Select => {
                assert!(matches!(record.value, Some(SettingValue::Str(_))))
            }
        }
    }

    // First-encounter order of the catalog
    let categories: Vec<&str> = grouped.categories().collect();
    assert_eq!(
        categories,
        vec!["general", "scanning", "appearance", "system", "backup", "server"]
    );

    // Dependent settings are returned, not hidden
    let appearance = grouped.get("appearance").unwrap();
    assert!(appearance.iter().any(|r| r.key == "ui.login_solid_color"));
}

#[tokio::test]
async fn test_grouped_json_shape() {
    let (_pool, registry) = initialized_registry().await;
    let grouped = registry.get_all_grouped().await.unwrap();

    let json = serde_json::to_value(&grouped).unwrap();
    let scanning = json["scanning"].as_array().unwrap();
    assert_eq!(scanning[0]["key"], "scanning.batch_window");
    assert_eq!(scanning[0]["value"], 600);

    let server = json["server"].as_array().unwrap();
    assert_eq!(server[0]["value"], false);
}

#[tokio::test]
async fn test_cache_observes_update_immediately() {
    let (_pool, registry) = initialized_registry().await;

    let before = registry.snapshot().await.unwrap();
    assert_eq!(before.get_str("ui.login_background_style"), Some("none"));

    let generation = registry.cache().generation();
    registry
        .update("ui.login_background_style", "solid_color")
        .await
        .unwrap();
    assert_eq!(registry.cache().generation(), generation + 1, "Exactly one invalidation");

    let after = registry.snapshot().await.unwrap();
    assert_eq!(after.get_str("ui.login_background_style"), Some("solid_color"));

    // The old snapshot is an immutable view
    assert_eq!(before.get_str("ui.login_background_style"), Some("none"));
}

#[tokio::test]
async fn test_cache_populated_before_seeding_is_refreshed() {
    let pool = setup_test_db().await;
    let registry = registry_with(&pool, Catalog::builtin().unwrap());

    assert!(registry.snapshot().await.unwrap().is_empty());

    registry.initialize_defaults().await.unwrap();

    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), registry.catalog().len());
}

#[tokio::test]
async fn test_is_active_tracks_parent_value() {
    let (_pool, registry) = initialized_registry().await;

    let solid = registry.get_record("ui.login_solid_color").await.unwrap().unwrap();
    let cover = registry.get_record("ui.login_static_cover").await.unwrap().unwrap();
    let name = registry.get_record("general.app_name").await.unwrap().unwrap();

    assert!(!registry.is_active(&solid).await.unwrap());
    assert!(registry.is_active(&name).await.unwrap());

    registry
        .update("ui.login_background_style", "solid_color")
        .await
        .unwrap();

    assert!(registry.is_active(&solid).await.unwrap());
    assert!(!registry.is_active(&cover).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_and_updates_converge() {
    let (_pool, registry) = initialized_registry().await;

    let mut tasks = Vec::new();
    for i in 0..8_i64 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                registry.update("backup.retention_days", i).await.map(|_| ())
            } else {
                registry.snapshot().await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    registry.update("backup.retention_days", 99_i64).await.unwrap();
    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.get_int("backup.retention_days"), Some(99));
}
