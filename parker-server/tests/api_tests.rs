//! Integration tests for parker-server API endpoints
//!
//! Each test builds the router over an in-memory database seeded by the
//! settings registry and drives it with `oneshot`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use parker_common::db::init::create_schema;
use parker_common::enrichment::EventDescriptions;
use parker_common::logging::{LogControl, LogLevel};
use parker_common::settings::{Catalog, SettingsCache, SettingsRegistry};
use parker_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

struct TestApp {
    router: Router,
    pool: SqlitePool,
    log_control: LogControl,
    log_dir: TempDir,
}

async fn setup_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    sqlx::query(
        r#"
        INSERT INTO series (id, name) VALUES (1, 'Watchmen');
        INSERT INTO volumes (id, series_id, volume_number) VALUES (1, 1, 1);
        INSERT INTO comics (id, volume_id, filename, file_path, page_count, number, title, year, writer, series_group)
            VALUES (1, 1, 'watchmen-01.cbz', '/library/watchmen-01.cbz', 32, '1', 'At Midnight, All the Agents', 1986, 'Alan Moore', 'DC Black Label');
        INSERT INTO locations (id, name) VALUES (1, 'New York');
        INSERT INTO comic_locations (comic_id, location_id) VALUES (1, 1);
        INSERT INTO collections (id, name) VALUES (1, 'DC Black Label');
        INSERT INTO collection_items (collection_id, comic_id) VALUES (1, 1);
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let catalog = Arc::new(Catalog::builtin().unwrap());
    let cache = Arc::new(SettingsCache::new(pool.clone()));
    let settings = SettingsRegistry::new(pool.clone(), catalog, cache);
    settings.initialize_defaults().await.unwrap();

    let events = EventDescriptions::from_json(
        r#"{"crisis on infinite earths": "The multiverse collapses into one."}"#,
    )
    .unwrap();

    let log_dir = TempDir::new().unwrap();
    let log_control = LogControl::detached(log_dir.path());

    let state = AppState::new(pool.clone(), settings, log_control.clone(), events);

    TestApp {
        router: build_router(state),
        pool,
        log_control,
        log_dir,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "parker-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_list_settings_grouped_and_typed() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/api/settings")).await;

    assert_eq!(status, StatusCode::OK);
    let groups = body.as_object().unwrap();
    assert!(groups.contains_key("general"));
    assert!(groups.contains_key("appearance"));

    let scanning = body["scanning"].as_array().unwrap();
    assert_eq!(scanning[0]["key"], "scanning.batch_window");
    assert_eq!(scanning[0]["value"], 600);
    assert_eq!(scanning[0]["data_type"], "int");

    let appearance = body["appearance"].as_array().unwrap();
    let solid = appearance
        .iter()
        .find(|s| s["key"] == "ui.login_solid_color")
        .unwrap();
    assert_eq!(solid["depends_on"]["key"], "ui.login_background_style");
    assert_eq!(solid["depends_on"]["value"], "solid_color");
    assert!(solid["options"].as_array().unwrap().len() > 80);
}

#[tokio::test]
async fn test_get_single_setting() {
    let app = setup_app().await;

    let (status, body) = send(&app, get("/api/settings/server.opds_enabled")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "server.opds_enabled", "value": false}));

    let (status, body) = send(&app, get("/api/settings/no.such.key")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_null_setting_value_renders_as_null() {
    let app = setup_app().await;
    sqlx::query("UPDATE system_settings SET value = NULL WHERE key = 'general.app_name'")
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, body) = send(&app, get("/api/settings/general.app_name")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["value"].is_null());

    let (status, body) = send(&app, get("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["general"][0]["value"].is_null());

    let (status, body) = send(&app, get("/api/admin/about")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["app_name"].is_null());

    let (status, body) = send(&app, get("/api/login/appearance?date=2025-07-01")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["app_name"].is_null());
}

#[tokio::test]
async fn test_update_setting_round_trip() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        put_json("/api/settings/server.opds_enabled", json!({"value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "server.opds_enabled");
    assert_eq!(body["value"], true);

    let (_, body) = send(&app, get("/api/settings/server.opds_enabled")).await;
    assert_eq!(body["value"], true);

    let raw: String =
        sqlx::query_scalar("SELECT value FROM system_settings WHERE key = 'server.opds_enabled'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(raw, "true");
}

#[tokio::test]
async fn test_update_unknown_setting_is_404() {
    let app = setup_app().await;
    let (status, body) = send(
        &app,
        put_json("/api/settings/does.not.exist", json!({"value": "1"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_invalid_value_is_400() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        put_json("/api/settings/backup.retention_days", json!({"value": "a week"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        put_json("/api/settings/ui.pagination_mode", json!({"value": "sideways"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/api/settings/backup.retention_days")).await;
    assert_eq!(body["value"], 7);
}

#[tokio::test]
async fn test_log_level_update_applies_to_logger() {
    let app = setup_app().await;
    assert_eq!(app.log_control.current_level(), LogLevel::Info);

    let (status, _) = send(
        &app,
        put_json("/api/settings/general.log_level", json!({"value": "DEBUG"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.log_control.current_level(), LogLevel::Debug);
}

// =============================================================================
// Comics and collections
// =============================================================================

#[tokio::test]
async fn test_list_comics() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/api/comics")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["comics"][0]["series"], "Watchmen");
    assert_eq!(body["comics"][0]["page_count"], 32);
}

#[tokio::test]
async fn test_get_comic_detail_and_404() {
    let app = setup_app().await;

    let (status, body) = send(&app, get("/api/comics/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["writer"], "Alan Moore");
    assert_eq!(body["locations"], json!(["New York"]));
    assert_eq!(body["characters"], json!([]));

    let (status, body) = send(&app, get("/api/comics/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_collections_with_counts() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/api/collections")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "DC Black Label");
    assert_eq!(body[0]["comic_count"], 1);
}

// =============================================================================
// Login appearance
// =============================================================================

#[tokio::test]
async fn test_login_appearance_uses_seasonal_priority() {
    let app = setup_app().await;

    let (status, body) = send(&app, get("/api/login/appearance?date=2025-10-31")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season"], "halloween");
    assert_eq!(body["effect"], "orange-hue");
    assert_eq!(body["app_name"], "Parker Comic Server");

    let (_, body) = send(&app, get("/api/login/appearance?date=2025-03-05")).await;
    assert!(body["effect"].is_null());
}

#[tokio::test]
async fn test_login_appearance_sees_setting_changes() {
    let app = setup_app().await;

    let (_, body) = send(&app, get("/api/login/appearance?date=2025-07-01")).await;
    assert_eq!(body["background_style"], "none");
    assert!(body["solid_color"].is_null());
    assert!(body["static_cover"].is_null());

    let (status, _) = send(
        &app,
        put_json(
            "/api/settings/ui.login_background_style",
            json!({"value": "solid_color"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/login/appearance?date=2025-07-01")).await;
    assert_eq!(body["background_style"], "solid_color");
    assert_eq!(body["solid_color"], "superman_classic");
    assert!(body["static_cover"].is_null());
}

// =============================================================================
// Event descriptions
// =============================================================================

#[tokio::test]
async fn test_event_description_lookup() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        get("/api/events/description?name=The%20Crisis%20on%20Infinite%20Earths"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "The multiverse collapses into one.");

    let (_, body) = send(
        &app,
        get("/api/events/description?name=%22Flash%22%20Crisis%20on%20Infinite%20Earths"),
    )
    .await;
    assert_eq!(body["description"], "The multiverse collapses into one.");

    let (_, body) = send(&app, get("/api/events/description?name=Secret%20Wars")).await;
    assert!(body["description"].is_null());

    let (status, _) = send(&app, get("/api/events/description?name=%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_about() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/api/admin/about")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_name"], "Parker Comic Server");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["platform"], std::env::consts::OS);
    assert_eq!(body["architecture"], std::env::consts::ARCH);
    assert_eq!(body["log_level"], "INFO");
}

#[tokio::test]
async fn test_log_download() {
    let app = setup_app().await;

    let (status, body) = send(&app, get("/api/admin/logs/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    std::fs::write(app.log_dir.path().join("parker.log"), "line one\nline two\n").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/admin/logs/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"parker.log\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"line one\nline two\n");
}
