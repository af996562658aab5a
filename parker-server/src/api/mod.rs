//! HTTP API handlers for parker-server

pub mod admin;
pub mod collections;
pub mod comics;
pub mod events;
pub mod health;
pub mod login;
pub mod settings;

pub use admin::admin_routes;
pub use collections::collections_routes;
pub use comics::comics_routes;
pub use events::events_routes;
pub use health::health_routes;
pub use login::login_routes;
pub use settings::settings_routes;
