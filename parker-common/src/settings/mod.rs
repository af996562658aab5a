//! Application settings: catalog, persisted records and the shared cache

pub mod cache;
pub mod catalog;
pub mod registry;
pub mod types;

pub use cache::{SettingsCache, SettingsSnapshot};
pub use catalog::Catalog;
pub use registry::{GroupedSettings, ReconcileReport, SettingsGroup, SettingsRegistry};
pub use types::{DataType, DependsOn, SettingDefinition, SettingOption, SettingRecord, SettingValue};

/// Keys the server reads directly
pub mod keys {
    pub const APP_NAME: &str = "general.app_name";
    pub const LOG_LEVEL: &str = "general.log_level";
    pub const LOGIN_BACKGROUND_STYLE: &str = "ui.login_background_style";
    pub const LOGIN_SOLID_COLOR: &str = "ui.login_solid_color";
    pub const LOGIN_STATIC_COVER: &str = "ui.login_static_cover";
}
