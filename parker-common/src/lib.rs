//! # Parker Common Library
//!
//! Shared code for the Parker comic library server:
//! - Bootstrap configuration and logging
//! - Database initialization and migrations
//! - Settings catalog, reconciliation, typed access and read cache
//! - Comic and collection queries
//! - Event description enrichment and seasonal login effects

pub mod collections;
pub mod comics;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod login_effects;
pub mod settings;

pub use error::{Error, Result};
pub use settings::{SettingValue, SettingsCache, SettingsRegistry};
