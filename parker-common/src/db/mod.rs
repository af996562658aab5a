//! Database schema and queries

pub mod init;
pub mod migrations;
pub mod settings;

pub use init::{create_schema, create_settings_table, init_database};
pub use migrations::{run_migrations, CURRENT_SCHEMA_VERSION};
