//! Built-in settings catalog
//!
//! The catalog is the compiled-in list of every known setting. It lives in
//! `catalog.json` next to this file and is validated when loaded, so a broken
//! entry stops the server at startup instead of surfacing in the admin UI.

use super::types::{DataType, SettingDefinition, SettingValue};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Catalog content shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("catalog.json");

/// Validated, ordered set of setting definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<SettingDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load the catalog embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<SettingDefinition> = serde_json::from_str(json)
            .map_err(|e| Error::Catalog(format!("Invalid catalog JSON: {}", e)))?;
        Self::new(definitions)
    }

    /// Build a catalog from definitions, rejecting inconsistent content
    ///
    /// # Errors
    /// [`Error::Catalog`] on duplicate keys, defaults that do not fit their
    /// type or options, dependencies on unknown keys, and dependency cycles.
    pub fn new(definitions: Vec<SettingDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if index.insert(definition.key.clone(), position).is_some() {
                return Err(Error::Catalog(format!(
                    "Duplicate setting key: {}",
                    definition.key
                )));
            }
        }

        let catalog = Self { definitions, index };
        for definition in &catalog.definitions {
            catalog.validate_default(definition)?;
            catalog.validate_dependency(definition)?;
        }
        catalog.validate_acyclic()?;

        Ok(catalog)
    }

    pub fn definitions(&self) -> &[SettingDefinition] {
        &self.definitions
    }

    pub fn get(&self, key: &str) -> Option<&SettingDefinition> {
        self.index.get(key).map(|&i| &self.definitions[i])
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn validate_default(&self, definition: &SettingDefinition) -> Result<()> {
        let key = &definition.key;
        let default = SettingValue::from(definition.default_value.as_str());

        match definition.data_type {
            DataType::Int | DataType::Bool => {
                default.to_raw(key, definition.data_type).map_err(|_| {
                    Error::Catalog(format!(
                        "Default {:?} of '{}' is not a valid {} value",
                        definition.default_value, key, definition.data_type
                    ))
                })?;
            }
            DataType::Select => {
                let has_options = definition.options.as_ref().is_some_and(|o| !o.is_empty());
                if !has_options {
                    return Err(Error::Catalog(format!(
                        "Select setting '{}' declares no options",
                        key
                    )));
                }
                if !definition.allows_option(&definition.default_value) {
                    return Err(Error::Catalog(format!(
                        "Default {:?} of '{}' is not one of its options",
                        definition.default_value, key
                    )));
                }
            }
            DataType::String => {}
        }

        Ok(())
    }

    fn validate_dependency(&self, definition: &SettingDefinition) -> Result<()> {
        let Some(dep) = &definition.depends_on else {
            return Ok(());
        };

        let Some(parent) = self.get(&dep.key) else {
            return Err(Error::Catalog(format!(
                "'{}' depends on unknown setting '{}'",
                definition.key, dep.key
            )));
        };

        if parent.data_type == DataType::Select && !parent.allows_option(&dep.value) {
            return Err(Error::Catalog(format!(
                "'{}' depends on '{}' = {:?}, which is not one of its options",
                definition.key, dep.key, dep.value
            )));
        }

        Ok(())
    }

    /// Each definition has at most one outgoing edge, so following the chain
    /// from every node finds any cycle.
    fn validate_acyclic(&self) -> Result<()> {
        for definition in &self.definitions {
            let mut seen = HashSet::new();
            seen.insert(definition.key.as_str());

            let mut current = definition;
            while let Some(dep) = &current.depends_on {
                if !seen.insert(dep.key.as_str()) {
                    return Err(Error::Catalog(format!(
                        "Dependency cycle through '{}'",
                        definition.key
                    )));
                }
                match self.get(&dep.key) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }

        Ok(())
    }
}
