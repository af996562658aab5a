//! Story-arc event descriptions
//!
//! Looks up a short description for a crossover event name in a curated
//! JSON table `{normalized name: description}`. The table is optional: when
//! the file is missing or broken the lookup simply finds nothing.

use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// In-memory event description table
#[derive(Debug, Clone, Default)]
pub struct EventDescriptions {
    entries: HashMap<String, String>,
}

impl EventDescriptions {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load the table from `path`, or an empty table if that fails
    pub fn load_or_empty(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                "Event descriptions not found at {}; descriptions unavailable",
                path.display()
            );
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(table) => {
                info!(
                    "Loaded {} event descriptions from {}",
                    table.len(),
                    path.display()
                );
                table
            }
            Err(e) => {
                warn!("Failed to load event descriptions: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Description for `event_name`, if any
    ///
    /// Tries the normalized name first. Names of the form `"Context" Event`
    /// fall back to the normalized text after the last quote.
    pub fn description_for(&self, event_name: &str) -> Option<&str> {
        if let Some(found) = self.entries.get(&normalize(event_name)) {
            return Some(found);
        }

        let parts: Vec<&str> = event_name.split('"').collect();
        if parts.len() >= 3 {
            let suffix = normalize(parts[parts.len() - 1].trim());
            return self.entries.get(&suffix).map(String::as_str);
        }

        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Matching key for an event name
///
/// Lowercases, drops a leading "the ", removes everything but ASCII letters,
/// digits and whitespace, then trims.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = lowered.strip_prefix("the ").unwrap_or(&lowered);
    stripped
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}
