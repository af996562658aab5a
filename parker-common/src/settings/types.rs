//! Setting definitions, records and typed values
//!
//! Settings are persisted as raw strings next to a type tag. Everything above
//! the persistence boundary works with [`SettingValue`]; the string form only
//! exists in the `system_settings` table.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw strings accepted as `true` when casting a bool setting
const TRUTHY: [&str; 4] = ["true", "1", "t", "yes"];

/// Raw strings accepted as `false` when writing a bool setting
const FALSY: [&str; 4] = ["false", "0", "f", "no"];

/// Declared type of a setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Bool,
    Select,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Select => "select",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(DataType::String),
            "int" => Ok(DataType::Int),
            "bool" => Ok(DataType::Bool),
            "select" => Ok(DataType::Select),
            other => Err(Error::InvalidInput(format!("Unknown setting data type: {}", other))),
        }
    }
}

/// One choice of a `select` setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingOption {
    pub label: String,
    pub value: String,
    /// Optional heading used to group long dropdowns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One-hop visibility dependency: the owning setting is only relevant while
/// setting `key` currently equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    pub key: String,
    pub value: String,
}

impl DependsOn {
    /// True when `current` (the cast value of the parent setting) matches
    pub fn is_satisfied_by(&self, current: Option<&SettingValue>) -> bool {
        current.is_some_and(|value| value.to_string() == self.value)
    }
}

/// Catalog entry describing one known setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub key: String,
    pub default_value: String,
    pub data_type: DataType,
    pub category: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<SettingOption>>,
    #[serde(default)]
    pub depends_on: Option<DependsOn>,
}

impl SettingDefinition {
    /// True when `value` names one of this definition's options.
    /// Definitions without options accept anything.
    pub fn allows_option(&self, value: &str) -> bool {
        match &self.options {
            Some(options) if !options.is_empty() => options.iter().any(|o| o.value == value),
            _ => true,
        }
    }
}

/// Typed setting value
///
/// Serializes as a bare JSON string, number or boolean. Deserialization tries
/// bool, then integer, then string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    /// Cast a raw stored string according to its declared type
    ///
    /// `int` must parse as an integer; anything else is a [`Error::Cast`].
    /// `bool` is true for `true`, `1`, `t` or `yes` (any case) and false otherwise.
    pub fn cast(key: &str, raw: &str, data_type: DataType) -> Result<Self> {
        match data_type {
            DataType::Int => raw.trim().parse::<i64>().map(SettingValue::Int).map_err(|_| Error::Cast {
                key: key.to_string(),
                data_type: data_type.to_string(),
                value: raw.to_string(),
            }),
            DataType::Bool => Ok(SettingValue::Bool(TRUTHY.contains(&raw.to_lowercase().as_str()))),
            DataType::String | DataType::Select => Ok(SettingValue::Str(raw.to_string())),
        }
    }

    /// Serialize for storage in a setting of type `data_type`
    ///
    /// Bools are stored as lowercase `true`/`false`; everything else as its
    /// plain string form. Values that could not be cast back (a non-integer
    /// for an `int` setting, an unrecognized word for a `bool` setting) are
    /// rejected with [`Error::InvalidInput`].
    pub fn to_raw(&self, key: &str, data_type: DataType) -> Result<String> {
        match (data_type, self) {
            (DataType::Bool, SettingValue::Bool(b)) => Ok(b.to_string()),
            (DataType::Bool, SettingValue::Int(i @ (0 | 1))) => Ok((*i == 1).to_string()),
            (DataType::Bool, SettingValue::Str(s)) => {
                let lowered = s.trim().to_lowercase();
                if TRUTHY.contains(&lowered.as_str()) {
                    Ok("true".to_string())
                } else if FALSY.contains(&lowered.as_str()) {
                    Ok("false".to_string())
                } else {
                    Err(Error::InvalidInput(format!(
                        "Setting '{}' expects a boolean, got {:?}",
                        key, s
                    )))
                }
            }
            (DataType::Int, SettingValue::Int(i)) => Ok(i.to_string()),
            (DataType::Int, SettingValue::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(|i| i.to_string())
                .map_err(|_| {
                    Error::InvalidInput(format!("Setting '{}' expects an integer, got {:?}", key, s))
                }),
            (DataType::String | DataType::Select, value) => Ok(value.to_string()),
            (expected, value) => Err(Error::InvalidInput(format!(
                "Setting '{}' expects a {} value, got {}",
                key, expected, value
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Str(value)
    }
}

/// Persisted setting with its value already cast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRecord {
    pub key: String,
    /// `None` when the stored value is NULL
    pub value: Option<SettingValue>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub data_type: DataType,
    pub options: Option<Vec<SettingOption>>,
    pub depends_on: Option<DependsOn>,
    pub is_hidden: bool,
}
