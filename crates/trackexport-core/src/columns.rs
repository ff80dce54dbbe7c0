//! Item table columns and display-value decoding
//!
//! The item table lists one row per exported item and one column per active
//! project column. Builtin columns arrive as display text; custom columns
//! arrive as raw stored values that need decoding.
//!
//! # Raw value formats
//!
//! | Kind | Raw value | Display |
//! |------|-----------|---------|
//! | Text | any | verbatim |
//! | DropList | `"3"` | name of drop-list item 3, `"Unknown"` if absent |
//! | MultiSelectionDropList | `"1;3"` | `"Low, High"` |
//! | Date | microseconds since epoch | `2026-02-10` |
//! | DateTime | microseconds since epoch | `2026-02-10 14:30:00` |
//! | Resources | `"all;user:7;group:2"` | `"All Project Members, Jim, QA"` |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display text for a drop-list id with no matching entry
pub const UNKNOWN_DROPLIST_VALUE: &str = "Unknown";

/// Display text for a resource reference covering the whole project
pub const ALL_PROJECT_MEMBERS: &str = "All Project Members";

/// Separator between multiple raw values
const RAW_SEPARATOR: char = ';';

/// Separator between multiple display values
const DISPLAY_SEPARATOR: &str = ", ";

// ============================================================================
// Column Model
// ============================================================================

/// An active project column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    Builtin(BuiltinColumn),
    Custom(CustomColumn),
}

impl Column {
    pub fn builtin(id: u32, name: impl Into<String>) -> Self {
        Column::Builtin(BuiltinColumn {
            id,
            name: name.into(),
        })
    }

    pub fn custom(name: impl Into<String>, kind: CustomColumnKind) -> Self {
        Column::Custom(CustomColumn {
            name: name.into(),
            kind,
        })
    }

    /// Header text, also the key under which item values are stored
    pub fn name(&self) -> &str {
        match self {
            Column::Builtin(c) => &c.name,
            Column::Custom(c) => &c.name,
        }
    }

    /// Decode a stored value into its display text
    pub fn display_value(
        &self,
        raw: &str,
        directory: &ResourceDirectory,
    ) -> Result<String, ColumnError> {
        match self {
            Column::Builtin(_) => Ok(raw.to_string()),
            Column::Custom(c) => c.display_value(raw, directory),
        }
    }
}

/// A column defined by the server itself (name, status, priority, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinColumn {
    pub id: u32,
    pub name: String,
}

/// A project-defined column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomColumn {
    pub name: String,
    #[serde(flatten)]
    pub kind: CustomColumnKind,
}

/// Value type of a custom column
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomColumnKind {
    #[default]
    Text,
    DropList {
        items: Vec<DropListItem>,
    },
    MultiSelectionDropList {
        items: Vec<DropListItem>,
    },
    Date,
    DateTime,
    Resources,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropListItem {
    pub id: i64,
    pub name: String,
}

impl CustomColumn {
    fn display_value(&self, raw: &str, directory: &ResourceDirectory) -> Result<String, ColumnError> {
        match &self.kind {
            CustomColumnKind::Text => Ok(raw.to_string()),
            CustomColumnKind::DropList { items } => self.decode_droplist(raw, items),
            CustomColumnKind::MultiSelectionDropList { items } => {
                if raw.is_empty() {
                    return Ok(String::new());
                }
                let names = raw
                    .split(RAW_SEPARATOR)
                    .map(|part| self.decode_droplist(part.trim(), items))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.join(DISPLAY_SEPARATOR))
            }
            CustomColumnKind::Date => self.decode_timestamp(raw, "%Y-%m-%d"),
            CustomColumnKind::DateTime => self.decode_timestamp(raw, "%Y-%m-%d %H:%M:%S"),
            CustomColumnKind::Resources => {
                if raw.is_empty() {
                    return Ok(String::new());
                }
                let names = raw
                    .split(RAW_SEPARATOR)
                    .map(|part| self.decode_resource(part.trim(), directory))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.join(DISPLAY_SEPARATOR))
            }
        }
    }

    fn decode_droplist(&self, raw: &str, items: &[DropListItem]) -> Result<String, ColumnError> {
        if raw.is_empty() {
            return Ok(String::new());
        }
        let id: i64 = raw.parse().map_err(|_| ColumnError::InvalidNumber {
            column: self.name.clone(),
            value: raw.to_string(),
        })?;
        Ok(items
            .iter()
            .find(|item| item.id == id)
            .map_or_else(|| UNKNOWN_DROPLIST_VALUE.to_string(), |item| item.name.clone()))
    }

    fn decode_timestamp(&self, raw: &str, pattern: &str) -> Result<String, ColumnError> {
        if raw.is_empty() {
            return Ok(String::new());
        }
        let micros: i64 = raw.parse().map_err(|_| ColumnError::InvalidNumber {
            column: self.name.clone(),
            value: raw.to_string(),
        })?;
        let time = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
            ColumnError::InvalidTimestamp {
                column: self.name.clone(),
                value: raw.to_string(),
            }
        })?;
        Ok(time.format(pattern).to_string())
    }

    fn decode_resource(&self, raw: &str, directory: &ResourceDirectory) -> Result<String, ColumnError> {
        let invalid = || ColumnError::InvalidResource {
            column: self.name.clone(),
            value: raw.to_string(),
        };
        if raw == "all" {
            return Ok(ALL_PROJECT_MEMBERS.to_string());
        }
        let (kind, id) = raw.split_once(':').ok_or_else(invalid)?;
        let name = match kind {
            "user" => directory.users.get(id),
            "group" => directory.groups.get(id),
            _ => return Err(invalid()),
        };
        Ok(name.cloned().unwrap_or_default())
    }
}

/// Names of users and user groups, keyed by their server id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDirectory {
    #[serde(default)]
    pub users: HashMap<String, String>,
    #[serde(default)]
    pub groups: HashMap<String, String>,
}

// ============================================================================
// Item Table
// ============================================================================

/// Decoded item rows ready for presentation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ItemTable {
    /// Build the table from column definitions and per-item stored values.
    ///
    /// Values are looked up by column name; a missing value renders empty.
    pub fn build<'a>(
        columns: &[Column],
        items: impl IntoIterator<Item = &'a HashMap<String, String>>,
        directory: &ResourceDirectory,
    ) -> Result<Self, ColumnError> {
        let headers = columns.iter().map(|c| c.name().to_string()).collect();
        let rows = items
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .map(|column| {
                        let raw = values.get(column.name()).map_or("", String::as_str);
                        column.display_value(raw, directory)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Stored column value that cannot be decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColumnError {
    #[error("Column '{column}': expected a number, got '{value}'")]
    InvalidNumber { column: String, value: String },

    #[error("Column '{column}': timestamp out of range: {value}")]
    InvalidTimestamp { column: String, value: String },

    #[error("Column '{column}': malformed resource reference '{value}'")]
    InvalidResource { column: String, value: String },
}

// ============================================================================
// Tests
// ============================================================================
