//! # trackexport-core
//!
//! Core domain model and traits for the trackexport status history engine.
//!
//! This crate provides:
//! - Domain types: `Item`, `HistoryEntry`, `StatusChange`, `DailySnapshot`, `DateRange`
//! - The status decode table: `StatusSchema`
//! - Item table columns and display-value decoding
//! - Core traits: `HistorySource`, `Renderer`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trackexport_core::{DateRange, Item, StatusCategory, StatusSchema};
//!
//! let item = Item::new("1042", "hist-1042");
//! assert_eq!(item.history_key, "hist-1042");
//!
//! let schema = StatusSchema::default();
//! assert_eq!(schema.decode(3), Some(StatusCategory::InProgress));
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(range.len(), 7);
//! ```

pub mod columns;
pub mod status;

pub use columns::{
    BuiltinColumn, Column, ColumnError, CustomColumn, CustomColumnKind, DropListItem, ItemTable,
    ResourceDirectory, ALL_PROJECT_MEMBERS, UNKNOWN_DROPLIST_VALUE,
};
pub use status::{DailySnapshot, StatusCategory, StatusCounts};

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for an item
pub type ItemId = String;

/// Key used to request an item's change history from the server
pub type HistoryKey = String;

// ============================================================================
// Items and History
// ============================================================================

/// A tracked work item
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Identifier reported in errors and logs
    pub id: ItemId,
    /// Originating identifier the history is stored under
    pub history_key: HistoryKey,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, history_key: impl Into<HistoryKey>) -> Self {
        Self {
            id: id.into(),
            history_key: history_key.into(),
        }
    }
}

/// Kind of a recorded history event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    FieldCreated,
    FieldChanged,
    FieldDeleted,
    /// Comments, attachments and anything else the server records
    #[serde(other)]
    Other,
}

/// One entry of an item's raw change history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Field the event applies to
    pub field_id: u32,
    pub kind: HistoryEventKind,
    pub time: DateTime<Utc>,
    /// Recorded value; `None` when the event carries no data
    #[serde(default)]
    pub value: Option<i64>,
}

impl HistoryEntry {
    pub fn new(field_id: u32, kind: HistoryEventKind, time: DateTime<Utc>, value: Option<i64>) -> Self {
        Self {
            field_id,
            kind,
            time,
            value,
        }
    }
}

/// Unsorted change history of one item, in the order the server returned it
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHistory {
    pub entries: Vec<HistoryEntry>,
}

impl From<Vec<HistoryEntry>> for RawHistory {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }
}

/// A recorded status transition of one item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub item: ItemId,
    pub time: DateTime<Utc>,
    pub to: StatusCategory,
    /// Position of the source entry in the item's raw history
    pub seq: usize,
}

// ============================================================================
// Status Schema
// ============================================================================

/// Field id of the status column in the default server schema
pub const DEFAULT_STATUS_FIELD_ID: u32 = 15;

/// Decode table for recorded status values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSchema {
    /// Field id identifying status-change history entries
    pub field_id: u32,
    values: BTreeMap<i64, StatusCategory>,
}

impl Default for StatusSchema {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_FIELD_ID)
            .with_value(2, StatusCategory::NotDone)
            .with_value(3, StatusCategory::InProgress)
            .with_value(4, StatusCategory::Completed)
            .with_value(5, StatusCategory::Blocked)
            .with_value(6, StatusCategory::Deleted)
    }
}

impl StatusSchema {
    /// An empty decode table for `field_id`
    pub fn new(field_id: u32) -> Self {
        Self {
            field_id,
            values: BTreeMap::new(),
        }
    }

    /// Map a raw value to a category. Mappings to `Unset` are ignored.
    pub fn with_value(mut self, raw: i64, category: StatusCategory) -> Self {
        if category.is_counted() {
            self.values.insert(raw, category);
        }
        self
    }

    /// Decode a recorded value, `None` if it is outside the table
    pub fn decode(&self, raw: i64) -> Option<StatusCategory> {
        self.values.get(&raw).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = (i64, StatusCategory)> + '_ {
        self.values.iter().map(|(raw, category)| (*raw, *category))
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive calendar-day window `[first, last]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    first: NaiveDate,
    last: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `first > last`
    pub fn new(first: NaiveDate, last: NaiveDate) -> Result<Self, ExportError> {
        if first > last {
            return Err(ExportError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    /// Number of days in the range
    pub fn len(&self) -> usize {
        (self.last - self.first).num_days() as usize + 1
    }

    /// Always false; a valid range holds at least one day
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.first <= day && day <= self.last
    }

    /// Every day of the range in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last;
        self.first.iter_days().take_while(move |day| *day <= last)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.first, self.last)
    }
}

// ============================================================================
// Report
// ============================================================================

/// Everything a renderer needs to produce an export
#[derive(Clone, Debug, Serialize)]
pub struct ExportReport {
    /// Project or query name shown in the output
    pub title: String,
    /// Status columns in presentation order
    pub status_columns: Vec<StatusCategory>,
    /// One snapshot per day, ascending
    pub snapshots: Vec<DailySnapshot>,
    /// Optional per-item table
    pub items: Option<ItemTable>,
}

impl ExportReport {
    pub fn new(title: impl Into<String>, snapshots: Vec<DailySnapshot>) -> Self {
        Self {
            title: title.into(),
            status_columns: StatusCategory::COUNTED.to_vec(),
            snapshots,
            items: None,
        }
    }

    /// Set the status column order
    pub fn columns(mut self, columns: Vec<StatusCategory>) -> Self {
        self.status_columns = columns;
        self
    }

    /// Attach an item table
    pub fn with_items(mut self, items: ItemTable) -> Self {
        self.items = Some(items);
        self
    }
}

/// Check a status column order: no `Unset`, no duplicates, not empty
pub fn validate_status_columns(columns: &[StatusCategory]) -> Result<(), String> {
    if columns.is_empty() {
        return Err("at least one status column is required".into());
    }
    for (index, column) in columns.iter().enumerate() {
        if !column.is_counted() {
            return Err(format!("'{}' cannot be used as a report column", column));
        }
        if columns[..index].contains(column) {
            return Err(format!("status column '{}' listed twice", column));
        }
    }
    Ok(())
}

// ============================================================================
// Traits
// ============================================================================

/// Remote store of item change histories
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Request the history stored under `key`.
    ///
    /// `Ok(None)` means the server has not made the history available yet
    /// and the request may be repeated.
    async fn fetch_history(&self, key: &HistoryKey) -> Result<Option<RawHistory>, SourceError>;
}

/// Output rendering
pub trait Renderer {
    type Output;

    /// Render an export report to the output format
    fn render(&self, report: &ExportReport) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Hard failure reported by a history source
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Export error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("History of item {item} not available after {attempts} attempts")]
    FetchTimeout { item: ItemId, attempts: u32 },

    #[error("Invalid date range: first day {first} is after last day {last}")]
    InvalidRange { first: NaiveDate, last: NaiveDate },

    #[error("Item {item} has unknown status value {raw_value}")]
    Decode { item: ItemId, raw_value: i64 },

    #[error("Fetching history of item {item} failed: {message}")]
    Source { item: ItemId, message: String },

    #[error("Export cancelled while fetching item {item}")]
    Cancelled { item: ItemId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
