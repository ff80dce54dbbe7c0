//! Status categories and daily status counts
//!
//! This module provides the value types the aggregation engine produces.
//! A daily snapshot answers the question: "How many items were in each
//! status at the end of this day?"
//!
//! # Core Concepts
//!
//! - **StatusCategory**: the closed set of lifecycle states an item can hold
//! - **StatusCounts**: one counter per counted category
//! - **DailySnapshot**: the counts as of the end of one calendar day
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trackexport_core::status::{DailySnapshot, StatusCategory, StatusCounts};
//!
//! let mut counts = StatusCounts::default();
//! counts.increment(StatusCategory::InProgress);
//! counts.increment(StatusCategory::Blocked);
//!
//! let snapshot = DailySnapshot::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(), counts);
//! assert_eq!(snapshot.counts.get(StatusCategory::InProgress), 1);
//! assert_eq!(snapshot.counts.total(), 2);
//! ```

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// Lifecycle state of a work item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Blocked,
    Completed,
    Deleted,
    InProgress,
    NotDone,
    /// State of every item before its first recorded change. Never counted.
    #[default]
    Unset,
}

impl StatusCategory {
    /// The five categories that appear in snapshots, in default column order
    pub const COUNTED: [StatusCategory; 5] = [
        StatusCategory::Blocked,
        StatusCategory::Completed,
        StatusCategory::Deleted,
        StatusCategory::InProgress,
        StatusCategory::NotDone,
    ];

    /// Get the display string for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Blocked => "Blocked",
            StatusCategory::Completed => "Completed",
            StatusCategory::Deleted => "Deleted",
            StatusCategory::InProgress => "In Progress",
            StatusCategory::NotDone => "Not Done",
            StatusCategory::Unset => "Unset",
        }
    }

    /// Whether items in this category contribute to snapshot counts
    pub fn is_counted(&self) -> bool {
        !matches!(self, StatusCategory::Unset)
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a status name cannot be parsed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status category: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for StatusCategory {
    type Err = UnknownStatus;

    /// Accepts `in_progress`, `in-progress`, `InProgress` and `In Progress`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "blocked" => Ok(StatusCategory::Blocked),
            "completed" => Ok(StatusCategory::Completed),
            "deleted" => Ok(StatusCategory::Deleted),
            "inprogress" => Ok(StatusCategory::InProgress),
            "notdone" => Ok(StatusCategory::NotDone),
            "unset" => Ok(StatusCategory::Unset),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Number of items per counted status category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCounts {
    pub blocked: usize,
    pub completed: usize,
    pub deleted: usize,
    pub in_progress: usize,
    pub not_done: usize,
}

impl StatusCounts {
    /// Count for one category. `Unset` is never counted and always yields 0.
    pub fn get(&self, category: StatusCategory) -> usize {
        match category {
            StatusCategory::Blocked => self.blocked,
            StatusCategory::Completed => self.completed,
            StatusCategory::Deleted => self.deleted,
            StatusCategory::InProgress => self.in_progress,
            StatusCategory::NotDone => self.not_done,
            StatusCategory::Unset => 0,
        }
    }

    fn slot(&mut self, category: StatusCategory) -> Option<&mut usize> {
        match category {
            StatusCategory::Blocked => Some(&mut self.blocked),
            StatusCategory::Completed => Some(&mut self.completed),
            StatusCategory::Deleted => Some(&mut self.deleted),
            StatusCategory::InProgress => Some(&mut self.in_progress),
            StatusCategory::NotDone => Some(&mut self.not_done),
            StatusCategory::Unset => None,
        }
    }

    /// Add one item to `category` (no-op for `Unset`)
    pub fn increment(&mut self, category: StatusCategory) {
        if let Some(slot) = self.slot(category) {
            *slot += 1;
        }
    }

    /// Remove one item from `category` (no-op for `Unset`)
    pub fn decrement(&mut self, category: StatusCategory) {
        if let Some(slot) = self.slot(category) {
            *slot = slot.saturating_sub(1);
        }
    }

    /// Move one item between categories
    pub fn transition(&mut self, from: StatusCategory, to: StatusCategory) {
        self.decrement(from);
        self.increment(to);
    }

    /// Sum over all counted categories
    pub fn total(&self) -> usize {
        StatusCategory::COUNTED.iter().map(|c| self.get(*c)).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Status counts as of the end of one calendar day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub day: NaiveDate,
    pub counts: StatusCounts,
}

impl DailySnapshot {
    pub fn new(day: NaiveDate, counts: StatusCounts) -> Self {
        Self { day, counts }
    }

    /// An all-zero snapshot (no item had a recorded status yet)
    pub fn zero(day: NaiveDate) -> Self {
        Self::new(day, StatusCounts::default())
    }

    /// Copy of this snapshot's counts dated `day`
    pub fn carried_to(&self, day: NaiveDate) -> Self {
        Self::new(day, self.counts)
    }

    /// Counts in the given column order
    pub fn values(&self, columns: &[StatusCategory]) -> Vec<usize> {
        columns.iter().map(|c| self.counts.get(*c)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
