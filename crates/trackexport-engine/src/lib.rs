//! # trackexport-engine
//!
//! Status history aggregation: turns sparse per-item status transitions
//! into a dense day-by-day count of items per status category.
//!
//! This crate provides:
//! - History fetching with polling, bounded concurrency and cancellation
//! - Status event extraction from raw histories
//! - Timeline merging and the daily sweep
//! - Padding of the result to a requested date range
//!
//! The stages run in that order for every export:
//!
//! ```text
//! fetch_all -> extract_status_changes -> merge_timelines -> aggregate_daily -> pad
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use trackexport_core::{DateRange, Item};
//! use trackexport_engine::StatusHistoryEngine;
//!
//! let engine = StatusHistoryEngine::new();
//! let items = vec![Item::new("1042", "hist-1042")];
//! let range = DateRange::new(first, last)?;
//! let snapshots = engine
//!     .daily_report(&source, &items, Some(range), &CancellationToken::new())
//!     .await?;
//! ```

pub mod extract;
pub mod fetch;
pub mod pad;
pub mod timeline;

pub use extract::extract_status_changes;
pub use fetch::{fetch_all, fetch_history, FetchPolicy};
pub use pad::{pad, pad_to_range};
pub use timeline::{aggregate_daily, merge_timelines, observed_span};

use std::collections::HashSet;

use chrono::{FixedOffset, Offset, Utc};
use tokio_util::sync::CancellationToken;
use trackexport_core::{
    DailySnapshot, DateRange, ExportError, HistorySource, Item, StatusChange, StatusSchema,
};

/// Daily status report pipeline
#[derive(Clone, Debug)]
pub struct StatusHistoryEngine {
    /// Decode table for status history entries
    pub schema: StatusSchema,
    /// Retry budget and parallelism for history fetches
    pub policy: FetchPolicy,
    /// Offset used to assign events to calendar days
    pub utc_offset: FixedOffset,
}

impl Default for StatusHistoryEngine {
    fn default() -> Self {
        Self {
            schema: StatusSchema::default(),
            policy: FetchPolicy::default(),
            utc_offset: Utc.fix(),
        }
    }
}

impl StatusHistoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status decode table
    pub fn schema(mut self, schema: StatusSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the fetch policy
    pub fn policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the offset used for calendar-day bucketing
    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Fetch, extract and merge the status timeline of `items`.
    ///
    /// Item ids must be unique within the batch.
    pub async fn timeline<S>(
        &self,
        source: &S,
        items: &[Item],
        cancel: &CancellationToken,
    ) -> Result<Vec<StatusChange>, ExportError>
    where
        S: HistorySource + ?Sized,
    {
        check_unique_ids(items)?;
        let histories = fetch_all(source, items, &self.policy, cancel).await?;
        tracing::info!(items = histories.len(), "fetched item histories");

        let per_item = histories
            .iter()
            .map(|(item, history)| extract_status_changes(item, history, &self.schema))
            .collect::<Result<Vec<_>, _>>()?;

        let timeline = merge_timelines(per_item);
        tracing::info!(events = timeline.len(), "merged status timeline");
        Ok(timeline)
    }

    /// Build the daily status report for `items`.
    ///
    /// With a `range`, the result covers exactly that window. Without one it
    /// covers the observed span, which is empty when no item has a recorded
    /// status change. An empty batch is not an error.
    pub async fn daily_report<S>(
        &self,
        source: &S,
        items: &[Item],
        range: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DailySnapshot>, ExportError>
    where
        S: HistorySource + ?Sized,
    {
        if items.is_empty() {
            tracing::info!("no items in batch");
        }

        let timeline = self.timeline(source, items, cancel).await?;
        let snapshots = aggregate_daily(items, &timeline, self.utc_offset);
        if let Some((start, end)) = observed_span(&timeline, self.utc_offset) {
            tracing::info!(%start, %end, days = snapshots.len(), "aggregated observed span");
        }

        Ok(match range {
            Some(range) => {
                let padded = pad_to_range(&snapshots, range);
                tracing::info!(%range, days = padded.len(), "padded to requested range");
                padded
            }
            None => snapshots,
        })
    }
}

/// Per-item state is keyed by id, so a repeated id would be counted once
fn check_unique_ids(items: &[Item]) -> Result<(), ExportError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(ExportError::InvalidConfig(format!(
                "item {} appears more than once in the batch",
                item.id
            )));
        }
    }
    Ok(())
}
