//! Range padding
//!
//! Fits the aggregated snapshots to a requested `[first, last]` window:
//! days before the observed span are zero-filled, days inside it pass
//! through, and days after it repeat the last observed counts.

use chrono::NaiveDate;
use trackexport_core::{DailySnapshot, DateRange, ExportError};

/// Pad or truncate `snapshots` to exactly `[first, last]`.
///
/// `snapshots` must be ascending by day. Rejects `first > last` with
/// `InvalidRange`.
pub fn pad(
    snapshots: &[DailySnapshot],
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<DailySnapshot>, ExportError> {
    let range = DateRange::new(first, last)?;
    Ok(pad_to_range(snapshots, range))
}

/// Pad or truncate `snapshots` to `range`, one entry per day.
pub fn pad_to_range(snapshots: &[DailySnapshot], range: DateRange) -> Vec<DailySnapshot> {
    range
        .days()
        .map(|day| snapshot_for(snapshots, day))
        .collect()
}

/// Snapshot describing `day`: the one recorded for it, else the latest one
/// before it carried forward, else zero.
fn snapshot_for(snapshots: &[DailySnapshot], day: NaiveDate) -> DailySnapshot {
    match snapshots.binary_search_by_key(&day, |s| s.day) {
        Ok(index) => snapshots[index],
        Err(0) => DailySnapshot::zero(day),
        Err(index) => snapshots[index - 1].carried_to(day),
    }
}
