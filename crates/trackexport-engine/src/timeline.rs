//! Timeline merging and daily aggregation
//!
//! Per-item transitions are merged into one time-ordered stream, which is
//! then swept once, day by day, to produce end-of-day status counts.
//!
//! ## Ordering
//!
//! Events are ordered by timestamp. Exactly equal timestamps keep batch
//! order (the item's position in the request) and then source order within
//! the item, so the sweep is reproducible: of two same-instant transitions
//! of one item, the one recorded later in its history wins.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate};
use trackexport_core::{DailySnapshot, Item, StatusCategory, StatusChange, StatusCounts};

/// Merge per-item change lists into a single stream ordered by timestamp.
///
/// `per_item` is expected in batch order; the sort is stable.
pub fn merge_timelines(per_item: Vec<Vec<StatusChange>>) -> Vec<StatusChange> {
    let mut merged: Vec<StatusChange> = per_item.into_iter().flatten().collect();
    merged.sort_by_key(|change| change.time);
    merged
}

/// Calendar day of a change, seen from `offset`
pub fn day_of(change: &StatusChange, offset: FixedOffset) -> NaiveDate {
    change.time.with_timezone(&offset).date_naive()
}

/// Inclusive span of days covered by a merged timeline, `None` when empty
pub fn observed_span(timeline: &[StatusChange], offset: FixedOffset) -> Option<(NaiveDate, NaiveDate)> {
    let first = timeline.first()?;
    let last = timeline.last()?;
    Some((day_of(first, offset), day_of(last, offset)))
}

/// Sweep a merged timeline into one snapshot per day of its span.
///
/// Every item starts `Unset`. For each day all events dated that day are
/// applied before the day's snapshot is taken, so a transition on day D is
/// visible from D's snapshot on. Events for items outside `items` are
/// skipped. An empty timeline produces no snapshots. Item ids are expected
/// to be unique; `StatusHistoryEngine` rejects batches where they are not.
pub fn aggregate_daily(
    items: &[Item],
    timeline: &[StatusChange],
    offset: FixedOffset,
) -> Vec<DailySnapshot> {
    let Some((span_start, span_end)) = observed_span(timeline, offset) else {
        return Vec::new();
    };

    let mut current: HashMap<&str, StatusCategory> = items
        .iter()
        .map(|item| (item.id.as_str(), StatusCategory::Unset))
        .collect();
    let mut counts = StatusCounts::default();
    let mut snapshots = Vec::with_capacity((span_end - span_start).num_days() as usize + 1);
    let mut cursor = 0;

    for day in span_start.iter_days().take_while(|day| *day <= span_end) {
        while let Some(change) = timeline.get(cursor) {
            if day_of(change, offset) > day {
                break;
            }
            cursor += 1;

            match current.get_mut(change.item.as_str()) {
                Some(status) => {
                    counts.transition(*status, change.to);
                    *status = change.to;
                }
                None => {
                    tracing::warn!(item = %change.item, "status change for item outside the batch, skipped");
                }
            }
        }
        snapshots.push(DailySnapshot::new(day, counts));
    }

    snapshots
}
