//! Structural properties of aggregated and padded reports
//!
//! Runs a deterministic pseudo-random batch through extraction, merging,
//! aggregation and padding, then checks the invariants every report must
//! satisfy regardless of input.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use trackexport_core::{
    DailySnapshot, HistoryEntry, HistoryEventKind, Item, RawHistory, StatusCategory, StatusChange,
    StatusSchema, DEFAULT_STATUS_FIELD_ID,
};
use trackexport_engine::{aggregate_daily, extract_status_changes, merge_timelines, pad};

/// Linear congruential generator, good enough for fixture shuffling
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// 40 items; some have no history, the rest 1..=6 status changes over 30 days
fn generated_batch(seed: u64) -> (Vec<Item>, Vec<Vec<StatusChange>>) {
    let mut rng = Lcg(seed);
    let schema = StatusSchema::default();
    let mut items = Vec::new();
    let mut per_item = Vec::new();

    for n in 0..40 {
        let item = Item::new(format!("T{n}"), format!("h{n}"));
        let events = rng.next(7);
        let entries: Vec<HistoryEntry> = (0..events)
            .map(|_| {
                let offset = Duration::minutes(rng.next(30 * 24 * 60) as i64);
                let value = 2 + rng.next(5) as i64;
                HistoryEntry::new(
                    DEFAULT_STATUS_FIELD_ID,
                    HistoryEventKind::FieldChanged,
                    start() + offset,
                    Some(value),
                )
            })
            .collect();
        let changes = extract_status_changes(&item, &RawHistory::from(entries), &schema).unwrap();
        items.push(item);
        per_item.push(changes);
    }

    (items, per_item)
}

/// Status of every item at the end of `day`, replaying the raw changes directly
fn replay(per_item: &[Vec<StatusChange>], day: NaiveDate) -> HashMap<String, StatusCategory> {
    let mut state = HashMap::new();
    for changes in per_item {
        let mut ordered: Vec<&StatusChange> = changes.iter().collect();
        ordered.sort_by_key(|c| (c.time, c.seq));
        for change in ordered {
            if change.time.date_naive() <= day {
                state.insert(change.item.clone(), change.to);
            }
        }
    }
    state
}

#[test]
fn counts_partition_items_seen_so_far() {
    for seed in [1, 7, 42, 1234] {
        let (items, per_item) = generated_batch(seed);
        let timeline = merge_timelines(per_item.clone());
        let snapshots = aggregate_daily(&items, &timeline, utc());

        for snapshot in &snapshots {
            let expected = replay(&per_item, snapshot.day);
            assert_eq!(snapshot.counts.total(), expected.len(), "seed {seed} day {}", snapshot.day);
        }
    }
}

#[test]
fn transitions_are_visible_from_their_day_on() {
    for seed in [3, 99] {
        let (items, per_item) = generated_batch(seed);
        let timeline = merge_timelines(per_item.clone());
        let snapshots = aggregate_daily(&items, &timeline, utc());

        for snapshot in &snapshots {
            let expected = replay(&per_item, snapshot.day);
            for category in StatusCategory::COUNTED {
                let in_category = expected.values().filter(|c| **c == category).count();
                assert_eq!(
                    snapshot.counts.get(category),
                    in_category,
                    "seed {seed} day {} category {category}",
                    snapshot.day
                );
            }
        }
    }
}

#[test]
fn padding_yields_one_entry_per_day() {
    let (items, per_item) = generated_batch(5);
    let snapshots = aggregate_daily(&items, &merge_timelines(per_item), utc());

    let first = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    for extra in [0, 1, 15, 60] {
        let last = first + Duration::days(extra);
        let padded = pad(&snapshots, first, last).unwrap();

        assert_eq!(padded.len(), extra as usize + 1);
        let days: Vec<NaiveDate> = padded.iter().map(|s| s.day).collect();
        let expected: Vec<NaiveDate> = first.iter_days().take(extra as usize + 1).collect();
        assert_eq!(days, expected);
    }
}

#[test]
fn days_after_span_repeat_the_last_snapshot() {
    let (items, per_item) = generated_batch(11);
    let snapshots = aggregate_daily(&items, &merge_timelines(per_item), utc());
    let last_observed: DailySnapshot = *snapshots.last().unwrap();

    let first = last_observed.day + Duration::days(1);
    let padded = pad(&snapshots, first, first + Duration::days(9)).unwrap();

    assert!(padded.iter().all(|s| s.counts == last_observed.counts));
}

#[test]
fn days_before_span_are_zero() {
    let (items, per_item) = generated_batch(13);
    let snapshots = aggregate_daily(&items, &merge_timelines(per_item), utc());
    let first_observed = snapshots.first().unwrap().day;

    let padded = pad(
        &snapshots,
        first_observed - Duration::days(10),
        first_observed - Duration::days(1),
    )
    .unwrap();

    assert_eq!(padded.len(), 10);
    assert!(padded.iter().all(|s| s.counts.is_zero()));
}
