//! Lookups over `metrics_util` debugging snapshots.

use metrics::{SharedString, Unit};
use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, Snapshotter},
};

/// Entries of one snapshot.
pub type SnapshotEntries = Vec<(CompositeKey, Option<Unit>, Option<SharedString>, DebugValue)>;

/// Capture every metric recorded so far.
#[must_use]
pub fn snapshot(snapshotter: &Snapshotter) -> SnapshotEntries { snapshotter.snapshot().into_vec() }

fn has_label(key: &CompositeKey, label: Option<(&str, &str)>) -> bool {
    label.is_none_or(|(name, value)| {
        key.key()
            .labels()
            .any(|l| l.key() == name && l.value() == value)
    })
}

/// Sum of counters named `name`, optionally restricted to one label.
#[must_use]
pub fn counter_value(entries: &SnapshotEntries, name: &str, label: Option<(&str, &str)>) -> u64 {
    entries
        .iter()
        .filter(|(key, ..)| key.key().name() == name && has_label(key, label))
        .map(|(.., value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

/// Value of the gauge named `name`, if recorded.
#[must_use]
pub fn gauge_value(entries: &SnapshotEntries, name: &str) -> Option<f64> {
    entries.iter().find_map(|(key, .., value)| match value {
        DebugValue::Gauge(gauge) if key.key().name() == name => Some(gauge.0),
        _ => None,
    })
}
