//! Time Projection Calculator
//!
//! Converts queue order plus per-entry allotments into absolute start times.
//! Entry 0 starts at `base`; entry i starts at `base` plus the effective
//! allotments of every entry before it. One left-to-right scan, O(n).
//! Arithmetic saturates, so an absurd allotment pushes later starts to the
//! end of time instead of wrapping.

use crate::domain::{EpochMillis, ProjectedEntry, QueueEntry, MILLIS_PER_MINUTE};

/// Annotate `entries` (already in queue order) with projected start times
pub fn project(entries: Vec<QueueEntry>, base: EpochMillis) -> Vec<ProjectedEntry> {
    let mut accumulated_minutes: i64 = 0;
    entries
        .into_iter()
        .map(|entry| {
            let projected_start =
                base.saturating_add(accumulated_minutes.saturating_mul(MILLIS_PER_MINUTE));
            accumulated_minutes =
                accumulated_minutes.saturating_add(entry.wait_allotment.effective_minutes());
            ProjectedEntry {
                entry,
                projected_start,
            }
        })
        .collect()
}
