//! Expiration Sweep
//!
//! Deciding which entries a periodic sweep removes, kept free of clocks and
//! timers so it can be checked with plain timestamps.

use crate::cache::Entry;

// == Sweep Plan ==
/// Outcome of a sweep that is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    /// Keys of every entry expired at the sweep instant
    pub expired: Vec<String>,
    /// New value for the last-sweep timestamp
    pub last_sweep_at: u64,
}

/// Plans a sweep over `entries` at `now`.
///
/// Returns `None` while no more than `interval_ms` has elapsed since
/// `last_sweep_at`; the entries are left alone in that case.
pub fn plan_sweep<'a, I>(entries: I, now: u64, last_sweep_at: u64, interval_ms: u64) -> Option<SweepPlan>
where
    I: IntoIterator<Item = (&'a String, &'a Entry)>,
{
    if now.saturating_sub(last_sweep_at) <= interval_ms {
        return None;
    }

    let expired = entries
        .into_iter()
        .filter(|(_, entry)| entry.is_expired_at(now))
        .map(|(key, _)| key.clone())
        .collect();

    Some(SweepPlan {
        expired,
        last_sweep_at: now,
    })
}
