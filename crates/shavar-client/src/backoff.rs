//! Backoff schedules and persisted retry state.
//!
//! Updates back off per list on a fixed schedule with randomized
//! middle steps; gethash requests back off per prefix, suppressing the
//! prefix from outgoing batches while its window is open.

use rand::Rng;
use serde::{Deserialize, Serialize};
use shavar_core::Timestamp;

/// Poll interval after a `pleasereset` directive, seconds.
pub const RESET_RETRY_SECS: u32 = 10;

/// Elapsed seconds after which a repeated gethash failure counts as a
/// new error rather than the same incident.
const GETHASH_ERROR_WINDOW_SECS: i64 = 5 * 60;

/// Per-list update record persisted under `updated/<list>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedState {
    /// Wall time of the last poll attempt, seconds since epoch.
    pub time: i64,
    /// Wait before the next poll, seconds.
    pub wait: u32,
    /// Consecutive failure count.
    pub errors: u32,
}

/// Per-prefix gethash record persisted under
/// `full_hash_errors/<hexPrefix>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixErrorState {
    /// Wall time of the last failure, seconds since epoch.
    pub timestamp: i64,
    /// Accumulated error count.
    pub errors: u32,
}

/// Returns the wait after `errors` consecutive update failures.
///
/// | errors | wait |
/// |-------:|------|
/// | 1 | 60 s |
/// | 2 | 30-60 min |
/// | 3 | 60-120 min |
/// | 4 | 120-240 min |
/// | 5 | 240-480 min |
/// | 6+ | 480 min |
pub fn update_backoff_secs(errors: u32) -> u32 {
    let mut rng = rand::thread_rng();
    match errors {
        0 | 1 => 60,
        2 => rng.gen_range(30 * 60..=60 * 60),
        3 => rng.gen_range(60 * 60..=120 * 60),
        4 => rng.gen_range(120 * 60..=240 * 60),
        5 => rng.gen_range(240 * 60..=480 * 60),
        _ => 480 * 60,
    }
}

/// Folds a gethash failure into the prefix's error record.
///
/// The count only advances while below two errors or once five minutes
/// have passed since the last recorded failure; rapid-fire failures
/// within the window collapse into one. The failure time always moves
/// forward.
pub fn record_gethash_failure(state: Option<PrefixErrorState>, now: Timestamp) -> PrefixErrorState {
    let mut state = state.unwrap_or_default();
    if state.errors < 2 || now.as_secs() - state.timestamp >= GETHASH_ERROR_WINDOW_SECS {
        state.errors += 1;
    }
    state.timestamp = now.as_secs();
    state
}

/// Returns the instant until which a prefix is withheld from gethash
/// batches.
///
/// One error asks for a five-minute pause, two allow an immediate
/// retry, and from three on the window grows to 30, 60, then 120
/// minutes from the last failure.
pub fn gethash_suppressed_until(state: &PrefixErrorState) -> Timestamp {
    let last = Timestamp::new(state.timestamp);
    match state.errors {
        0 => last,
        1 => last.add_secs(5 * 60),
        2 => last,
        3 => last.add_secs(30 * 60),
        4 => last.add_secs(60 * 60),
        _ => last.add_secs(120 * 60),
    }
}

/// Returns true when the prefix may be included in a gethash batch at
/// `now`.
pub fn gethash_allowed(state: &PrefixErrorState, now: Timestamp) -> bool {
    !now.is_before(&gethash_suppressed_until(state))
}
