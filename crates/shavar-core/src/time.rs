//! Protocol timestamps.
//!
//! The wire protocol expresses every interval in whole seconds (poll
//! waits, cache lifetimes, backoff windows), so timestamps are seconds
//! since the Unix epoch.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Timestamp in seconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp from seconds since the Unix epoch.
    pub const fn new(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(duration.as_secs() as i64)
    }

    /// Returns the seconds since the Unix epoch.
    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Adds a number of seconds.
    pub const fn add_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Adds a duration, truncated to whole seconds.
    pub fn add(&self, duration: Duration) -> Self {
        self.add_secs(duration.as_secs() as i64)
    }

    /// Returns true if this timestamp is strictly before the other.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Returns the seconds from `earlier` to `self`, or zero when
    /// `earlier` is not earlier.
    pub fn secs_since(&self, earlier: &Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }

    /// Returns the duration until `later`, or zero when already past.
    pub fn duration_until(&self, later: &Timestamp) -> Duration {
        Duration::from_secs(later.secs_since(self) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_recent() {
        let ts = Timestamp::now();
        // After 2024-01-01.
        assert!(ts.0 > 1_704_067_200);
    }

    #[test]
    fn test_arithmetic() {
        let ts = Timestamp::new(1000);
        assert_eq!(ts.add_secs(500), Timestamp::new(1500));
        assert_eq!(ts.add(Duration::from_secs(30)), Timestamp::new(1030));
    }

    #[test]
    fn test_secs_since_clamps() {
        let earlier = Timestamp::new(1000);
        let later = Timestamp::new(1300);
        assert_eq!(later.secs_since(&earlier), 300);
        assert_eq!(earlier.secs_since(&later), 0);
    }

    #[test]
    fn test_duration_until() {
        let a = Timestamp::new(1000);
        let b = Timestamp::new(1060);
        assert_eq!(a.duration_until(&b), Duration::from_secs(60));
        assert_eq!(b.duration_until(&a), Duration::ZERO);
    }
}
