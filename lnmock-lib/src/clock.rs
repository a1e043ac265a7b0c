//! Virtual time: real wall-clock seconds plus a stored offset.

use std::time::{SystemTime, UNIX_EPOCH};

/// The only passage-of-time abstraction in the system.
///
/// `now()` is real unix time plus the accumulated offset. The offset
/// lives in the daemon state; the clock is rebuilt from it on every
/// operation and the node persists the updated value after
/// [`advance`](VirtualClock::advance). Offsets may go negative; no
/// component enforces monotonicity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VirtualClock {
    offset: i64,
}

impl VirtualClock {
    /// Clock with the given offset applied to wall time.
    pub fn with_offset(offset: i64) -> Self {
        Self { offset }
    }

    /// The current accumulated offset in seconds.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Current virtual timestamp (unix seconds).
    pub fn now(&self) -> i64 {
        unix_now() + self.offset
    }

    /// Adds `seconds` (positive or negative) and returns the new offset.
    pub fn advance(&mut self, seconds: i64) -> i64 {
        self.offset += seconds;
        self.offset
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
