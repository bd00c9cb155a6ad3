use std::time::{Duration, Instant};

/// Granularity of deadline-bounded busy waits.
///
/// No wait in the engine overshoots its deadline by more than one interval.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// An absolute point in monotonic time computed from "now + timeout".
///
/// Every blocking wait in ltelink polls against one of these instead of
/// carrying its own ad hoc deadline arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// True once the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left, zero if already past.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Sleep one poll interval, capped at the remaining budget.
    pub fn park(&self) {
        let nap = POLL_INTERVAL.min(self.remaining());
        if !nap.is_zero() {
            std::thread::sleep(nap);
        }
    }
}
