//! Re-armable idle deadline.

/// A single debounce deadline.
///
/// Every [`IdleTimer::rearm`] replaces the previous deadline, so at most one
/// firing is ever pending and the last re-arm wins. The owner polls it with
/// the current time; a due timer fires once and then stays idle until it is
/// re-armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleTimer {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl IdleTimer {
    /// Create an idle (unarmed) timer.
    #[must_use]
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// Restart the countdown from `now_ms`.
    pub fn rearm(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Fire if the deadline has passed. Returns `true` at most once per arm.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// When the timer will fire, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Whether a firing is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}
