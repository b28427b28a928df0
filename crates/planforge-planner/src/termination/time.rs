//! Deadline-based termination.

use std::time::{Duration, Instant};

use planforge_core::Termination;

/// Terminates once a wall-clock deadline has passed.
#[derive(Debug, Clone, Copy)]
pub struct TimeTermination {
    deadline: Instant,
}

impl TimeTermination {
    /// Terminates `limit` from now. Limits too large to represent never fire.
    pub fn new(limit: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(limit)
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365));
        Self { deadline }
    }

    pub fn at(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Termination for TimeTermination {
    fn is_terminated(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
