//! Termination conditions polled by planning engines.
//!
//! A solve combines a wall-clock deadline with the context's cancel flag;
//! engines only ever see the combined condition.

mod external;
mod time;

#[cfg(test)]
mod tests;

pub use external::ExternalTermination;
pub use time::TimeTermination;

use planforge_core::Termination;

/// Terminates when any child terminates.
///
/// # Example
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
/// use std::time::Duration;
/// use planforge_core::Termination;
/// use planforge_planner::termination::{ExternalTermination, OrTermination, TimeTermination};
///
/// let flag = Arc::new(AtomicBool::new(false));
/// let termination = OrTermination::new(
///     TimeTermination::new(Duration::from_secs(30)),
///     ExternalTermination::new(flag),
/// );
/// assert!(!termination.is_terminated());
/// ```
#[derive(Debug, Clone)]
pub struct OrTermination<A, B> {
    first: A,
    second: B,
}

impl<A, B> OrTermination<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Termination, B: Termination> Termination for OrTermination<A, B> {
    fn is_terminated(&self) -> bool {
        self.first.is_terminated() || self.second.is_terminated()
    }
}

/// The condition a solve attempt runs under: its deadline or cancellation.
pub type AttemptTermination = OrTermination<TimeTermination, ExternalTermination>;
