//! External termination via a shared `AtomicBool` flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use planforge_core::Termination;

/// Terminates when an external flag is set.
///
/// The flag is shared with the thread that may request cancellation, so it
/// is held by `Arc` rather than borrowed.
#[derive(Debug, Clone)]
pub struct ExternalTermination {
    flag: Arc<AtomicBool>,
}

impl ExternalTermination {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl Termination for ExternalTermination {
    fn is_terminated(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
