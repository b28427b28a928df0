//! Tests for termination conditions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use planforge_core::Termination;

use super::*;

#[test]
fn test_time_termination_fires_after_deadline() {
    let term = TimeTermination::millis(5);
    assert!(!term.is_terminated());
    std::thread::sleep(Duration::from_millis(10));
    assert!(term.is_terminated());
    assert_eq!(term.remaining(), Duration::ZERO);
}

#[test]
fn test_time_termination_in_the_past() {
    let term = TimeTermination::at(Instant::now());
    assert!(term.is_terminated());
}

#[test]
fn test_huge_limit_does_not_overflow() {
    let term = TimeTermination::new(Duration::MAX);
    assert!(!term.is_terminated());
    assert!(term.remaining() > Duration::from_secs(3600));
}

#[test]
fn test_external_termination_observes_flag() {
    let flag = Arc::new(AtomicBool::new(false));
    let term = ExternalTermination::new(flag.clone());
    assert!(!term.is_terminated());
    flag.store(true, Ordering::Release);
    assert!(term.is_terminated());
}

#[test]
fn test_or_termination() {
    let flag = Arc::new(AtomicBool::new(false));
    let term = OrTermination::new(
        TimeTermination::new(Duration::from_secs(60)),
        ExternalTermination::new(flag.clone()),
    );
    assert!(!term.is_terminated());
    flag.store(true, Ordering::Release);
    assert!(term.is_terminated());

    let expired = OrTermination::new(
        TimeTermination::at(Instant::now()),
        ExternalTermination::new(Arc::new(AtomicBool::new(false))),
    );
    assert!(expired.is_terminated());
}
