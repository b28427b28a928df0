//! Solve phases and per-solve diagnostics.

use std::time::Duration;

use planforge_core::EngineFailure;
use thiserror::Error;

/// Lifecycle of one solve on a context.
///
/// `Idle → Preparing → Solving → {Succeeded, Failed, TimedOut, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SolvePhase {
    Idle = 0,
    Preparing = 1,
    Solving = 2,
    Succeeded = 3,
    Failed = 4,
    TimedOut = 5,
    Cancelled = 6,
}

impl SolvePhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolvePhase::Succeeded | SolvePhase::Failed | SolvePhase::TimedOut | SolvePhase::Cancelled
        )
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SolvePhase::Preparing,
            2 => SolvePhase::Solving,
            3 => SolvePhase::Succeeded,
            4 => SolvePhase::Failed,
            5 => SolvePhase::TimedOut,
            6 => SolvePhase::Cancelled,
            _ => SolvePhase::Idle,
        }
    }
}

/// Why an attempt produced no usable path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Engine(#[from] EngineFailure),

    #[error("path is empty")]
    EmptyPath,

    #[error("waypoint {0} is invalid")]
    InvalidWaypoint(usize),

    #[error("path does not start at the start state")]
    WrongStart,

    #[error("path does not reach the goal")]
    GoalNotReached,

    #[error("context is missing {0}")]
    NotConfigured(&'static str),
}

/// What one attempt did.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded { cost: f64, waypoints: usize },
    Failed(AttemptFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub index: u32,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded { .. })
    }
}

/// Diagnostics of the most recent solve on a context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveDiagnostics {
    pub planner_id: String,
    pub attempts: Vec<AttemptRecord>,
    /// Index of the attempt whose path was returned.
    pub best_attempt: Option<u32>,
    pub approximation_used: bool,
    pub solve_time: Duration,
}

impl SolveDiagnostics {
    pub fn success_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.succeeded()).count()
    }
}
