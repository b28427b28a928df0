//! PlanForge Planner - Motion planning management layer
//!
//! This crate sits between motion plan requests and a sampling-based
//! planning engine:
//! - Planning contexts (one configured planning problem each)
//! - Context manager (configuration lookup and state-space factory selection)
//! - Constraint approximation store (precomputed constraint manifolds, persisted)
//! - Planning interface (solve, benchmark, cross-thread termination)
//! - Termination conditions for deadlines and cancellation

pub mod approximation;
pub mod context;
pub mod interface;
pub mod manager;
pub mod request;
pub mod termination;

#[cfg(test)]
mod test_utils;

pub use approximation::{
    ApproximationKey, BuildMetadata, ConstrainedSampler, ConstraintApproximation,
    ConstraintApproximationStore, ManifoldGraph, ManifoldSampler,
};
pub use context::{
    AttemptFailure, AttemptOutcome, AttemptRecord, PlanningContext, SolveDiagnostics, SolvePhase,
};
pub use interface::{
    BenchmarkConfig, BenchmarkResult, BenchmarkRun, ConfigurationBenchmark, PlanningInterface,
    PreparedSolve, StartPrefix,
};
pub use manager::{PlanningContextManager, StateSpaceFactory};
pub use request::{
    JointTrajectory, MotionPlanDetailedResponse, MotionPlanRequest, MotionPlanResponse, PlanStage,
};
pub use termination::{AttemptTermination, ExternalTermination, OrTermination, TimeTermination};
