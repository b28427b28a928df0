//! PlanForge - Motion planning management in Rust
//!
//! Configure planners once, then hand motion plan requests to a
//! [`PlanningInterface`]. It resolves a planning context, attaches cached
//! constraint approximations and runs the planning engine under a
//! deadline, with cancellation from any thread.
//!
//! # Example
//!
//! ```rust
//! use planforge::prelude::*;
//!
//! let request = MotionPlanRequest::new("arm")
//!     .with_goal(Constraints::new().with_joint(JointConstraint::new("elbow", 1.0, 0.05)))
//!     .with_timeout(1.5);
//! assert_eq!(request.allowed_planning_time, Some(1.5));
//! assert_eq!(ErrorCode::TimedOut.as_str(), "TIMED_OUT");
//! ```

pub mod logging;

// Domain types and collaborator traits
pub use planforge_core::{
    Constraints, ConstraintSignature, EngineFailure, ErrorCode, GoalRegion, IkSolver,
    JointConstraint, JointLimits, JointModelGroup, JointStateSpace, KinematicConstraintSet,
    OrientationConstraint, PlanForgeError, PlannedPath, PlannerParameters, PlanningEngine,
    PlanningProblem, PlanningScene, Pose, PositionConstraint, Quaternion, RobotModel, RobotState,
    StateSampler, StateValidity, Termination,
};

// Configuration
pub use planforge_config::{
    ApproximationConfig, ConfigError, InterfaceConfig, PlannerConfigRegistry,
    PlannerConfiguration, PlanningConfig,
};

// Planning layer
pub use planforge_planner::{
    BenchmarkConfig, BenchmarkResult, BenchmarkRun, ConfigurationBenchmark,
    ConstraintApproximation, ConstraintApproximationStore, JointTrajectory,
    MotionPlanDetailedResponse, MotionPlanRequest, MotionPlanResponse, PlanStage,
    PlanningContext, PlanningContextManager, PlanningInterface, SolveDiagnostics, SolvePhase,
    StateSpaceFactory,
};

/// Lower-level planner modules.
pub use planforge_planner::{approximation, context, interface, manager, request, termination};

pub mod prelude {
    pub use super::{
        BenchmarkConfig, Constraints, ErrorCode, IkSolver, JointConstraint, MotionPlanRequest,
        MotionPlanResponse, OrientationConstraint, PlanForgeError, PlanningConfig,
        PlanningEngine, PlanningInterface, PlanningScene, PositionConstraint, RobotModel,
        RobotState,
    };
}
