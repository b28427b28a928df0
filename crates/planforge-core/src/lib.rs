//! PlanForge Core - Domain types and collaborator traits for motion planning
//!
//! This crate provides the fundamental abstractions for PlanForge:
//! - Error types with stable, enumerable error codes
//! - Geometry primitives (poses, quaternions)
//! - Robot model and planning scene traits (kinematics and collision collaborators)
//! - Kinematic constraints and their normalized signatures
//! - Joint state spaces
//! - The capability interface of the underlying sampling-based planning engine

pub mod constraint;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod robot;
pub mod space;

pub use constraint::{
    ConstraintEvaluation, ConstraintSignature, Constraints, JointBound, JointConstraint,
    KinematicConstraintSet, OrientationConstraint, PositionConstraint,
};
pub use engine::{
    EngineFailure, GoalRegion, PlannedPath, PlannerParameters, PlanningEngine, PlanningProblem,
    StateSampler, StateValidity, Termination,
};
pub use error::{ErrorCode, PlanForgeError, Result};
pub use geometry::{Pose, Quaternion};
pub use robot::{IkSolver, JointLimits, JointModelGroup, PlanningScene, RobotModel, RobotState};
pub use space::JointStateSpace;
