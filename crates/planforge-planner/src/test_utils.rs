//! Test utilities for planforge-planner
//!
//! Re-exports the shared arm fixtures and adds interface builders and
//! request helpers used across the crate's test modules.

use std::sync::Arc;

use planforge_config::{ApproximationConfig, PlannerConfiguration, PlanningConfig};
use planforge_core::{Constraints, JointConstraint, PlanningEngine, PlanningScene, RobotModel, RobotState};

pub use planforge_test::arm::{ARM_GROUP, TIP_LINK};
pub use planforge_test::{
    CountingEngine, ObstacleScene, PlanarArm, PlanarArmIk, RandomTreeEngine, ScriptedEngine,
    StallingEngine, StraightLineEngine,
};

use crate::interface::PlanningInterface;
use crate::request::MotionPlanRequest;

/// Tolerance of goal joint constraints built by [`joint_goal`].
pub const GOAL_TOLERANCE: f64 = 0.05;

/// Configuration with a default `arm` entry and a `RandomTree` variant.
pub fn arm_config() -> PlanningConfig {
    let mut config = PlanningConfig::new()
        .with_planner_config(PlannerConfiguration::new("arm", ARM_GROUP, "StraightLine"))
        .with_planner_config(
            PlannerConfiguration::new("arm[RandomTree]", ARM_GROUP, "RandomTree")
                .with_parameter("range", "0.3"),
        )
        .with_random_seed(42);
    config.interface.default_timeout_seconds = 2.0;
    config.interface.default_attempts = 1;
    config.interface.minimum_attempt_millis = 1;
    config.approximation = ApproximationConfig {
        samples: 60,
        max_build_seconds: 10.0,
        connection_radius: 0.8,
        max_neighbors: 6,
        motion_resolution: 0.05,
        explore_bound: 0.2,
    };
    config
}

pub fn arm_model() -> Arc<dyn RobotModel> {
    Arc::new(PlanarArm::new())
}

/// Interface over [`PlanarArm`] with `engine` as the default engine.
pub fn arm_interface(engine: Arc<dyn PlanningEngine>, config: PlanningConfig) -> PlanningInterface {
    PlanningInterface::new(arm_model(), engine, config)
}

/// Interface with the straight-line engine as default and the random tree
/// registered under its planner id.
pub fn default_interface() -> PlanningInterface {
    let interface = arm_interface(Arc::new(StraightLineEngine::new()), arm_config());
    interface.register_engine("RandomTree", Arc::new(RandomTreeEngine));
    interface
}

pub fn free_scene() -> Arc<dyn PlanningScene> {
    Arc::new(ObstacleScene::free())
}

pub fn scene(scene: ObstacleScene) -> Arc<dyn PlanningScene> {
    Arc::new(scene)
}

/// Both arm joints near the given positions.
pub fn joint_goal(shoulder: f64, elbow: f64) -> Constraints {
    Constraints::named("goal")
        .with_joint(JointConstraint::new("shoulder", shoulder, GOAL_TOLERANCE))
        .with_joint(JointConstraint::new("elbow", elbow, GOAL_TOLERANCE))
}

pub fn arm_state(shoulder: f64, elbow: f64) -> RobotState {
    RobotState::new()
        .with_joint("shoulder", shoulder)
        .with_joint("elbow", elbow)
}

/// Request from `(0, 0)` to `(1, 1)` in joint space.
pub fn simple_request() -> MotionPlanRequest {
    MotionPlanRequest::new(ARM_GROUP)
        .with_start_state(arm_state(0.0, 0.0))
        .with_goal(joint_goal(1.0, 1.0))
}
