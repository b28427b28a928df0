//! Tests for the context manager and state-space factories.

use std::collections::HashMap;
use std::sync::Arc;

use planforge_config::PlannerConfigRegistry;
use planforge_core::{
    Constraints, ErrorCode, IkSolver, JointLimits, JointModelGroup, PlannerParameters, PositionConstraint,
    RobotState,
};

use super::*;
use crate::test_utils::*;

fn manager() -> PlanningContextManager {
    let registry = Arc::new(PlannerConfigRegistry::new());
    registry.register(arm_config().planner_configs);
    PlanningContextManager::new(arm_model(), registry)
}

fn with_ik(manager: &PlanningContextManager) {
    let mut solvers: HashMap<String, Arc<dyn IkSolver>> = HashMap::new();
    solvers.insert(ARM_GROUP.to_string(), Arc::new(PlanarArmIk));
    manager.set_ik_solvers(solvers);
}

fn tip_goal() -> Constraints {
    Constraints::new().with_position(PositionConstraint::new(TIP_LINK, [1.0, 1.0, 0.0], 0.05))
}

#[test]
fn test_no_last_context_initially() {
    assert!(manager().last_planning_context().is_none());
}

#[test]
fn test_get_planning_context_by_name() {
    let manager = manager();
    let context = manager.get_planning_context("arm[RandomTree]", None).unwrap();
    assert_eq!(context.name(), "arm[RandomTree]");
    assert_eq!(context.planner_id(), "RandomTree");
    assert_eq!(context.factory_type(), StateSpaceFactory::JointModel);
    assert_eq!(
        context.planner_parameters().get("range").map(String::as_str),
        Some("0.3")
    );
    assert!(Arc::ptr_eq(&manager.last_planning_context().unwrap(), &context));
}

#[test]
fn test_unknown_configuration_is_config_not_found() {
    let manager = manager();
    let err = manager.get_planning_context("gripper", None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
    assert!(manager.last_planning_context().is_none());
}

#[test]
fn test_contexts_are_fresh_and_ids_increase() {
    let manager = manager();
    let first = manager.get_planning_context("arm", None).unwrap();
    first.set_start_state(vec![0.1, 0.1]).unwrap();
    let second = manager.get_planning_context("arm", None).unwrap();
    assert!(second.id() > first.id());
    assert!(second.start_state().is_none());
    assert!(Arc::ptr_eq(&manager.last_planning_context().unwrap(), &second));
}

#[test]
fn test_configuration_name_derivation() {
    let manager = manager();
    assert_eq!(manager.configuration_name("arm", ""), "arm");
    assert_eq!(manager.configuration_name("arm", "arm[RandomTree]"), "arm[RandomTree]");
    assert_eq!(manager.configuration_name("arm", "RandomTree"), "arm[RandomTree]");
    assert_eq!(manager.configuration_name("arm", "Unknown"), "arm[Unknown]");
}

#[test]
fn test_request_context_is_seeded_from_request() {
    let manager = manager();
    let mut parameters = PlannerParameters::new();
    parameters.insert("goal_bias".to_string(), "0.3".to_string());
    let request = MotionPlanRequest {
        planner_parameters: parameters,
        ..simple_request().with_planner("RandomTree")
    };

    let context = manager.get_planning_context_for_request(&request).unwrap();
    assert_eq!(context.name(), "arm[RandomTree]");
    assert_eq!(context.goal_count(), 1);
    assert_eq!(context.start_state(), Some(vec![0.0, 0.0]));
    let params = context.planner_parameters();
    assert_eq!(params.get("goal_bias").map(String::as_str), Some("0.3"));
    assert_eq!(params.get("range").map(String::as_str), Some("0.3"));
}

#[test]
fn test_partial_start_is_left_for_the_orchestrator() {
    let manager = manager();
    let request = MotionPlanRequest::new(ARM_GROUP)
        .with_start_state(RobotState::new().with_joint("shoulder", 0.2))
        .with_goal(joint_goal(1.0, 1.0));
    let context = manager.get_planning_context_for_request(&request).unwrap();
    assert!(context.start_state().is_none());
}

#[test]
fn test_request_with_unknown_group_or_empty_goal_is_invalid() {
    let manager = manager();
    let unknown = MotionPlanRequest::new("gripper").with_goal(joint_goal(0.0, 0.0));
    assert_eq!(
        manager.get_planning_context_for_request(&unknown).unwrap_err().code(),
        ErrorCode::InvalidRequest
    );

    let no_goal = MotionPlanRequest::new(ARM_GROUP);
    assert_eq!(
        manager.get_planning_context_for_request(&no_goal).unwrap_err().code(),
        ErrorCode::InvalidRequest
    );
}

#[test]
fn test_unknown_factory_is_unsupported() {
    let manager = manager();
    let err = manager.get_planning_context("arm", Some("Cartesian")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedFactoryType);
}

#[test]
fn test_pose_model_requires_ik() {
    let manager = manager();
    let err = manager.get_planning_context("arm", Some("PoseModel")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedFactoryType);

    with_ik(&manager);
    let context = manager.get_planning_context("arm", Some("PoseModel")).unwrap();
    assert_eq!(context.factory_type(), StateSpaceFactory::PoseModel);
}

#[test]
fn test_pose_goals_prefer_pose_model_when_ik_is_available() {
    let manager = manager();
    let request = MotionPlanRequest::new(ARM_GROUP).with_goal(tip_goal());
    let context = manager.get_planning_context_for_request(&request).unwrap();
    assert_eq!(context.factory_type(), StateSpaceFactory::JointModel);

    with_ik(&manager);
    let context = manager.get_planning_context_for_request(&request).unwrap();
    assert_eq!(context.factory_type(), StateSpaceFactory::PoseModel);

    let joint_request = simple_request();
    let context = manager.get_planning_context_for_request(&joint_request).unwrap();
    assert_eq!(context.factory_type(), StateSpaceFactory::JointModel);
}

#[test]
fn test_factory_selection_by_priority() {
    let group = JointModelGroup::new("g", vec![JointLimits::new("a", -1.0, 1.0)]);
    assert_eq!(
        StateSpaceFactory::select(None, &group, false, false).unwrap(),
        StateSpaceFactory::JointModel
    );
    assert_eq!(
        StateSpaceFactory::select(None, &group, true, true).unwrap(),
        StateSpaceFactory::PoseModel
    );
    assert_eq!(
        StateSpaceFactory::select(Some(""), &group, false, true).unwrap(),
        StateSpaceFactory::JointModel
    );
    assert_eq!("PoseModel".parse::<StateSpaceFactory>(), Ok(StateSpaceFactory::PoseModel));
    assert_eq!(StateSpaceFactory::JointModel.to_string(), "JointModel");
}

#[test]
fn test_configuration_with_unknown_group_is_invalid_group() {
    let manager = manager();
    manager
        .registry()
        .register(vec![planforge_config::PlannerConfiguration::new(
            "gripper",
            "gripper",
            "StraightLine",
        )]);
    let err = manager.get_planning_context("gripper", None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidGroup);
}
