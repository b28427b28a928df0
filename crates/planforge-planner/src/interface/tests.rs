//! Tests for the planning interface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use planforge_core::{
    Constraints, ErrorCode, IkSolver, JointConstraint, JointModelGroup, PlanningEngine, Pose,
    PositionConstraint, RobotModel,
};

use super::*;
use crate::approximation::{ApproximationKey, BuildMetadata, ConstraintApproximation, ManifoldGraph};
use crate::context::SolvePhase;
use crate::request::MotionPlanRequest;
use crate::test_utils::*;

/// Waits until the interface's latest context is solving.
fn wait_until_solving(interface: &PlanningInterface) {
    let started = Instant::now();
    loop {
        if let Some(context) = interface.last_planning_context() {
            if context.phase() == SolvePhase::Solving {
                return;
            }
        }
        assert!(started.elapsed() < Duration::from_secs(10), "solve never started");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Shoulder kept within [-0.5, 1.5].
fn shoulder_band() -> Constraints {
    Constraints::named("shoulder band").with_joint(JointConstraint::new("shoulder", 0.5, 1.0))
}

fn interface_with(engine: Arc<dyn PlanningEngine>) -> PlanningInterface {
    arm_interface(engine, arm_config())
}

#[test]
fn test_solve_returns_valid_trajectory() {
    let interface = default_interface();
    let response = interface.solve(&free_scene(), &simple_request());

    assert!(response.is_success(), "{:?}", response.message);
    let trajectory = response.trajectory.unwrap();
    assert_eq!(trajectory.joint_names, vec!["shoulder", "elbow"]);
    assert_eq!(trajectory.waypoints.first(), Some(&vec![0.0, 0.0]));
    let last = trajectory.waypoints.last().unwrap();
    assert!((last[0] - 1.0).abs() <= GOAL_TOLERANCE);
    assert!((last[1] - 1.0).abs() <= GOAL_TOLERANCE);

    let diagnostics = response.diagnostics.unwrap();
    assert_eq!(diagnostics.attempts.len(), 1);
    assert_eq!(diagnostics.best_attempt, Some(0));
    assert_eq!(diagnostics.planner_id, "StraightLine");
    assert_eq!(
        interface.last_planning_context().unwrap().phase(),
        SolvePhase::Succeeded
    );
}

#[test]
fn test_start_defaults_to_scene_current_state() {
    let interface = default_interface();
    let scene = scene(ObstacleScene::free().with_current_state(arm_state(0.2, 0.1)));
    let request = MotionPlanRequest::new(ARM_GROUP).with_goal(joint_goal(1.0, 1.0));
    let response = interface.solve(&scene, &request);

    assert!(response.is_success());
    assert_eq!(
        response.trajectory.unwrap().waypoints.first(),
        Some(&vec![0.2, 0.1])
    );
}

#[test]
fn test_unknown_configuration_never_reaches_engine() {
    let engine = Arc::new(CountingEngine::new(StraightLineEngine::new()));
    let interface = interface_with(engine.clone());
    let response = interface.solve(&free_scene(), &simple_request().with_planner("Missing"));

    assert_eq!(response.error_code, ErrorCode::ConfigNotFound);
    assert!(response.trajectory.is_none());
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_invalid_timeouts_are_rejected_before_any_context() {
    let interface = default_interface();
    for timeout in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let response = interface.solve(&free_scene(), &simple_request().with_timeout(timeout));
        assert_eq!(response.error_code, ErrorCode::InvalidTimeout);
    }
    assert!(interface.last_planning_context().is_none());
}

#[test]
fn test_zero_attempts_is_invalid_request() {
    let interface = default_interface();
    let response = interface.solve(&free_scene(), &simple_request().with_attempts(0));
    assert_eq!(response.error_code, ErrorCode::InvalidRequest);
    assert!(interface.last_planning_context().is_none());
}

#[test]
fn test_request_validation_codes() {
    let interface = default_interface();
    let unknown_group = MotionPlanRequest::new("gripper").with_goal(joint_goal(0.0, 0.0));
    assert_eq!(
        interface.solve(&free_scene(), &unknown_group).error_code,
        ErrorCode::InvalidGroup
    );

    let no_goal = MotionPlanRequest::new(ARM_GROUP);
    assert_eq!(
        interface.solve(&free_scene(), &no_goal).error_code,
        ErrorCode::InvalidGoalConstraints
    );

    let empty_goal = MotionPlanRequest::new(ARM_GROUP).with_goal(Constraints::new());
    assert_eq!(
        interface.solve(&free_scene(), &empty_goal).error_code,
        ErrorCode::InvalidGoalConstraints
    );
}

#[test]
fn test_terminate_solve_cancels_running_solve() {
    let engine = Arc::new(StallingEngine::new());
    let interface = interface_with(engine.clone());
    let request = simple_request().with_timeout(30.0);

    let started = Instant::now();
    let response = thread::scope(|s| {
        let solver = s.spawn(|| interface.solve(&free_scene(), &request));
        wait_until_solving(&interface);
        assert!(interface.terminate_solve());
        solver.join().unwrap()
    });

    assert_eq!(response.error_code, ErrorCode::Cancelled);
    assert!(response.trajectory.is_none());
    assert!(started.elapsed() < Duration::from_secs(10));
    let context = interface.last_planning_context().unwrap();
    assert_eq!(context.phase(), SolvePhase::Cancelled);
    assert_eq!(context.last_diagnostics().unwrap().best_attempt, None);
    assert_eq!(engine.calls(), 1);
}

/// Planar arm whose next group lookup, once armed, parks until released.
struct GatedArm {
    inner: PlanarArm,
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl GatedArm {
    fn new() -> Self {
        Self {
            inner: PlanarArm::new(),
            armed: AtomicBool::new(false),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

impl RobotModel for GatedArm {
    fn group(&self, name: &str) -> Option<&JointModelGroup> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.group(name)
    }

    fn group_names(&self) -> Vec<String> {
        self.inner.group_names()
    }

    fn link_pose(&self, group: &JointModelGroup, link: &str, positions: &[f64]) -> Option<Pose> {
        self.inner.link_pose(group, link, positions)
    }

    fn has_link(&self, link: &str) -> bool {
        self.inner.has_link(link)
    }
}

#[test]
fn test_terminate_before_context_exists_cancels_the_solve() {
    let engine = Arc::new(StallingEngine::new());
    let model = Arc::new(GatedArm::new());
    let interface = PlanningInterface::new(model.clone(), engine.clone(), arm_config());
    let earlier = interface.solve(&free_scene(), &simple_request().with_timeout(0.05));
    assert_eq!(earlier.error_code, ErrorCode::TimedOut);
    let earlier_context = interface.last_planning_context().unwrap();

    model.armed.store(true, Ordering::SeqCst);
    let request = simple_request().with_timeout(30.0);
    let started = Instant::now();
    let response = thread::scope(|s| {
        let solver = s.spawn(|| interface.solve(&free_scene(), &request));
        model.entered.wait();
        assert!(interface.terminate_solve());
        model.release.wait();
        solver.join().unwrap()
    });

    assert_eq!(response.error_code, ErrorCode::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(engine.calls(), 1);
    let context = interface.last_planning_context().unwrap();
    assert!(!Arc::ptr_eq(&context, &earlier_context));
    assert_eq!(context.phase(), SolvePhase::Cancelled);

    assert!(!interface.terminate_solve());
    let next = interface.solve(&free_scene(), &simple_request().with_timeout(0.05));
    assert_eq!(next.error_code, ErrorCode::TimedOut);
}

#[test]
fn test_terminate_without_running_solve_is_noop() {
    let interface = default_interface();
    assert!(!interface.terminate_solve());

    let response = interface.solve(&free_scene(), &simple_request());
    assert!(response.is_success());
    assert!(!interface.terminate_solve());
    assert!(!interface.last_planning_context().unwrap().is_cancel_requested());
}

#[test]
fn test_attempts_share_one_deadline() {
    let engine = Arc::new(StallingEngine::new());
    let interface = interface_with(engine.clone());
    let request = simple_request().with_timeout(0.3).with_attempts(3);

    let started = Instant::now();
    let response = interface.solve(&free_scene(), &request);
    let elapsed = started.elapsed();

    assert_eq!(response.error_code, ErrorCode::TimedOut);
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(350), "{elapsed:?}");
    assert_eq!(engine.calls(), 1);
    assert_eq!(
        interface.last_planning_context().unwrap().phase(),
        SolvePhase::TimedOut
    );
}

#[test]
fn test_best_attempt_prefers_lowest_cost_then_lowest_index() {
    let mut config = arm_config();
    config.interface.stop_at_first_success = false;
    let engine = Arc::new(ScriptedEngine::new(vec![Some(2.0), Some(1.0), Some(1.0)]));
    let interface = arm_interface(engine.clone(), config);

    let response = interface.solve(&free_scene(), &simple_request().with_attempts(3));

    assert!(response.is_success());
    let diagnostics = response.diagnostics.unwrap();
    assert_eq!(engine.calls(), 3);
    assert_eq!(diagnostics.success_count(), 3);
    assert_eq!(diagnostics.best_attempt, Some(1));
}

#[test]
fn test_stop_at_first_success_skips_remaining_attempts() {
    let engine = Arc::new(ScriptedEngine::new(vec![Some(2.0), Some(1.0)]));
    let interface = interface_with(engine.clone());
    let response = interface.solve(&free_scene(), &simple_request().with_attempts(2));

    assert!(response.is_success());
    assert_eq!(engine.calls(), 1);
}

#[test]
fn test_failed_attempts_are_planning_failed_not_timed_out() {
    let engine = Arc::new(ScriptedEngine::new(vec![None, None]));
    let interface = interface_with(engine.clone());
    let response = interface.solve(&free_scene(), &simple_request().with_attempts(2));

    assert_eq!(response.error_code, ErrorCode::PlanningFailed);
    let diagnostics = response.diagnostics.unwrap();
    assert_eq!(diagnostics.attempts.len(), 2);
    assert!(diagnostics.attempts.iter().all(|a| !a.succeeded()));
    assert_eq!(
        interface.last_planning_context().unwrap().phase(),
        SolvePhase::Failed
    );
}

#[test]
fn test_invalid_start_is_repaired_with_prefix() {
    let interface = default_interface();
    let scene = scene(ObstacleScene::free().with_box(vec![-0.05, -0.05], vec![0.05, 0.05]));
    let request = simple_request().with_planner("RandomTree");

    let prepared = interface.prepare_for_solve(&scene, &request).unwrap();
    let prefix = prepared.prefix.expect("start should need repair");
    assert_eq!(prefix.trajectory.waypoints.len(), 2);
    assert_eq!(prefix.trajectory.waypoints[0], vec![0.0, 0.0]);
    assert_eq!(prefix.trajectory.waypoints[1], prefix.state);
    assert_eq!(prepared.context.start_state(), Some(prefix.state.clone()));
    assert!(prefix.time > Duration::ZERO);

    let response = interface.solve(&scene, &request);
    assert!(response.is_success(), "{:?}", response.message);
    let waypoints = response.trajectory.unwrap().waypoints;
    assert_eq!(waypoints[0], vec![0.0, 0.0]);
    assert!(waypoints.len() >= 3);
}

#[test]
fn test_unrepairable_start_is_start_state_in_collision() {
    let engine = Arc::new(CountingEngine::new(StraightLineEngine::new()));
    let interface = interface_with(engine.clone());
    let scene = scene(ObstacleScene::free().with_box(vec![-1.0, -1.0], vec![1.0, 1.0]));
    let response = interface.solve(&scene, &simple_request());

    assert_eq!(response.error_code, ErrorCode::StartStateInCollision);
    assert_eq!(engine.calls(), 0);
    assert_eq!(
        interface.last_planning_context().unwrap().phase(),
        SolvePhase::Failed
    );
}

#[test]
fn test_missing_approximation_still_plans() {
    let interface = default_interface();
    assert!(interface.is_using_constraints_approximations());
    let request = simple_request().with_path_constraints(shoulder_band());
    let response = interface.solve(&free_scene(), &request);

    assert!(response.is_success());
    assert!(!response.diagnostics.unwrap().approximation_used);
}

#[test]
fn test_matching_approximation_is_attached() {
    let interface = default_interface();
    let approximation = interface
        .add_constraint_approximation(&shoulder_band(), ARM_GROUP, None, free_scene())
        .unwrap();
    assert!(approximation.state_count() > 0);

    let request = simple_request().with_path_constraints(shoulder_band());
    let response = interface.solve(&free_scene(), &request);

    assert!(response.is_success());
    assert!(response.diagnostics.unwrap().approximation_used);
    let attached = interface
        .last_planning_context()
        .unwrap()
        .attached_approximation()
        .unwrap();
    assert!(Arc::ptr_eq(&attached, &approximation));
}

#[test]
fn test_approximation_of_wrong_dimension_is_ignored() {
    let interface = default_interface();
    let graph = ManifoldGraph::from_parts(3, vec![0.0, 0.0, 0.0, 0.1, 0.1, 0.1], vec![(0, 1)]).unwrap();
    interface.constraint_approximations().insert(ConstraintApproximation::new(
        ApproximationKey::new(shoulder_band().signature(), ARM_GROUP),
        graph,
        "arm/approximation_0.graph",
        BuildMetadata::default(),
    ));

    let request = simple_request().with_path_constraints(shoulder_band());
    let response = interface.solve(&free_scene(), &request);

    assert!(response.is_success());
    assert!(!response.diagnostics.unwrap().approximation_used);
    assert!(interface
        .last_planning_context()
        .unwrap()
        .attached_approximation()
        .is_none());
}

#[test]
fn test_disabled_approximations_are_not_attached() {
    let interface = default_interface();
    interface
        .add_constraint_approximation(&shoulder_band(), ARM_GROUP, None, free_scene())
        .unwrap();
    interface.use_constraints_approximations(false);

    let request = simple_request().with_path_constraints(shoulder_band());
    let response = interface.solve(&free_scene(), &request);

    assert!(response.is_success());
    assert!(!response.diagnostics.unwrap().approximation_used);
    assert!(interface
        .last_planning_context()
        .unwrap()
        .constraint_approximations()
        .is_none());
}

#[test]
fn test_configure_constraints_follows_toggle() {
    let interface = default_interface();
    let context = interface.get_planning_context_by_name("arm", None).unwrap();
    assert!(context.constraint_approximations().is_some());

    interface.use_constraints_approximations(false);
    interface.configure_constraints(&context);
    assert!(context.constraint_approximations().is_none());

    interface.use_constraints_approximations(true);
    interface.configure_constraints(&context);
    assert!(Arc::ptr_eq(
        &context.constraint_approximations().unwrap(),
        interface.constraint_approximations()
    ));
}

#[test]
fn test_add_constraint_approximation_validates_input() {
    let interface = default_interface();
    let err = interface
        .add_constraint_approximation(&shoulder_band(), "gripper", None, free_scene())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidGroup);

    let err = interface
        .add_constraint_approximation(&Constraints::new(), ARM_GROUP, None, free_scene())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidRequest);

    let err = interface
        .add_constraint_approximation(&shoulder_band(), ARM_GROUP, Some("PoseModel"), free_scene())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedFactoryType);
    assert!(interface.constraint_approximations().is_empty());
}

#[test]
fn test_approximations_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("approximations.bin");

    let interface = default_interface();
    interface
        .add_constraint_approximation(&shoulder_band(), ARM_GROUP, None, free_scene())
        .unwrap();
    interface.save_constraint_approximations(&path).unwrap();

    let fresh = default_interface();
    assert_eq!(fresh.load_constraint_approximations(&path).unwrap(), 1);
    let found = fresh
        .constraint_approximations()
        .find(&shoulder_band().signature(), ARM_GROUP)
        .unwrap();
    assert_eq!(
        found.state_count(),
        interface.constraint_approximations().entries()[0].state_count()
    );
}

#[test]
fn test_non_finite_constraint_never_reaches_saved_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("approximations.bin");

    let interface = default_interface();
    interface
        .add_constraint_approximation(&shoulder_band(), ARM_GROUP, None, free_scene())
        .unwrap();
    let unbounded =
        Constraints::named("unbounded").with_joint(JointConstraint::new("elbow", 0.0, f64::INFINITY));
    let err = interface
        .add_constraint_approximation(&unbounded, ARM_GROUP, None, free_scene())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(interface.constraint_approximations().len(), 1);

    interface.save_constraint_approximations(&path).unwrap();
    let fresh = default_interface();
    assert_eq!(fresh.load_constraint_approximations(&path).unwrap(), 1);
}

#[test]
fn test_solve_detailed_reports_stages() {
    let interface = default_interface();
    let response = interface.solve_detailed(&free_scene(), &simple_request());

    assert!(response.is_success());
    assert!(response.stage("prefix").is_none());
    let plan = response.stage("plan").unwrap();
    let dense = response.stage("interpolate").unwrap();
    assert!(dense.trajectory.len() > plan.trajectory.len());
    assert_eq!(dense.trajectory.waypoints.first(), plan.trajectory.waypoints.first());
    assert_eq!(dense.trajectory.waypoints.last(), plan.trajectory.waypoints.last());

    let resolution = interface.settings().interpolation_resolution;
    for pair in dense.trajectory.waypoints.windows(2) {
        let step: f64 = pair[0]
            .iter()
            .zip(&pair[1])
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(step <= resolution + 1e-9);
    }
}

#[test]
fn test_solve_detailed_includes_prefix_stage() {
    let interface = default_interface();
    let scene = scene(ObstacleScene::free().with_box(vec![-0.05, -0.05], vec![0.05, 0.05]));
    let response = interface.solve_detailed(&scene, &simple_request().with_planner("RandomTree"));

    assert!(response.is_success(), "{:?}", response.message);
    let descriptions: Vec<_> = response.stages.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(descriptions, vec!["prefix", "plan", "interpolate"]);
}

#[test]
fn test_plan_path_from_named_configuration() {
    let interface = default_interface();
    let path = interface
        .plan_path(
            &free_scene(),
            "arm",
            &[0.0, 0.0],
            &[joint_goal(1.0, 1.0)],
            None,
            1.0,
            None,
        )
        .unwrap();
    assert_eq!(path.waypoints[0], vec![0.0, 0.0]);

    let blocked = scene(ObstacleScene::free().with_box(vec![-0.1, -0.1], vec![0.1, 0.1]));
    let err = interface
        .plan_path(&blocked, "arm", &[0.0, 0.0], &[joint_goal(1.0, 1.0)], None, 1.0, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StartStateInCollision);

    let err = interface
        .plan_path(&free_scene(), "arm", &[0.0, 0.0], &[joint_goal(1.0, 1.0)], None, -1.0, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTimeout);
}

#[test]
fn test_registered_engine_handles_its_planner_id() {
    let default = Arc::new(CountingEngine::new(StraightLineEngine::new()));
    let tree = Arc::new(CountingEngine::new(RandomTreeEngine));
    let interface = interface_with(default.clone());
    interface.register_engine("RandomTree", tree.clone());

    let response = interface.solve(&free_scene(), &simple_request().with_planner("RandomTree"));
    assert!(response.is_success());
    assert_eq!(tree.calls(), 1);
    assert_eq!(default.calls(), 0);
    assert_eq!(interface.engine_for("Unknown").name(), "StraightLine");
}

#[test]
fn test_pose_goal_plans_through_ik() {
    let interface = default_interface();
    let mut solvers: HashMap<String, Arc<dyn IkSolver>> = HashMap::new();
    solvers.insert(ARM_GROUP.to_string(), Arc::new(PlanarArmIk));
    interface.specify_ik_solvers(solvers);

    let goal = Constraints::new().with_position(PositionConstraint::new(TIP_LINK, [1.0, 1.0, 0.0], 0.05));
    let request = MotionPlanRequest::new(ARM_GROUP)
        .with_start_state(arm_state(0.0, 0.0))
        .with_goal(goal);
    let response = interface.solve(&free_scene(), &request);

    assert!(response.is_success(), "{:?}", response.message);
    let context = interface.last_planning_context().unwrap();
    assert_eq!(context.factory_type(), StateSpaceFactory::PoseModel);
    let last = response.trajectory.unwrap().waypoints.last().unwrap().clone();
    let tip = PlanarArm::tip_pose(&last);
    assert!(tip.distance_to(&[1.0, 1.0, 0.0]) <= 0.05 + 1e-9);
}

#[test]
fn test_benchmark_collects_runs_per_configuration() {
    let interface = default_interface();
    let config = BenchmarkConfig::new("arm-bench").with_run_count(2);
    let result = interface
        .benchmark(&free_scene(), &simple_request(), &config)
        .unwrap();

    assert!(!result.cancelled);
    assert_eq!(result.total_runs(), 4);
    let names: Vec<_> = result.configurations.iter().map(|c| c.configuration.as_str()).collect();
    assert_eq!(names, vec!["arm", "arm[RandomTree]"]);
    for configuration in &result.configurations {
        assert_eq!(configuration.success_rate(), 1.0);
        assert!(configuration.average_path_length().is_some());
        assert!(configuration.min_solve_time() <= configuration.max_solve_time());
    }
}

#[test]
fn test_benchmark_rejects_unknown_configuration() {
    let interface = default_interface();
    let config = BenchmarkConfig::new("bench").with_configuration("arm[Missing]");
    let err = interface
        .benchmark(&free_scene(), &simple_request(), &config)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
}

#[test]
fn test_terminate_solve_stops_benchmark() {
    let interface = interface_with(Arc::new(StallingEngine::new()));
    let config = BenchmarkConfig::new("bench")
        .with_run_count(5)
        .with_configuration("arm");
    let request = simple_request().with_timeout(30.0);

    let result = thread::scope(|s| {
        let runner = s.spawn(|| interface.benchmark(&free_scene(), &request, &config));
        wait_until_solving(&interface);
        interface.terminate_solve();
        runner.join().unwrap()
    })
    .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.total_runs(), 1);
    assert_eq!(result.configurations[0].runs[0].error_code, ErrorCode::Cancelled);
    assert!(!interface.terminate_solve());
}
