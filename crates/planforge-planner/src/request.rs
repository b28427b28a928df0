//! Motion plan requests and responses.

use std::time::Duration;

use planforge_core::{Constraints, ErrorCode, PlannerParameters, RobotState};

use crate::context::SolveDiagnostics;

/// A motion planning request.
///
/// # Example
///
/// ```
/// use planforge_core::{Constraints, JointConstraint, RobotState};
/// use planforge_planner::MotionPlanRequest;
///
/// let request = MotionPlanRequest::new("arm")
///     .with_start_state(RobotState::new().with_joint("shoulder", 0.0))
///     .with_goal(Constraints::new().with_joint(JointConstraint::new("elbow", 1.0, 0.05)))
///     .with_planner("RandomTree")
///     .with_timeout(2.0)
///     .with_attempts(3);
///
/// assert_eq!(request.num_planning_attempts, Some(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionPlanRequest {
    pub group_name: String,
    /// Possibly partial; missing joints come from the scene's current state.
    pub start_state: RobotState,
    /// The path must end inside any one of these sets.
    pub goal_constraints: Vec<Constraints>,
    pub path_constraints: Option<Constraints>,
    /// Planner configuration name, or a hint combined with the group name.
    pub planner_id: String,
    /// Overrides on top of the configuration's parameters.
    pub planner_parameters: PlannerParameters,
    /// Seconds; the interface default applies when `None`.
    pub allowed_planning_time: Option<f64>,
    pub num_planning_attempts: Option<u32>,
}

impl MotionPlanRequest {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            ..Self::default()
        }
    }

    pub fn with_start_state(mut self, start: RobotState) -> Self {
        self.start_state = start;
        self
    }

    pub fn with_goal(mut self, goal: Constraints) -> Self {
        self.goal_constraints.push(goal);
        self
    }

    pub fn with_path_constraints(mut self, path: Constraints) -> Self {
        self.path_constraints = Some(path);
        self
    }

    pub fn with_planner(mut self, planner_id: impl Into<String>) -> Self {
        self.planner_id = planner_id.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.planner_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.allowed_planning_time = Some(seconds);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.num_planning_attempts = Some(attempts);
        self
    }
}

/// Waypoints of a group, in group joint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub waypoints: Vec<Vec<f64>>,
}

impl JointTrajectory {
    pub fn new(joint_names: Vec<String>, waypoints: Vec<Vec<f64>>) -> Self {
        Self {
            joint_names,
            waypoints,
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Joint-space length.
    pub fn length(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(&w[1])
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt()
            })
            .sum()
    }

    /// Appends `next`, dropping its first waypoint when it repeats our last.
    pub fn append(&mut self, next: &JointTrajectory) {
        let skip = match (self.waypoints.last(), next.waypoints.first()) {
            (Some(a), Some(b)) if a == b => 1,
            _ => 0,
        };
        self.waypoints
            .extend(next.waypoints.iter().skip(skip).cloned());
        if self.joint_names.is_empty() {
            self.joint_names = next.joint_names.clone();
        }
    }
}

/// Result of [`solve`](crate::PlanningInterface::solve).
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlanResponse {
    pub error_code: ErrorCode,
    /// Human-readable detail for failures.
    pub message: Option<String>,
    pub group_name: String,
    /// Prefix motion (if any) followed by the planned path. Absent on failure.
    pub trajectory: Option<JointTrajectory>,
    pub planning_time: Duration,
    pub diagnostics: Option<SolveDiagnostics>,
}

impl MotionPlanResponse {
    pub(crate) fn failure(
        group_name: &str,
        error_code: ErrorCode,
        message: impl Into<String>,
        planning_time: Duration,
    ) -> Self {
        Self {
            error_code,
            message: Some(message.into()),
            group_name: group_name.to_string(),
            trajectory: None,
            planning_time,
            diagnostics: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_success()
    }
}

/// One stage of a detailed response.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStage {
    pub description: String,
    pub trajectory: JointTrajectory,
    pub processing_time: Duration,
}

/// Result of [`solve_detailed`](crate::PlanningInterface::solve_detailed):
/// the stages `prefix` (only when a prefix motion was needed), `plan` and
/// `interpolate`.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlanDetailedResponse {
    pub error_code: ErrorCode,
    pub message: Option<String>,
    pub group_name: String,
    pub stages: Vec<PlanStage>,
    pub diagnostics: Option<SolveDiagnostics>,
}

impl MotionPlanDetailedResponse {
    pub fn stage(&self, description: &str) -> Option<&PlanStage> {
        self.stages.iter().find(|s| s.description == description)
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_success()
    }
}
