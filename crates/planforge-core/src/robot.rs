//! Robot model, planning scene and kinematics collaborator interfaces.
//!
//! PlanForge does not model kinematics or collisions itself. The robot
//! model supplies joint groups and forward kinematics, the planning scene
//! supplies the current robot state and state validity, and IK solvers
//! (optional, per group) map poses back to joint positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Pose;

/// A robot state keyed by joint name. May be partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub joint_positions: BTreeMap<String, f64>,
}

impl RobotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from `(joint, position)` pairs.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, f64)>,
        N: Into<String>,
    {
        Self {
            joint_positions: pairs.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    pub fn with_joint(mut self, name: impl Into<String>, position: f64) -> Self {
        self.joint_positions.insert(name.into(), position);
        self
    }

    pub fn position(&self, joint: &str) -> Option<f64> {
        self.joint_positions.get(joint).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.joint_positions.is_empty()
    }
}

/// Position limits of a single joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl JointLimits {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// An ordered set of joints planned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointModelGroup {
    pub name: String,
    pub joints: Vec<JointLimits>,
    /// Link whose pose position/orientation constraints refer to by default.
    pub tip_link: Option<String>,
}

impl JointModelGroup {
    pub fn new(name: impl Into<String>, joints: Vec<JointLimits>) -> Self {
        Self {
            name: name.into(),
            joints,
            tip_link: None,
        }
    }

    pub fn with_tip_link(mut self, link: impl Into<String>) -> Self {
        self.tip_link = Some(link.into());
        self
    }

    pub fn dimension(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Returns the group positions if `state` specifies every joint of the group.
    pub fn positions_from(&self, state: &RobotState) -> Option<Vec<f64>> {
        self.joints.iter().map(|j| state.position(&j.name)).collect()
    }

    /// Overlays the joints present in `partial` onto `base`.
    ///
    /// Joints missing from both fall back to the midpoint of their limits.
    pub fn merge(&self, partial: &RobotState, base: &RobotState) -> Vec<f64> {
        self.joints
            .iter()
            .map(|j| {
                partial
                    .position(&j.name)
                    .or_else(|| base.position(&j.name))
                    .unwrap_or(0.5 * (j.min + j.max))
            })
            .collect()
    }

    /// Converts group positions back into a named robot state.
    pub fn to_robot_state(&self, positions: &[f64]) -> RobotState {
        RobotState::from_pairs(
            self.joints
                .iter()
                .zip(positions)
                .map(|(j, v)| (j.name.clone(), *v)),
        )
    }
}

/// Kinematic model of the robot.
pub trait RobotModel: Send + Sync {
    /// Looks up a joint group by name.
    fn group(&self, name: &str) -> Option<&JointModelGroup>;

    /// Names of all groups.
    fn group_names(&self) -> Vec<String>;

    /// Forward kinematics: pose of `link` for the given group positions.
    fn link_pose(&self, group: &JointModelGroup, link: &str, positions: &[f64]) -> Option<Pose>;

    /// Returns true if the model knows `link`.
    fn has_link(&self, link: &str) -> bool;
}

/// Planning scene: the current world as seen by the planner.
pub trait PlanningScene: Send + Sync {
    /// The robot's current (complete) state.
    fn current_state(&self) -> RobotState;

    /// Collision / validity check for group positions.
    fn is_state_valid(&self, group: &JointModelGroup, positions: &[f64]) -> bool;
}

/// Inverse kinematics for one group.
pub trait IkSolver: Send + Sync {
    /// Returns group positions placing `link` at `pose`, searching from `seed`.
    fn solve(
        &self,
        group: &JointModelGroup,
        link: &str,
        pose: &Pose,
        seed: &[f64],
    ) -> Option<Vec<f64>>;
}
