//! Kinematic constraints on goal and path states.
//!
//! - [`Constraints`]: a named set of joint, position and orientation constraints
//! - [`KinematicConstraintSet`]: evaluates a `Constraints` against group positions
//! - [`ConstraintSignature`]: normalized, order-independent cache key

mod kinematic;
mod signature;


pub use kinematic::{ConstraintEvaluation, JointBound, KinematicConstraintSet};
pub use signature::ConstraintSignature;

use serde::{Deserialize, Serialize};

use crate::geometry::Quaternion;

/// Bounds a single joint to `[position - tolerance_below, position + tolerance_above]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConstraint {
    pub joint_name: String,
    pub position: f64,
    pub tolerance_above: f64,
    pub tolerance_below: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl JointConstraint {
    /// Symmetric tolerance around `position`.
    pub fn new(joint_name: impl Into<String>, position: f64, tolerance: f64) -> Self {
        Self {
            joint_name: joint_name.into(),
            position,
            tolerance_above: tolerance,
            tolerance_below: tolerance,
            weight: 1.0,
        }
    }
}

/// Keeps a link origin within `tolerance` of `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionConstraint {
    pub link_name: String,
    pub target: [f64; 3],
    pub tolerance: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl PositionConstraint {
    pub fn new(link_name: impl Into<String>, target: [f64; 3], tolerance: f64) -> Self {
        Self {
            link_name: link_name.into(),
            target,
            tolerance,
            weight: 1.0,
        }
    }
}

/// Keeps a link orientation within per-axis absolute tolerances of `orientation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationConstraint {
    pub link_name: String,
    pub orientation: Quaternion,
    pub absolute_x_axis_tolerance: f64,
    pub absolute_y_axis_tolerance: f64,
    pub absolute_z_axis_tolerance: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl OrientationConstraint {
    pub fn new(link_name: impl Into<String>, orientation: Quaternion, tolerance: [f64; 3]) -> Self {
        Self {
            link_name: link_name.into(),
            orientation,
            absolute_x_axis_tolerance: tolerance[0],
            absolute_y_axis_tolerance: tolerance[1],
            absolute_z_axis_tolerance: tolerance[2],
            weight: 1.0,
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A conjunction of kinematic constraints.
///
/// # Example
///
/// ```
/// use planforge_core::{Constraints, JointConstraint};
///
/// let goal = Constraints::named("reach")
///     .with_joint(JointConstraint::new("shoulder", 0.5, 0.01))
///     .with_joint(JointConstraint::new("elbow", -0.5, 0.01));
///
/// assert_eq!(goal.len(), 2);
/// assert!(!goal.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub joint_constraints: Vec<JointConstraint>,
    #[serde(default)]
    pub position_constraints: Vec<PositionConstraint>,
    #[serde(default)]
    pub orientation_constraints: Vec<OrientationConstraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_joint(mut self, constraint: JointConstraint) -> Self {
        self.joint_constraints.push(constraint);
        self
    }

    pub fn with_position(mut self, constraint: PositionConstraint) -> Self {
        self.position_constraints.push(constraint);
        self
    }

    pub fn with_orientation(mut self, constraint: OrientationConstraint) -> Self {
        self.orientation_constraints.push(constraint);
        self
    }

    pub fn len(&self) -> usize {
        self.joint_constraints.len()
            + self.position_constraints.len()
            + self.orientation_constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if any constraint refers to a link pose.
    pub fn has_pose_constraints(&self) -> bool {
        !self.position_constraints.is_empty() || !self.orientation_constraints.is_empty()
    }

    pub fn signature(&self) -> ConstraintSignature {
        ConstraintSignature::from_constraints(self)
    }
}
