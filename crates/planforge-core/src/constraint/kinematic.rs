//! Evaluation of constraints against group positions.

use std::fmt;
use std::sync::Arc;

use crate::error::{PlanForgeError, Result};
use crate::robot::{JointModelGroup, RobotModel};

use super::Constraints;

/// Outcome of evaluating a constraint set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintEvaluation {
    pub satisfied: bool,
    /// Weighted violation; zero when satisfied, infinite when undecidable.
    pub distance: f64,
}

impl ConstraintEvaluation {
    fn undecidable() -> Self {
        Self {
            satisfied: false,
            distance: f64::INFINITY,
        }
    }
}

/// Bounds of one joint constraint, resolved to a group joint index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBound {
    pub index: usize,
    pub min: f64,
    pub max: f64,
}

/// A [`Constraints`] bound to a group and robot model.
///
/// Construction resolves joint names to indices and checks that every
/// referenced link exists, so evaluation never fails on unknown names.
#[derive(Clone)]
pub struct KinematicConstraintSet {
    constraints: Constraints,
    group: JointModelGroup,
    joint_bounds: Vec<(JointBound, f64)>,
    model: Arc<dyn RobotModel>,
}

impl fmt::Debug for KinematicConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinematicConstraintSet")
            .field("constraints", &self.constraints)
            .field("group", &self.group.name)
            .finish()
    }
}

impl KinematicConstraintSet {
    /// Binds `constraints` to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::InvalidRequest`] if a joint is not part of the
    /// group, a link is unknown to the model, a tolerance is negative, or any
    /// numeric parameter is NaN or infinite.
    pub fn new(
        constraints: &Constraints,
        group: &JointModelGroup,
        model: Arc<dyn RobotModel>,
    ) -> Result<Self> {
        let mut joint_bounds = Vec::with_capacity(constraints.joint_constraints.len());
        for jc in &constraints.joint_constraints {
            let index = group.joint_index(&jc.joint_name).ok_or_else(|| {
                PlanForgeError::InvalidRequest(format!(
                    "joint '{}' is not part of group '{}'",
                    jc.joint_name, group.name
                ))
            })?;
            check_values(
                &jc.joint_name,
                &[jc.position],
                &[jc.tolerance_above, jc.tolerance_below],
            )?;
            joint_bounds.push((
                JointBound {
                    index,
                    min: jc.position - jc.tolerance_below,
                    max: jc.position + jc.tolerance_above,
                },
                jc.weight,
            ));
        }

        for pc in &constraints.position_constraints {
            check_values(&pc.link_name, &pc.target, &[pc.tolerance])?;
        }
        for oc in &constraints.orientation_constraints {
            let q = oc.orientation;
            check_values(
                &oc.link_name,
                &[q.x, q.y, q.z, q.w],
                &[
                    oc.absolute_x_axis_tolerance,
                    oc.absolute_y_axis_tolerance,
                    oc.absolute_z_axis_tolerance,
                ],
            )?;
        }

        let links = constraints
            .position_constraints
            .iter()
            .map(|c| &c.link_name)
            .chain(constraints.orientation_constraints.iter().map(|c| &c.link_name));
        for link in links {
            if !model.has_link(link) {
                return Err(PlanForgeError::InvalidRequest(format!(
                    "unknown link '{link}'"
                )));
            }
        }

        Ok(Self {
            constraints: constraints.clone(),
            group: group.clone(),
            joint_bounds,
            model,
        })
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn group(&self) -> &JointModelGroup {
        &self.group
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Joint bounds in group index space, for samplers that draw inside them.
    pub fn joint_bounds(&self) -> impl Iterator<Item = &JointBound> {
        self.joint_bounds.iter().map(|(b, _)| b)
    }

    /// Evaluates every constraint for `positions`.
    pub fn decide(&self, positions: &[f64]) -> ConstraintEvaluation {
        let mut distance = 0.0;

        for (bound, weight) in &self.joint_bounds {
            let Some(&value) = positions.get(bound.index) else {
                return ConstraintEvaluation::undecidable();
            };
            let violation = (value - bound.max).max(bound.min - value).max(0.0);
            distance += weight * violation;
        }

        for pc in &self.constraints.position_constraints {
            let Some(pose) = self.model.link_pose(&self.group, &pc.link_name, positions) else {
                return ConstraintEvaluation::undecidable();
            };
            let violation = (pose.distance_to(&pc.target) - pc.tolerance).max(0.0);
            distance += pc.weight * violation;
        }

        for oc in &self.constraints.orientation_constraints {
            let Some(pose) = self.model.link_pose(&self.group, &oc.link_name, positions) else {
                return ConstraintEvaluation::undecidable();
            };
            let diff = oc
                .orientation
                .normalized()
                .conjugate()
                .mul(&pose.orientation.normalized());
            let (roll, pitch, yaw) = diff.to_euler();
            let violation = (roll.abs() - oc.absolute_x_axis_tolerance).max(0.0)
                + (pitch.abs() - oc.absolute_y_axis_tolerance).max(0.0)
                + (yaw.abs() - oc.absolute_z_axis_tolerance).max(0.0);
            distance += oc.weight * violation;
        }

        ConstraintEvaluation {
            satisfied: distance <= 0.0,
            distance,
        }
    }

    pub fn is_satisfied(&self, positions: &[f64]) -> bool {
        self.decide(positions).satisfied
    }
}

/// Rejects values that would not survive the signature text form.
fn check_values(subject: &str, values: &[f64], tolerances: &[f64]) -> Result<()> {
    if values.iter().chain(tolerances).any(|v| !v.is_finite()) {
        return Err(PlanForgeError::InvalidRequest(format!(
            "non-finite value in constraint on '{subject}'"
        )));
    }
    if tolerances.iter().any(|t| *t < 0.0) {
        return Err(PlanForgeError::InvalidRequest(format!(
            "negative tolerance in constraint on '{subject}'"
        )));
    }
    Ok(())
}
