//! Planar two-link arm fixture.
//!
//! Group `arm` has joints `shoulder` and `elbow`, both limited to
//! `[-PI, PI]`, and unit-length links. The `tip` link sits at the end of
//! the second link; its orientation is a rotation about z by
//! `shoulder + elbow`.
//!
//! # Example
//!
//! ```
//! use planforge_core::RobotModel;
//! use planforge_test::arm::PlanarArm;
//!
//! let arm = PlanarArm::new();
//! let group = arm.group("arm").unwrap();
//! let pose = arm.link_pose(group, "tip", &[0.0, 0.0]).unwrap();
//! assert!((pose.position[0] - 2.0).abs() < 1e-12);
//! ```

use std::f64::consts::PI;

use planforge_core::{IkSolver, JointLimits, JointModelGroup, Pose, Quaternion, RobotModel};

pub const ARM_GROUP: &str = "arm";
pub const TIP_LINK: &str = "tip";

/// Planar two-link arm.
#[derive(Debug, Clone)]
pub struct PlanarArm {
    groups: Vec<JointModelGroup>,
}

impl PlanarArm {
    pub fn new() -> Self {
        let arm = JointModelGroup::new(
            ARM_GROUP,
            vec![
                JointLimits::new("shoulder", -PI, PI),
                JointLimits::new("elbow", -PI, PI),
            ],
        )
        .with_tip_link(TIP_LINK);
        Self { groups: vec![arm] }
    }

    /// Forward kinematics of the tip.
    pub fn tip_pose(q: &[f64]) -> Pose {
        let x = q[0].cos() + (q[0] + q[1]).cos();
        let y = q[0].sin() + (q[0] + q[1]).sin();
        Pose::new([x, y, 0.0], Quaternion::from_yaw(q[0] + q[1]))
    }
}

impl Default for PlanarArm {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotModel for PlanarArm {
    fn group(&self, name: &str) -> Option<&JointModelGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    fn link_pose(&self, group: &JointModelGroup, link: &str, positions: &[f64]) -> Option<Pose> {
        if group.name != ARM_GROUP || link != TIP_LINK || positions.len() != 2 {
            return None;
        }
        Some(Self::tip_pose(positions))
    }

    fn has_link(&self, link: &str) -> bool {
        link == TIP_LINK
    }
}

/// Analytic IK for the tip position of [`PlanarArm`].
///
/// Picks the elbow branch closest to the seed. Orientation is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarArmIk;

impl IkSolver for PlanarArmIk {
    fn solve(
        &self,
        group: &JointModelGroup,
        link: &str,
        pose: &Pose,
        seed: &[f64],
    ) -> Option<Vec<f64>> {
        if group.name != ARM_GROUP || link != TIP_LINK {
            return None;
        }
        let [x, y, _] = pose.position;
        let r2 = x * x + y * y;
        let cos_elbow = (r2 - 2.0) / 2.0;
        if !(-1.0..=1.0).contains(&cos_elbow) {
            return None;
        }
        let candidates = [cos_elbow.acos(), -cos_elbow.acos()].map(|elbow| {
            let shoulder = y.atan2(x) - elbow.sin().atan2(1.0 + elbow.cos());
            vec![wrap(shoulder), elbow]
        });
        candidates.into_iter().min_by(|a, b| {
            let da = seed_distance(a, seed);
            let db = seed_distance(b, seed);
            da.total_cmp(&db)
        })
    }
}

fn wrap(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

fn seed_distance(q: &[f64], seed: &[f64]) -> f64 {
    q.iter().zip(seed).map(|(a, b)| (a - b).abs()).sum()
}
