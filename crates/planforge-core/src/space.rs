//! Joint state space of a group.

use rand::{Rng, RngCore};

use crate::constraint::JointBound;
use crate::robot::JointModelGroup;

/// Bounded joint space of a [`JointModelGroup`].
///
/// States are plain `Vec<f64>` in group joint order.
///
/// # Example
///
/// ```
/// use planforge_core::{JointLimits, JointModelGroup, JointStateSpace};
///
/// let group = JointModelGroup::new("arm", vec![
///     JointLimits::new("shoulder", -1.0, 1.0),
///     JointLimits::new("elbow", -1.0, 1.0),
/// ]);
/// let space = JointStateSpace::new(group);
///
/// assert_eq!(space.dimension(), 2);
/// assert!((space.distance(&[0.0, 0.0], &[0.3, 0.4]) - 0.5).abs() < 1e-12);
/// assert_eq!(space.interpolate(&[0.0, 0.0], &[1.0, -1.0], 0.5), vec![0.5, -0.5]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JointStateSpace {
    group: JointModelGroup,
}

impl JointStateSpace {
    pub fn new(group: JointModelGroup) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &JointModelGroup {
        &self.group
    }

    pub fn dimension(&self) -> usize {
        self.group.dimension()
    }

    /// Draws a state uniformly within the joint limits.
    pub fn sample_uniform(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.group
            .joints
            .iter()
            .map(|j| j.min + rng.random::<f64>() * (j.max - j.min))
            .collect()
    }

    /// Draws a state uniformly, narrowing the listed joints to their bounds.
    ///
    /// Bounds that do not overlap the joint limits are ignored.
    pub fn sample_bounded<'a>(
        &self,
        bounds: impl IntoIterator<Item = &'a JointBound>,
        rng: &mut dyn RngCore,
    ) -> Vec<f64> {
        let mut state = self.sample_uniform(rng);
        for bound in bounds {
            let Some(joint) = self.group.joints.get(bound.index) else {
                continue;
            };
            let lo = bound.min.max(joint.min);
            let hi = bound.max.min(joint.max);
            if lo <= hi {
                state[bound.index] = lo + rng.random::<f64>() * (hi - lo);
            }
        }
        state
    }

    /// Draws a state uniformly within `bound` of `near` on every axis, clamped to limits.
    pub fn sample_near(&self, near: &[f64], bound: f64, rng: &mut dyn RngCore) -> Vec<f64> {
        let mut state: Vec<f64> = near
            .iter()
            .map(|v| v + (2.0 * rng.random::<f64>() - 1.0) * bound)
            .collect();
        self.enforce_bounds(&mut state);
        state
    }

    /// Euclidean distance in joint space.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// Linear interpolation; `t = 0` yields `from`, `t = 1` yields `to`.
    pub fn interpolate(&self, from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
        from.iter().zip(to).map(|(a, b)| a + (b - a) * t).collect()
    }

    /// Clamps every coordinate into its joint limits.
    pub fn enforce_bounds(&self, state: &mut [f64]) {
        for (value, joint) in state.iter_mut().zip(&self.group.joints) {
            *value = value.clamp(joint.min, joint.max);
        }
    }

    pub fn satisfies_bounds(&self, state: &[f64]) -> bool {
        state.len() == self.dimension()
            && state
                .iter()
                .zip(&self.group.joints)
                .all(|(v, j)| j.contains(*v))
    }

    /// States strictly after `from` up to and including `to`, spaced at most `resolution` apart.
    pub fn discretize(&self, from: &[f64], to: &[f64], resolution: f64) -> Vec<Vec<f64>> {
        let steps = self.step_count(from, to, resolution);
        (1..=steps)
            .map(|i| self.interpolate(from, to, i as f64 / steps as f64))
            .collect()
    }

    /// Checks the straight-line motion `from -> to` at `resolution`.
    ///
    /// `from` itself is assumed valid and not re-checked.
    pub fn check_motion<F>(&self, from: &[f64], to: &[f64], resolution: f64, is_valid: F) -> bool
    where
        F: Fn(&[f64]) -> bool,
    {
        let steps = self.step_count(from, to, resolution);
        (1..=steps).all(|i| is_valid(&self.interpolate(from, to, i as f64 / steps as f64)))
    }

    fn step_count(&self, from: &[f64], to: &[f64], resolution: f64) -> usize {
        let d = self.distance(from, to);
        if resolution <= 0.0 || !resolution.is_finite() {
            return 1;
        }
        ((d / resolution).ceil() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::JointLimits;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn space() -> JointStateSpace {
        JointStateSpace::new(JointModelGroup::new(
            "arm",
            vec![
                JointLimits::new("a", -1.0, 1.0),
                JointLimits::new("b", 0.0, 2.0),
            ],
        ))
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let space = space();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let s = space.sample_uniform(&mut rng);
            assert!(space.satisfies_bounds(&s));
            let n = space.sample_near(&[0.95, 1.95], 0.5, &mut rng);
            assert!(space.satisfies_bounds(&n));
        }
    }

    #[test]
    fn test_check_motion_detects_blocked_segment() {
        let space = space();
        let blocked = |s: &[f64]| !(s[0] > 0.4 && s[0] < 0.6);
        assert!(!space.check_motion(&[0.0, 1.0], &[1.0, 1.0], 0.01, blocked));
        assert!(space.check_motion(&[0.0, 1.0], &[0.3, 1.0], 0.01, blocked));
    }

    #[test]
    fn test_discretize_ends_at_target() {
        let space = space();
        let points = space.discretize(&[0.0, 0.0], &[1.0, 0.0], 0.25);
        assert_eq!(points.len(), 4);
        assert_eq!(points.last(), Some(&vec![1.0, 0.0]));
    }
}
