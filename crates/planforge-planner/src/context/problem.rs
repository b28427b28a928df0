//! Adapters exposing a context's setup to the planning engine.

use std::sync::Arc;

use planforge_core::{
    GoalRegion, IkSolver, JointStateSpace, KinematicConstraintSet, PlanningScene, Pose, Quaternion,
    StateSampler, StateValidity,
};
use rand::{Rng, RngCore};

use crate::approximation::ConstraintApproximation;

/// Rejection-sampling draws per goal sample.
const GOAL_SAMPLE_TRIES: usize = 200;

/// Scene validity plus path constraints.
pub(crate) struct ContextValidity<'a> {
    pub space: &'a JointStateSpace,
    pub scene: &'a Arc<dyn PlanningScene>,
    pub path: Option<&'a KinematicConstraintSet>,
}

impl StateValidity for ContextValidity<'_> {
    fn is_valid(&self, state: &[f64]) -> bool {
        self.scene.is_state_valid(self.space.group(), state)
            && self.path.map_or(true, |p| p.is_satisfied(state))
    }
}

/// Satisfied when any goal constraint set is.
pub(crate) struct ConstraintGoal<'a> {
    pub space: &'a JointStateSpace,
    pub goals: &'a [KinematicConstraintSet],
    pub ik: Option<&'a dyn IkSolver>,
}

impl ConstraintGoal<'_> {
    fn sample_from(&self, goal: &KinematicConstraintSet, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        if let (Some(ik), Some((link, pose))) = (self.ik, pose_target(goal)) {
            let seed = self.space.sample_uniform(rng);
            if let Some(q) = ik.solve(self.space.group(), &link, &pose, &seed) {
                if self.space.satisfies_bounds(&q) && goal.is_satisfied(&q) {
                    return Some(q);
                }
            }
        }
        (0..GOAL_SAMPLE_TRIES)
            .map(|_| self.space.sample_bounded(goal.joint_bounds(), rng))
            .find(|q| goal.is_satisfied(q))
    }
}

impl GoalRegion for ConstraintGoal<'_> {
    fn is_satisfied(&self, state: &[f64]) -> bool {
        self.goals.iter().any(|g| g.is_satisfied(state))
    }

    fn distance(&self, state: &[f64]) -> f64 {
        self.goals
            .iter()
            .map(|g| g.decide(state).distance)
            .fold(f64::INFINITY, f64::min)
    }

    fn sample_goal(&self, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        if self.goals.is_empty() {
            return None;
        }
        let first = rng.random_range(0..self.goals.len());
        (0..self.goals.len())
            .map(|offset| &self.goals[(first + offset) % self.goals.len()])
            .find_map(|goal| self.sample_from(goal, rng))
    }
}

/// IK target of a pose goal: position from the first position constraint,
/// orientation from the first orientation constraint on the same link.
fn pose_target(goal: &KinematicConstraintSet) -> Option<(String, Pose)> {
    let constraints = goal.constraints();
    let position = constraints.position_constraints.first();
    let link = position
        .map(|p| p.link_name.clone())
        .or_else(|| constraints.orientation_constraints.first().map(|o| o.link_name.clone()))?;
    let orientation = constraints
        .orientation_constraints
        .iter()
        .find(|o| o.link_name == link)
        .map(|o| o.orientation)
        .unwrap_or(Quaternion::IDENTITY);
    let target = position.map(|p| p.target).unwrap_or([0.0; 3]);
    Some((link, Pose::new(target, orientation)))
}

/// Uniform sampling, biased towards an attached approximation.
pub(crate) struct ContextSampler<'a> {
    pub space: &'a JointStateSpace,
    pub path: Option<&'a KinematicConstraintSet>,
    pub approximation: Option<&'a ConstraintApproximation>,
    pub explore_bound: f64,
}

impl StateSampler for ContextSampler<'_> {
    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        if let Some(approximation) = self.approximation.filter(|a| a.state_count() > 0) {
            if rng.random_bool(0.5) {
                let index = rng.random_range(0..approximation.state_count()) as u32;
                let anchor = approximation.graph().state(index);
                return self.space.sample_near(anchor, self.explore_bound, rng);
            }
        }
        match self.path {
            Some(path) => self.space.sample_bounded(path.joint_bounds(), rng),
            None => self.space.sample_uniform(rng),
        }
    }
}
