//! Capability interface of the underlying sampling-based planning engine.
//!
//! The engine is opaque to PlanForge: it receives a [`PlanningProblem`]
//! (state space, start, goal region, validity checker, sampler) and a
//! [`Termination`] condition, and either returns a path or fails. Engines
//! must poll the termination condition at bounded iteration intervals;
//! that poll is how deadlines and external cancellation reach the search.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;

use rand::RngCore;
use thiserror::Error;

use crate::space::JointStateSpace;

/// Algorithm-specific key/value settings of a planner configuration.
pub type PlannerParameters = BTreeMap<String, String>;

/// Condition under which a running search must stop.
pub trait Termination: Send + Sync + Debug {
    /// Returns true if the search should stop now.
    fn is_terminated(&self) -> bool;
}

impl<T: Termination + ?Sized> Termination for &T {
    fn is_terminated(&self) -> bool {
        (**self).is_terminated()
    }
}

/// State validity (collision and path constraints).
pub trait StateValidity: Send + Sync {
    fn is_valid(&self, state: &[f64]) -> bool;
}

impl<F> StateValidity for F
where
    F: Fn(&[f64]) -> bool + Send + Sync,
{
    fn is_valid(&self, state: &[f64]) -> bool {
        self(state)
    }
}

/// Source of candidate states for the search.
pub trait StateSampler: Send + Sync {
    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64>;
}

/// Goal test and goal sampling.
pub trait GoalRegion: Send + Sync {
    fn is_satisfied(&self, state: &[f64]) -> bool;

    /// Distance to the goal region; zero inside it.
    fn distance(&self, state: &[f64]) -> f64;

    /// Draws a state inside the goal region, if the region can be sampled.
    fn sample_goal(&self, rng: &mut dyn RngCore) -> Option<Vec<f64>>;
}

/// Everything an engine needs for one attempt, borrowed from the planning context.
pub struct PlanningProblem<'a> {
    pub space: &'a JointStateSpace,
    pub start: &'a [f64],
    pub goal: &'a dyn GoalRegion,
    pub validity: &'a dyn StateValidity,
    pub sampler: &'a dyn StateSampler,
    pub parameters: &'a PlannerParameters,
    /// Maximum joint-space step between checked states along a motion.
    pub motion_resolution: f64,
}

impl PlanningProblem<'_> {
    /// Parses a planner parameter, returning `None` if absent or malformed.
    pub fn parameter<T: FromStr>(&self, key: &str) -> Option<T> {
        self.parameters.get(key).and_then(|v| v.parse().ok())
    }

    pub fn is_state_valid(&self, state: &[f64]) -> bool {
        self.space.satisfies_bounds(state) && self.validity.is_valid(state)
    }

    /// Checks the straight-line motion between two states.
    pub fn is_motion_valid(&self, from: &[f64], to: &[f64]) -> bool {
        self.space
            .check_motion(from, to, self.motion_resolution, |s| self.is_state_valid(s))
    }
}

/// A path produced by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath {
    pub waypoints: Vec<Vec<f64>>,
    /// Engine-reported quality; lower is better.
    pub cost: f64,
}

impl PlannedPath {
    /// Creates a path whose cost is its joint-space length.
    ///
    /// # Example
    ///
    /// ```
    /// use planforge_core::PlannedPath;
    ///
    /// let path = PlannedPath::new(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![3.0, 5.0]]);
    /// assert!((path.length() - 6.0).abs() < 1e-12);
    /// assert_eq!(path.cost, path.length());
    /// ```
    pub fn new(waypoints: Vec<Vec<f64>>) -> Self {
        let cost = path_length(&waypoints);
        Self { waypoints, cost }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Sum of Euclidean segment lengths.
    pub fn length(&self) -> f64 {
        path_length(&self.waypoints)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

fn path_length(waypoints: &[Vec<f64>]) -> f64 {
    waypoints
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

/// Why an engine returned without a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFailure {
    /// The termination condition fired before a path was found.
    #[error("search terminated")]
    Terminated,

    /// The engine gave up on its own (iteration limit, disconnected space).
    #[error("search exhausted")]
    Exhausted,

    /// The engine rejected the problem (e.g. invalid start).
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
}

/// The underlying sampling-based planning engine.
pub trait PlanningEngine: Send + Sync {
    /// Planner identifier, matched against `PlannerConfiguration::planner_id`.
    fn name(&self) -> &str;

    /// Searches for a path from `problem.start` into `problem.goal`.
    fn plan(
        &self,
        problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure>;
}
