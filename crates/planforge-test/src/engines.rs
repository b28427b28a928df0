//! Reference planning engines for tests.
//!
//! None of these is meant as a production planner; they exercise the
//! orchestration layer with predictable behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use planforge_core::{EngineFailure, PlannedPath, PlanningEngine, PlanningProblem, Termination};
use rand::{Rng, RngCore};

/// Tries straight lines from the start to sampled goal states.
#[derive(Debug, Clone)]
pub struct StraightLineEngine {
    max_iterations: usize,
}

impl StraightLineEngine {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
        }
    }

    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for StraightLineEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanningEngine for StraightLineEngine {
    fn name(&self) -> &str {
        "StraightLine"
    }

    fn plan(
        &self,
        problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure> {
        if !problem.is_state_valid(problem.start) {
            return Err(EngineFailure::InvalidProblem("start state invalid".into()));
        }
        for _ in 0..self.max_iterations {
            if termination.is_terminated() {
                return Err(EngineFailure::Terminated);
            }
            let Some(goal) = problem.goal.sample_goal(rng) else {
                return Err(EngineFailure::Exhausted);
            };
            if problem.is_state_valid(&goal) && problem.is_motion_valid(problem.start, &goal) {
                return Ok(PlannedPath::new(vec![problem.start.to_vec(), goal]));
            }
        }
        Err(EngineFailure::Exhausted)
    }
}

/// Single-tree random exploration with goal biasing.
///
/// Parameters read from the planner configuration:
/// `range` (step length, default 0.3) and `goal_bias` (default 0.1).
#[derive(Debug, Clone, Default)]
pub struct RandomTreeEngine;

impl PlanningEngine for RandomTreeEngine {
    fn name(&self) -> &str {
        "RandomTree"
    }

    fn plan(
        &self,
        problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure> {
        if !problem.is_state_valid(problem.start) {
            return Err(EngineFailure::InvalidProblem("start state invalid".into()));
        }
        let range: f64 = problem.parameter("range").unwrap_or(0.3);
        let goal_bias: f64 = problem.parameter("goal_bias").unwrap_or(0.1);
        let space = problem.space;

        let mut nodes: Vec<(Vec<f64>, Option<usize>)> = vec![(problem.start.to_vec(), None)];

        loop {
            if termination.is_terminated() {
                return Err(EngineFailure::Terminated);
            }

            let target = if rng.random_bool(goal_bias.clamp(0.0, 1.0)) {
                problem
                    .goal
                    .sample_goal(rng)
                    .unwrap_or_else(|| problem.sampler.sample(rng))
            } else {
                problem.sampler.sample(rng)
            };

            let nearest = nodes
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    space
                        .distance(&a.0, &target)
                        .total_cmp(&space.distance(&b.0, &target))
                })
                .map(|(i, _)| i)
                .unwrap_or(0);

            let from = nodes[nearest].0.clone();
            let d = space.distance(&from, &target);
            let next = if d > range {
                space.interpolate(&from, &target, range / d)
            } else {
                target
            };

            if !problem.is_motion_valid(&from, &next) {
                continue;
            }
            nodes.push((next, Some(nearest)));
            let last = nodes.len() - 1;

            if problem.goal.is_satisfied(&nodes[last].0) {
                let mut waypoints = Vec::new();
                let mut cursor = Some(last);
                while let Some(i) = cursor {
                    waypoints.push(nodes[i].0.clone());
                    cursor = nodes[i].1;
                }
                waypoints.reverse();
                return Ok(PlannedPath::new(waypoints));
            }
        }
    }
}

/// Never succeeds; polls the termination condition every millisecond.
#[derive(Debug, Default)]
pub struct StallingEngine {
    calls: AtomicUsize,
}

impl StallingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlanningEngine for StallingEngine {
    fn name(&self) -> &str {
        "Stalling"
    }

    fn plan(
        &self,
        _problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        _rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        while !termination.is_terminated() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(EngineFailure::Terminated)
    }
}

/// Replays a fixed script of outcomes, one per call.
///
/// `Some(cost)` returns a two-waypoint path (start, sampled goal) reporting
/// `cost`; `None` fails with [`EngineFailure::Exhausted`]. Calls beyond the
/// script fail. An optional delay runs before each outcome.
#[derive(Debug)]
pub struct ScriptedEngine {
    script: Vec<Option<f64>>,
    delay: Duration,
    calls: AtomicUsize,
    costs_returned: Mutex<Vec<f64>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            costs_returned: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn costs_returned(&self) -> Vec<f64> {
        self.costs_returned
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl PlanningEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn plan(
        &self,
        problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if termination.is_terminated() {
            return Err(EngineFailure::Terminated);
        }
        match self.script.get(call).copied().flatten() {
            Some(cost) => {
                let goal = problem.goal.sample_goal(rng).ok_or(EngineFailure::Exhausted)?;
                if let Ok(mut costs) = self.costs_returned.lock() {
                    costs.push(cost);
                }
                Ok(PlannedPath::new(vec![problem.start.to_vec(), goal]).with_cost(cost))
            }
            None => Err(EngineFailure::Exhausted),
        }
    }
}

/// Wraps an engine and counts invocations.
#[derive(Debug, Default)]
pub struct CountingEngine<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E> CountingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: PlanningEngine> PlanningEngine for CountingEngine<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn plan(
        &self,
        problem: &PlanningProblem<'_>,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> Result<PlannedPath, EngineFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.plan(problem, termination, rng)
    }
}
