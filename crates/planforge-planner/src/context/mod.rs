//! Per-request planning context.
//!
//! A [`PlanningContext`] binds a planner configuration to a state space,
//! a planning scene, start and goal, optional path constraints and at most
//! one constraint approximation. The orchestrator configures it, then runs
//! attempts against it. The cancel flag is the only state another thread
//! may touch while a solve is in progress.

mod diagnostics;
mod problem;


pub use diagnostics::{AttemptFailure, AttemptOutcome, AttemptRecord, SolveDiagnostics, SolvePhase};

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use planforge_config::PlannerConfiguration;
use planforge_core::{
    Constraints, IkSolver, JointStateSpace, KinematicConstraintSet, PlanForgeError, PlannedPath,
    PlannerParameters, PlanningEngine, PlanningProblem, PlanningScene, Result, RobotModel,
    StateValidity, Termination,
};
use rand::RngCore;

use crate::approximation::{ConstraintApproximation, ConstraintApproximationStore};
use crate::manager::StateSpaceFactory;
use problem::{ConstraintGoal, ContextSampler, ContextValidity};

/// Tolerance when comparing an engine path's first waypoint to the start.
const START_TOLERANCE: f64 = 1e-6;

const DEFAULT_MOTION_RESOLUTION: f64 = 0.01;
const DEFAULT_EXPLORE_BOUND: f64 = 0.2;

#[derive(Default)]
struct Setup {
    scene: Option<Arc<dyn PlanningScene>>,
    start: Option<Vec<f64>>,
    goals: Vec<KinematicConstraintSet>,
    path: Option<KinematicConstraintSet>,
    parameters: PlannerParameters,
    store: Option<Arc<ConstraintApproximationStore>>,
    approximation: Option<Arc<ConstraintApproximation>>,
    motion_resolution: f64,
    diagnostics: Option<SolveDiagnostics>,
}

/// What one attempt needs, copied out of [`Setup`].
struct Snapshot {
    scene: Arc<dyn PlanningScene>,
    start: Vec<f64>,
    goals: Vec<KinematicConstraintSet>,
    path: Option<KinematicConstraintSet>,
    parameters: PlannerParameters,
    approximation: Option<Arc<ConstraintApproximation>>,
    motion_resolution: f64,
    explore_bound: f64,
}

/// A configured planning episode.
pub struct PlanningContext {
    id: u64,
    configuration: Arc<PlannerConfiguration>,
    factory: StateSpaceFactory,
    space: JointStateSpace,
    model: Arc<dyn RobotModel>,
    ik: Option<Arc<dyn IkSolver>>,
    cancel: Arc<AtomicBool>,
    phase: AtomicU8,
    setup: Mutex<Setup>,
}

impl fmt::Debug for PlanningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanningContext")
            .field("id", &self.id)
            .field("name", &self.configuration.name)
            .field("factory", &self.factory)
            .field("phase", &self.phase())
            .field("cancel_requested", &self.is_cancel_requested())
            .finish()
    }
}

impl PlanningContext {
    pub(crate) fn new(
        id: u64,
        configuration: Arc<PlannerConfiguration>,
        factory: StateSpaceFactory,
        space: JointStateSpace,
        model: Arc<dyn RobotModel>,
        ik: Option<Arc<dyn IkSolver>>,
    ) -> Self {
        let setup = Setup {
            parameters: configuration.parameters.clone(),
            motion_resolution: DEFAULT_MOTION_RESOLUTION,
            ..Setup::default()
        };
        Self {
            id,
            configuration,
            factory,
            space,
            model,
            ik,
            cancel: Arc::new(AtomicBool::new(false)),
            phase: AtomicU8::new(SolvePhase::Idle as u8),
            setup: Mutex::new(setup),
        }
    }

    /// Manager-unique identifier, increasing with creation order.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the planner configuration this context was built from.
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn configuration(&self) -> &PlannerConfiguration {
        &self.configuration
    }

    pub fn planner_id(&self) -> &str {
        &self.configuration.planner_id
    }

    pub fn group_name(&self) -> &str {
        &self.space.group().name
    }

    pub fn factory_type(&self) -> StateSpaceFactory {
        self.factory
    }

    pub fn space(&self) -> &JointStateSpace {
        &self.space
    }

    pub fn set_planning_scene(&self, scene: Arc<dyn PlanningScene>) {
        self.lock().scene = Some(scene);
    }

    /// Sets the start state in group joint order.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::InvalidRequest`] if the state has the wrong
    /// dimension or lies outside the joint limits.
    pub fn set_start_state(&self, start: Vec<f64>) -> Result<()> {
        if start.len() != self.space.dimension() || !self.space.satisfies_bounds(&start) {
            return Err(PlanForgeError::InvalidRequest(format!(
                "start state {start:?} is not a state of group '{}'",
                self.group_name()
            )));
        }
        self.lock().start = Some(start);
        Ok(())
    }

    pub fn start_state(&self) -> Option<Vec<f64>> {
        self.lock().start.clone()
    }

    /// Binds the goal constraint sets; a path must end inside any one of them.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::InvalidGoalConstraints`] if `goals` is empty,
    /// if any set is empty, or if a set references unknown joints or links.
    pub fn set_goal_constraints(&self, goals: &[Constraints]) -> Result<()> {
        if goals.is_empty() || goals.iter().any(Constraints::is_empty) {
            return Err(PlanForgeError::InvalidGoalConstraints(
                "goal constraints are empty".to_string(),
            ));
        }
        let bound = goals
            .iter()
            .map(|g| {
                KinematicConstraintSet::new(g, self.space.group(), self.model.clone())
                    .map_err(|e| PlanForgeError::InvalidGoalConstraints(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.lock().goals = bound;
        Ok(())
    }

    pub fn goal_count(&self) -> usize {
        self.lock().goals.len()
    }

    /// Binds path constraints; `None` or an empty set clears them.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::InvalidRequest`] for unknown joints or links.
    pub fn set_path_constraints(&self, path: Option<&Constraints>) -> Result<()> {
        let bound = match path.filter(|p| !p.is_empty()) {
            Some(p) => Some(KinematicConstraintSet::new(
                p,
                self.space.group(),
                self.model.clone(),
            )?),
            None => None,
        };
        let mut setup = self.lock();
        setup.path = bound;
        setup.approximation = None;
        Ok(())
    }

    pub fn path_constraints(&self) -> Option<Constraints> {
        self.lock().path.as_ref().map(|p| p.constraints().clone())
    }

    /// Overlays request-level planner parameters onto the configuration's.
    pub fn set_planner_parameters(&self, overrides: &PlannerParameters) {
        let mut setup = self.lock();
        for (key, value) in overrides {
            setup.parameters.insert(key.clone(), value.clone());
        }
    }

    pub fn planner_parameters(&self) -> PlannerParameters {
        self.lock().parameters.clone()
    }

    pub fn set_motion_resolution(&self, resolution: f64) {
        if resolution.is_finite() && resolution > 0.0 {
            self.lock().motion_resolution = resolution;
        }
    }

    /// Gives the context access to (or takes it away from) the store.
    /// Taking it away also detaches any attached approximation.
    pub fn set_constraint_approximations(&self, store: Option<Arc<ConstraintApproximationStore>>) {
        let mut setup = self.lock();
        if store.is_none() {
            setup.approximation = None;
        }
        setup.store = store;
    }

    pub fn constraint_approximations(&self) -> Option<Arc<ConstraintApproximationStore>> {
        self.lock().store.clone()
    }

    /// Looks up the approximation matching the path constraints and attaches
    /// it. A miss leaves the context unbiased. An entry whose states do not
    /// fit this context's state space counts as a miss.
    pub fn attach_approximation(&self) -> Option<Arc<ConstraintApproximation>> {
        let mut setup = self.lock();
        let found = match (&setup.store, &setup.path) {
            (Some(store), Some(path)) => {
                store.find(&path.constraints().signature(), self.group_name())
            }
            _ => None,
        };
        let found = found.filter(|a| {
            let fits = a.graph().dimension() == self.space.dimension();
            if !fits {
                tracing::debug!(
                    context = self.id,
                    approximation_dimension = a.graph().dimension(),
                    space_dimension = self.space.dimension(),
                    "Ignoring constraint approximation of wrong dimension"
                );
            }
            fits
        });
        match &found {
            Some(a) => tracing::debug!(
                context = self.id,
                states = a.state_count(),
                "Attached constraint approximation"
            ),
            None if setup.store.is_some() && setup.path.is_some() => {
                tracing::debug!(context = self.id, "No constraint approximation for path constraints")
            }
            None => {}
        }
        setup.approximation = found.clone();
        found
    }

    pub fn attached_approximation(&self) -> Option<Arc<ConstraintApproximation>> {
        self.lock().approximation.clone()
    }

    pub fn phase(&self) -> SolvePhase {
        SolvePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: SolvePhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Requests cancellation of a running solve.
    ///
    /// Returns false (and does nothing) once the solve reached a terminal
    /// phase.
    pub fn terminate(&self) -> bool {
        if self.phase().is_terminal() {
            return false;
        }
        self.cancel.store(true, Ordering::Release);
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn last_diagnostics(&self) -> Option<SolveDiagnostics> {
        self.lock().diagnostics.clone()
    }

    pub(crate) fn record_diagnostics(&self, diagnostics: SolveDiagnostics) {
        self.lock().diagnostics = Some(diagnostics);
    }

    /// State validity as the context sees it: bounds, scene and path constraints.
    pub fn is_state_valid(&self, state: &[f64]) -> bool {
        let setup = self.lock();
        let Some(scene) = setup.scene.as_ref() else {
            return false;
        };
        let validity = ContextValidity {
            space: &self.space,
            scene,
            path: setup.path.as_ref(),
        };
        self.space.satisfies_bounds(state) && validity.is_valid(state)
    }

    /// Runs one attempt of `engine` and re-validates the returned path.
    ///
    /// The setup is snapshotted first, so the context stays inspectable
    /// while the engine runs.
    pub fn run_attempt(
        &self,
        engine: &dyn PlanningEngine,
        termination: &dyn Termination,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<PlannedPath, AttemptFailure> {
        let Snapshot {
            scene,
            start,
            goals,
            path,
            parameters,
            approximation,
            motion_resolution,
            explore_bound,
        } = self.snapshot()?;

        let validity = ContextValidity {
            space: &self.space,
            scene: &scene,
            path: path.as_ref(),
        };
        let goal = ConstraintGoal {
            space: &self.space,
            goals: &goals,
            ik: self.ik.as_deref(),
        };
        let sampler = ContextSampler {
            space: &self.space,
            path: path.as_ref(),
            approximation: approximation.as_deref(),
            explore_bound,
        };
        let problem = PlanningProblem {
            space: &self.space,
            start: &start,
            goal: &goal,
            validity: &validity,
            sampler: &sampler,
            parameters: &parameters,
            motion_resolution,
        };

        let planned = engine.plan(&problem, termination, rng)?;
        validate_path(&problem, &planned)?;
        Ok(planned)
    }

    fn snapshot(&self) -> std::result::Result<Snapshot, AttemptFailure> {
        let setup = self.lock();
        let scene = setup
            .scene
            .clone()
            .ok_or(AttemptFailure::NotConfigured("a planning scene"))?;
        let start = setup
            .start
            .clone()
            .ok_or(AttemptFailure::NotConfigured("a start state"))?;
        if setup.goals.is_empty() {
            return Err(AttemptFailure::NotConfigured("goal constraints"));
        }
        Ok(Snapshot {
            scene,
            start,
            goals: setup.goals.clone(),
            path: setup.path.clone(),
            parameters: setup.parameters.clone(),
            approximation: setup.approximation.clone(),
            motion_resolution: setup.motion_resolution,
            explore_bound: setup
                .store
                .as_ref()
                .map_or(DEFAULT_EXPLORE_BOUND, |s| s.config().explore_bound),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Setup> {
        self.setup.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_path(
    problem: &PlanningProblem<'_>,
    path: &PlannedPath,
) -> std::result::Result<(), AttemptFailure> {
    let (Some(first), Some(last)) = (path.waypoints.first(), path.waypoints.last()) else {
        return Err(AttemptFailure::EmptyPath);
    };
    if first.len() != problem.start.len()
        || problem.space.distance(first, problem.start) > START_TOLERANCE
    {
        return Err(AttemptFailure::WrongStart);
    }
    if let Some(index) = path
        .waypoints
        .iter()
        .position(|w| w.len() != problem.space.dimension() || !problem.is_state_valid(w))
    {
        return Err(AttemptFailure::InvalidWaypoint(index));
    }
    if !problem.goal.is_satisfied(last) {
        return Err(AttemptFailure::GoalNotReached);
    }
    Ok(())
}
