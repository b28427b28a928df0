//! Top-level planning interface.
//!
//! [`PlanningInterface`] owns the configuration registry, the context
//! manager and the constraint approximation store, and drives solves:
//! request validation, multi-attempt planning under a deadline, benchmark
//! runs and cross-thread cancellation.

mod benchmark;
mod solve;

#[cfg(test)]
mod tests;

pub use benchmark::{BenchmarkConfig, BenchmarkResult, BenchmarkRun, ConfigurationBenchmark};
pub use solve::{PreparedSolve, StartPrefix};

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use planforge_config::{InterfaceConfig, PlannerConfigRegistry, PlannerConfiguration, PlanningConfig};
use planforge_core::{
    Constraints, IkSolver, JointStateSpace, KinematicConstraintSet, PlanForgeError, PlanningEngine,
    PlanningScene, Result, RobotModel,
};

use crate::approximation::{ConstrainedSampler, ConstraintApproximation, ConstraintApproximationStore};
use crate::context::PlanningContext;
use crate::manager::{PlanningContextManager, StateSpaceFactory};
use crate::request::MotionPlanRequest;

/// Motion planning front end.
///
/// `solve` and `benchmark` run on the caller's thread; `terminate_solve`
/// may be called from any other thread while they run.
pub struct PlanningInterface {
    settings: InterfaceConfig,
    motion_resolution: f64,
    registry: Arc<PlannerConfigRegistry>,
    manager: PlanningContextManager,
    store: Arc<ConstraintApproximationStore>,
    use_approximations: AtomicBool,
    default_engine: Arc<dyn PlanningEngine>,
    engines: RwLock<HashMap<String, Arc<dyn PlanningEngine>>>,
    benchmark_cancel: Mutex<Option<Arc<AtomicBool>>>,
    /// Set while a solve is between preparation and its attempt loop.
    solve_cancel: Mutex<Option<Arc<AtomicBool>>>,
}

impl std::fmt::Debug for PlanningInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningInterface")
            .field("settings", &self.settings)
            .field("manager", &self.manager)
            .field("approximations", &self.store.len())
            .field("default_engine", &self.default_engine.name())
            .finish()
    }
}

impl PlanningInterface {
    /// Creates an interface for `model`, planning with `engine` unless a
    /// configuration's planner id has its own engine registered.
    pub fn new(
        model: Arc<dyn RobotModel>,
        engine: Arc<dyn PlanningEngine>,
        config: PlanningConfig,
    ) -> Self {
        let registry = Arc::new(PlannerConfigRegistry::new());
        registry.register(config.planner_configs);
        let store = ConstraintApproximationStore::new(config.approximation.clone())
            .with_seed(config.interface.random_seed);
        tracing::info!(
            configurations = registry.len(),
            engine = engine.name(),
            "Planning interface ready"
        );
        Self {
            use_approximations: AtomicBool::new(config.interface.use_constraints_approximations),
            settings: config.interface,
            motion_resolution: config.approximation.motion_resolution,
            manager: PlanningContextManager::new(model, registry.clone()),
            registry,
            store: Arc::new(store),
            default_engine: engine,
            engines: RwLock::new(HashMap::new()),
            benchmark_cancel: Mutex::new(None),
            solve_cancel: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &InterfaceConfig {
        &self.settings
    }

    /// Replaces every planner configuration.
    pub fn set_planner_configurations(&self, configurations: Vec<PlannerConfiguration>) {
        self.registry.register(configurations);
    }

    pub fn planner_configurations(&self) -> &PlannerConfigRegistry {
        &self.registry
    }

    /// Enables the pose-model factory for the given groups.
    pub fn specify_ik_solvers(&self, solvers: HashMap<String, Arc<dyn IkSolver>>) {
        self.manager.set_ik_solvers(solvers);
    }

    /// Routes configurations with this planner id to `engine`.
    pub fn register_engine(&self, planner_id: impl Into<String>, engine: Arc<dyn PlanningEngine>) {
        self.engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(planner_id.into(), engine);
    }

    /// The engine for a planner id, falling back to the default engine.
    pub fn engine_for(&self, planner_id: &str) -> Arc<dyn PlanningEngine> {
        self.engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(planner_id)
            .cloned()
            .unwrap_or_else(|| self.default_engine.clone())
    }

    pub fn context_manager(&self) -> &PlanningContextManager {
        &self.manager
    }

    pub fn constraint_approximations(&self) -> &Arc<ConstraintApproximationStore> {
        &self.store
    }

    pub fn use_constraints_approximations(&self, enabled: bool) {
        self.use_approximations.store(enabled, Ordering::Release);
    }

    pub fn is_using_constraints_approximations(&self) -> bool {
        self.use_approximations.load(Ordering::Acquire)
    }

    /// Gives `context` the approximation store when approximations are
    /// enabled, and takes it away otherwise.
    pub fn configure_constraints(&self, context: &PlanningContext) {
        if self.is_using_constraints_approximations() {
            context.set_constraint_approximations(Some(self.store.clone()));
        } else {
            context.set_constraint_approximations(None);
        }
    }

    /// A context for a request, with constraints configured.
    pub fn get_planning_context(&self, request: &MotionPlanRequest) -> Result<Arc<PlanningContext>> {
        let context = self.manager.get_planning_context_for_request(request)?;
        self.prepare_context(&context);
        Ok(context)
    }

    /// A context for a named configuration, with constraints configured.
    pub fn get_planning_context_by_name(
        &self,
        config_name: &str,
        factory_type: Option<&str>,
    ) -> Result<Arc<PlanningContext>> {
        let context = self.manager.get_planning_context(config_name, factory_type)?;
        self.prepare_context(&context);
        Ok(context)
    }

    pub fn last_planning_context(&self) -> Option<Arc<PlanningContext>> {
        self.manager.last_planning_context()
    }

    /// Cancels the running solve or benchmark, if any.
    ///
    /// Returns true if something was signalled. Contexts that already
    /// finished ignore the request. A solve that is still preparing picks
    /// the request up once its context starts solving.
    pub fn terminate_solve(&self) -> bool {
        let mut signalled = false;
        for slot in [&self.benchmark_cancel, &self.solve_cancel] {
            if let Some(flag) = slot.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
                flag.store(true, Ordering::Release);
                signalled = true;
            }
        }
        if let Some(context) = self.manager.last_planning_context() {
            signalled |= context.terminate();
        }
        if signalled {
            tracing::info!("Solve termination requested");
        }
        signalled
    }

    /// Replaces the approximation store's contents with the file at `path`.
    pub fn load_constraint_approximations(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.store.load(path)
    }

    pub fn save_constraint_approximations(&self, path: impl AsRef<Path>) -> Result<()> {
        self.store.save(path)
    }

    /// Builds an approximation for `constraints` on `group` and adds it to
    /// the store.
    ///
    /// # Errors
    ///
    /// - [`PlanForgeError::InvalidGroup`] for unknown groups
    /// - [`PlanForgeError::InvalidRequest`] for empty or unbindable constraints
    /// - [`PlanForgeError::UnsupportedFactoryType`] for unusable factories
    /// - [`PlanForgeError::ApproximationBuildFailed`] if sampling finds nothing
    pub fn add_constraint_approximation(
        &self,
        constraints: &Constraints,
        group: &str,
        factory_type: Option<&str>,
        scene: Arc<dyn PlanningScene>,
    ) -> Result<Arc<ConstraintApproximation>> {
        let model = self.manager.robot_model();
        let joint_group = model
            .group(group)
            .ok_or_else(|| PlanForgeError::InvalidGroup(group.to_string()))?;
        if constraints.is_empty() {
            return Err(PlanForgeError::InvalidRequest(
                "cannot approximate an empty constraint set".to_string(),
            ));
        }
        let has_ik = self.manager.ik_solver(group).is_some();
        StateSpaceFactory::select(factory_type, joint_group, false, has_ik)?;

        let bound = KinematicConstraintSet::new(constraints, joint_group, model.clone())?;
        let sampler = ConstrainedSampler::new(JointStateSpace::new(joint_group.clone()), bound, scene);
        self.store.build(&constraints.signature(), group, &sampler)
    }

    fn prepare_context(&self, context: &PlanningContext) {
        self.configure_constraints(context);
        context.set_motion_resolution(self.motion_resolution);
    }
}
