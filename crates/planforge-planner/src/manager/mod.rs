//! Resolution of requests and configuration names into planning contexts.

mod factory;

#[cfg(test)]
mod tests;

pub use factory::StateSpaceFactory;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use planforge_config::PlannerConfigRegistry;
use planforge_core::{IkSolver, JointModelGroup, PlanForgeError, Result, RobotModel};

use crate::context::PlanningContext;
use crate::request::MotionPlanRequest;

/// Builds planning contexts and remembers the most recent one.
///
/// The "last" context is an observational handle for diagnostics; nothing
/// in the manager reads it to decide anything.
pub struct PlanningContextManager {
    model: Arc<dyn RobotModel>,
    registry: Arc<PlannerConfigRegistry>,
    ik_solvers: RwLock<HashMap<String, Arc<dyn IkSolver>>>,
    next_id: AtomicU64,
    last: Mutex<Option<Arc<PlanningContext>>>,
}

impl std::fmt::Debug for PlanningContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningContextManager")
            .field("configurations", &self.registry.len())
            .field("contexts_created", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl PlanningContextManager {
    pub fn new(model: Arc<dyn RobotModel>, registry: Arc<PlannerConfigRegistry>) -> Self {
        Self {
            model,
            registry,
            ik_solvers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn robot_model(&self) -> &Arc<dyn RobotModel> {
        &self.model
    }

    pub fn registry(&self) -> &Arc<PlannerConfigRegistry> {
        &self.registry
    }

    /// Replaces the per-group IK solvers.
    pub fn set_ik_solvers(&self, solvers: HashMap<String, Arc<dyn IkSolver>>) {
        tracing::debug!(groups = solvers.len(), "Specified IK solvers");
        *self.ik_solvers.write().unwrap_or_else(PoisonError::into_inner) = solvers;
    }

    pub fn ik_solver(&self, group: &str) -> Option<Arc<dyn IkSolver>> {
        self.ik_solvers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .cloned()
    }

    /// Builds a fresh context for a named configuration.
    ///
    /// # Errors
    ///
    /// - [`PlanForgeError::ConfigNotFound`] if no configuration has that name
    /// - [`PlanForgeError::InvalidGroup`] if its group is unknown to the robot model
    /// - [`PlanForgeError::UnsupportedFactoryType`] if `factory_type` is unknown
    ///   or cannot represent the group
    pub fn get_planning_context(
        &self,
        config_name: &str,
        factory_type: Option<&str>,
    ) -> Result<Arc<PlanningContext>> {
        self.create(config_name, factory_type, false)
    }

    /// Builds a fresh context for a request and seeds it with the request's
    /// goal, path constraints, planner parameters and (when complete) start.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::InvalidRequest`] if the group is unknown or
    /// the goal is empty, plus the errors of
    /// [`get_planning_context`](Self::get_planning_context).
    pub fn get_planning_context_for_request(
        &self,
        request: &MotionPlanRequest,
    ) -> Result<Arc<PlanningContext>> {
        let group = self.model.group(&request.group_name).ok_or_else(|| {
            PlanForgeError::InvalidRequest(format!("unknown group '{}'", request.group_name))
        })?;
        if request.goal_constraints.is_empty() {
            return Err(PlanForgeError::InvalidRequest("goal is empty".to_string()));
        }

        let name = self.configuration_name(&group.name, &request.planner_id);
        let pose_goals = request
            .goal_constraints
            .iter()
            .any(|g| g.has_pose_constraints());
        let context = self.create(&name, None, pose_goals)?;

        context.set_goal_constraints(&request.goal_constraints)?;
        context.set_path_constraints(request.path_constraints.as_ref())?;
        context.set_planner_parameters(&request.planner_parameters);
        if let Some(start) = group.positions_from(&request.start_state) {
            context.set_start_state(start)?;
        }
        Ok(context)
    }

    /// The most recently created context, if any.
    pub fn last_planning_context(&self) -> Option<Arc<PlanningContext>> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Configuration name for a group and planner hint.
    ///
    /// An empty hint selects the group's default configuration (named after
    /// the group). A hint naming a registered configuration is used as is;
    /// otherwise it becomes `"{group}[{hint}]"`.
    pub fn configuration_name(&self, group: &str, hint: &str) -> String {
        if hint.is_empty() {
            group.to_string()
        } else if self.registry.contains(hint) {
            hint.to_string()
        } else {
            format!("{group}[{hint}]")
        }
    }

    fn create(
        &self,
        config_name: &str,
        factory_type: Option<&str>,
        pose_goals: bool,
    ) -> Result<Arc<PlanningContext>> {
        let configuration = self.registry.resolve(config_name)?;
        let group: &JointModelGroup = self.model.group(&configuration.group).ok_or_else(|| {
            PlanForgeError::InvalidGroup(configuration.group.clone())
        })?;
        let ik = self.ik_solver(&group.name);
        let factory = StateSpaceFactory::select(factory_type, group, pose_goals, ik.is_some())?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let context = Arc::new(factory.build_context(
            id,
            configuration,
            group,
            self.model.clone(),
            ik,
        ));
        tracing::debug!(
            context = id,
            config = config_name,
            factory = factory.name(),
            "Created planning context"
        );

        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(context.clone());
        Ok(context)
    }
}
