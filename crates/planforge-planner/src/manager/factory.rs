//! State-space construction strategies.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use planforge_config::PlannerConfiguration;
use planforge_core::{IkSolver, JointModelGroup, JointStateSpace, PlanForgeError, RobotModel};

use crate::context::PlanningContext;

/// How a context's state space is constructed.
///
/// Selected by name or, when no name is given, by the highest priority
/// among the factories able to represent the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSpaceFactory {
    /// Plain joint space; goals are reached by sampling joint values.
    JointModel,
    /// Joint space with pose goals sampled through the group's IK solver.
    /// Requires an IK solver for the group.
    PoseModel,
}

impl StateSpaceFactory {
    pub const ALL: [StateSpaceFactory; 2] = [StateSpaceFactory::JointModel, StateSpaceFactory::PoseModel];

    pub fn name(self) -> &'static str {
        match self {
            StateSpaceFactory::JointModel => "JointModel",
            StateSpaceFactory::PoseModel => "PoseModel",
        }
    }

    /// Suitability for a group, or `None` if the factory cannot represent it.
    pub fn priority(self, pose_goals: bool, has_ik: bool) -> Option<u32> {
        match self {
            StateSpaceFactory::JointModel => Some(100),
            StateSpaceFactory::PoseModel if !has_ik => None,
            StateSpaceFactory::PoseModel if pose_goals => Some(200),
            StateSpaceFactory::PoseModel => Some(50),
        }
    }

    /// Picks a factory for `group`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::UnsupportedFactoryType`] for unknown names
    /// and for factories that cannot represent the group.
    pub fn select(
        requested: Option<&str>,
        group: &JointModelGroup,
        pose_goals: bool,
        has_ik: bool,
    ) -> Result<Self, PlanForgeError> {
        let unsupported = |factory: &str| PlanForgeError::UnsupportedFactoryType {
            factory: factory.to_string(),
            group: group.name.clone(),
        };
        match requested.filter(|r| !r.is_empty()) {
            Some(name) => {
                let factory: StateSpaceFactory = name.parse().map_err(|_| unsupported(name))?;
                factory
                    .priority(pose_goals, has_ik)
                    .map(|_| factory)
                    .ok_or_else(|| unsupported(name))
            }
            None => Self::ALL
                .into_iter()
                .filter_map(|f| f.priority(pose_goals, has_ik).map(|p| (p, f)))
                .max_by_key(|(p, _)| *p)
                .map(|(_, f)| f)
                .ok_or_else(|| unsupported("default")),
        }
    }

    pub(crate) fn build_context(
        self,
        id: u64,
        configuration: Arc<PlannerConfiguration>,
        group: &JointModelGroup,
        model: Arc<dyn RobotModel>,
        ik: Option<Arc<dyn IkSolver>>,
    ) -> PlanningContext {
        let space = JointStateSpace::new(group.clone());
        let ik = match self {
            StateSpaceFactory::JointModel => None,
            StateSpaceFactory::PoseModel => ik,
        };
        PlanningContext::new(id, configuration, self, space, model, ik)
    }
}

impl fmt::Display for StateSpaceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateSpaceFactory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown state space factory '{s}'"))
    }
}
