//! Joint-space obstacle scene.

use planforge_core::{JointModelGroup, PlanningScene, RobotState};

/// Axis-aligned box of forbidden group positions.
#[derive(Debug, Clone, PartialEq)]
pub struct JointBox {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl JointBox {
    pub fn contains(&self, q: &[f64]) -> bool {
        q.len() == self.min.len()
            && q
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }
}

/// Planning scene whose obstacles are boxes in joint space.
///
/// # Example
///
/// ```
/// use planforge_core::{JointLimits, JointModelGroup, PlanningScene};
/// use planforge_test::scene::ObstacleScene;
///
/// let group = JointModelGroup::new("arm", vec![JointLimits::new("a", -1.0, 1.0)]);
/// let scene = ObstacleScene::free().with_box(vec![0.2], vec![0.4]);
///
/// assert!(scene.is_state_valid(&group, &[0.0]));
/// assert!(!scene.is_state_valid(&group, &[0.3]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObstacleScene {
    current: RobotState,
    obstacles: Vec<JointBox>,
}

impl ObstacleScene {
    /// A scene without obstacles, robot at the origin.
    pub fn free() -> Self {
        Self::default()
    }

    pub fn with_current_state(mut self, state: RobotState) -> Self {
        self.current = state;
        self
    }

    pub fn with_box(mut self, min: Vec<f64>, max: Vec<f64>) -> Self {
        self.obstacles.push(JointBox { min, max });
        self
    }

    /// A wall splitting the arm's shoulder range, with a gap at high elbow angles.
    pub fn wall_with_gap() -> Self {
        Self::free()
            .with_box(vec![-0.2, -4.0], vec![0.2, 1.0])
            .with_current_state(RobotState::new().with_joint("shoulder", -1.0).with_joint("elbow", 0.0))
    }
}

impl PlanningScene for ObstacleScene {
    fn current_state(&self) -> RobotState {
        self.current.clone()
    }

    fn is_state_valid(&self, _group: &JointModelGroup, positions: &[f64]) -> bool {
        !self.obstacles.iter().any(|b| b.contains(positions))
    }
}
