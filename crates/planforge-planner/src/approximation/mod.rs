//! Constraint approximations: sampled graphs of states satisfying a
//! recurring constraint set, cached per (signature, group).

mod build;
mod graph;
mod persistence;
mod store;


pub use build::{ConstrainedSampler, ManifoldSampler};
pub use graph::{Adjacency, GraphDefect, ManifoldGraph};
pub use store::ConstraintApproximationStore;

use planforge_core::{ConstraintSignature, Constraints};
use serde::{Deserialize, Serialize};

/// Cache key of an approximation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApproximationKey {
    pub signature: ConstraintSignature,
    pub group: String,
}

impl ApproximationKey {
    pub fn new(signature: ConstraintSignature, group: impl Into<String>) -> Self {
        Self {
            signature,
            group: group.into(),
        }
    }
}

/// How an approximation was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Candidates drawn, accepted or not.
    pub samples_drawn: u64,
    pub build_millis: u64,
    /// Constraint tolerances in force during the build, in declaration order.
    pub tolerances: Vec<f64>,
}

impl BuildMetadata {
    /// Collects every tolerance of `constraints`.
    pub fn tolerances_of(constraints: &Constraints) -> Vec<f64> {
        let joints = constraints
            .joint_constraints
            .iter()
            .flat_map(|c| [c.tolerance_above, c.tolerance_below]);
        let positions = constraints.position_constraints.iter().map(|c| c.tolerance);
        let orientations = constraints.orientation_constraints.iter().flat_map(|c| {
            [
                c.absolute_x_axis_tolerance,
                c.absolute_y_axis_tolerance,
                c.absolute_z_axis_tolerance,
            ]
        });
        joints.chain(positions).chain(orientations).collect()
    }
}

/// A sampled approximation of the states satisfying one constraint set.
///
/// Every stored state satisfied the constraint predicate when it was
/// accepted, and every edge was motion-checked at build time. The
/// approximation is immutable once published to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintApproximation {
    key: ApproximationKey,
    graph: ManifoldGraph,
    storage_path: String,
    metadata: BuildMetadata,
}

impl ConstraintApproximation {
    pub fn new(
        key: ApproximationKey,
        graph: ManifoldGraph,
        storage_path: impl Into<String>,
        metadata: BuildMetadata,
    ) -> Self {
        Self {
            key,
            graph,
            storage_path: storage_path.into(),
            metadata,
        }
    }

    pub fn key(&self) -> &ApproximationKey {
        &self.key
    }

    pub fn signature(&self) -> &ConstraintSignature {
        &self.key.signature
    }

    pub fn group(&self) -> &str {
        &self.key.group
    }

    pub fn graph(&self) -> &ManifoldGraph {
        &self.graph
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    pub fn state_count(&self) -> usize {
        self.graph.state_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
