//! Sampling loop that grows a manifold graph.

use std::sync::Arc;
use std::time::Instant;

use planforge_config::ApproximationConfig;
use planforge_core::{
    JointStateSpace, KinematicConstraintSet, PlanForgeError, PlanningScene, Result, Termination,
};
use rand::{Rng, RngCore};
use rayon::prelude::*;

use super::graph::ManifoldGraph;
use super::BuildMetadata;

/// Draw limit per requested sample; bounds builds whose predicate is
/// (nearly) unsatisfiable.
const MAX_DRAWS_PER_SAMPLE: usize = 50;

/// Candidate source and predicate for an approximation build.
pub trait ManifoldSampler: Send + Sync {
    /// State space the samples live in.
    fn space(&self) -> &JointStateSpace;

    /// Draws a fresh candidate.
    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64>;

    /// Draws a candidate within `bound` of `state`.
    fn sample_near(&self, state: &[f64], bound: f64, rng: &mut dyn RngCore) -> Vec<f64> {
        self.space().sample_near(state, bound, rng)
    }

    /// Constraint predicate plus state validity.
    fn is_valid(&self, state: &[f64]) -> bool;

    /// Tolerances the predicate applies, recorded with the build.
    fn tolerances(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Samples states satisfying a constraint set in a collision-free scene.
///
/// Joint constraints narrow the uniform draw to their bounds, which keeps
/// acceptance high for joint-space constraints.
pub struct ConstrainedSampler {
    space: JointStateSpace,
    constraints: KinematicConstraintSet,
    scene: Arc<dyn PlanningScene>,
}

impl ConstrainedSampler {
    pub fn new(
        space: JointStateSpace,
        constraints: KinematicConstraintSet,
        scene: Arc<dyn PlanningScene>,
    ) -> Self {
        Self {
            space,
            constraints,
            scene,
        }
    }

    pub fn constraints(&self) -> &KinematicConstraintSet {
        &self.constraints
    }
}

impl ManifoldSampler for ConstrainedSampler {
    fn space(&self) -> &JointStateSpace {
        &self.space
    }

    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.space.sample_bounded(self.constraints.joint_bounds(), rng)
    }

    fn is_valid(&self, state: &[f64]) -> bool {
        self.space.satisfies_bounds(state)
            && self.constraints.is_satisfied(state)
            && self.scene.is_state_valid(self.space.group(), state)
    }

    fn tolerances(&self) -> Vec<f64> {
        BuildMetadata::tolerances_of(self.constraints.constraints())
    }
}

/// What one build produced.
#[derive(Debug)]
pub(crate) struct BuildOutcome {
    pub graph: ManifoldGraph,
    pub samples_drawn: u64,
    pub build_millis: u64,
}

/// Grows a graph until `config.samples` states are accepted, the draw limit
/// is hit or `termination` fires.
///
/// Accepted states are joined to up to `max_neighbors` earlier states within
/// `connection_radius` whose straight-line motion stays valid at
/// `motion_resolution`; those motion checks run in parallel.
pub(crate) fn grow(
    sampler: &dyn ManifoldSampler,
    config: &ApproximationConfig,
    termination: &dyn Termination,
    rng: &mut dyn RngCore,
) -> Result<BuildOutcome> {
    let started = Instant::now();
    let space = sampler.space();
    let mut graph = ManifoldGraph::new(space.dimension());
    let max_draws = config.samples.saturating_mul(MAX_DRAWS_PER_SAMPLE).max(1);
    let mut drawn = 0usize;

    while graph.state_count() < config.samples && drawn < max_draws {
        if termination.is_terminated() {
            tracing::debug!(accepted = graph.state_count(), "Approximation build terminated");
            break;
        }
        drawn += 1;

        let candidate = if graph.is_empty() || rng.random_bool(0.5) {
            sampler.sample(rng)
        } else {
            let anchor = rng.random_range(0..graph.state_count()) as u32;
            sampler.sample_near(graph.state(anchor), config.explore_bound, rng)
        };
        if !sampler.is_valid(&candidate) {
            tracing::trace!(drawn, "Rejected candidate");
            continue;
        }

        let neighbours = graph.nearest(&candidate, config.max_neighbors, config.connection_radius);
        let connected: Vec<u32> = neighbours
            .par_iter()
            .copied()
            .filter(|&n| {
                space.check_motion(
                    graph.state(n),
                    &candidate,
                    config.motion_resolution,
                    |s| sampler.is_valid(s),
                )
            })
            .collect();

        let index = graph.add_state(&candidate);
        for n in connected {
            graph.add_edge(index, n);
        }
        tracing::trace!(index, edges = graph.edge_count(), "Accepted candidate");
    }

    if graph.is_empty() {
        return Err(PlanForgeError::ApproximationBuildFailed(format!(
            "no valid sample in {drawn} draws"
        )));
    }

    Ok(BuildOutcome {
        graph,
        samples_drawn: drawn as u64,
        build_millis: started.elapsed().as_millis() as u64,
    })
}
