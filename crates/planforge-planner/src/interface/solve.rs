//! The solve family: preparation, the attempt loop and response assembly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use planforge_core::{
    Constraints, EngineFailure, ErrorCode, JointModelGroup, JointStateSpace, PlanForgeError, PlannedPath,
    PlanningScene, Result, Termination,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::PlanningInterface;
use crate::context::{
    AttemptFailure, AttemptOutcome, AttemptRecord, PlanningContext, SolveDiagnostics, SolvePhase,
};
use crate::request::{
    JointTrajectory, MotionPlanDetailedResponse, MotionPlanRequest, MotionPlanResponse, PlanStage,
};
use crate::termination::{AttemptTermination, ExternalTermination, OrTermination, TimeTermination};

/// Separates the start-repair stream from the attempt streams of one seed.
const REPAIR_SEED_SALT: u64 = 0x5eed_57a7_0000_0001;

/// A validated request with a ready-to-run context.
#[derive(Debug, Clone)]
pub struct PreparedSolve {
    pub context: Arc<PlanningContext>,
    pub attempts: u32,
    pub timeout: Duration,
    /// Present when the start had to be moved to a valid state.
    pub prefix: Option<StartPrefix>,
}

/// Motion from the requested start to the repaired one.
#[derive(Debug, Clone, PartialEq)]
pub struct StartPrefix {
    /// The repaired start, where planning begins.
    pub state: Vec<f64>,
    pub trajectory: JointTrajectory,
    /// Execution time at the nominal joint velocity.
    pub time: Duration,
}

/// Result of the attempt loop.
struct SolveOutcome {
    path: Result<PlannedPath>,
    diagnostics: SolveDiagnostics,
}

impl PlanningInterface {
    /// Validates a request and builds a ready-to-run context.
    ///
    /// Nothing is planned here. Validation happens before any context is
    /// created, so an invalid timeout or attempt count leaves the manager
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`PlanForgeError::InvalidGroup`] for unknown groups
    /// - [`PlanForgeError::InvalidGoalConstraints`] for empty goals
    /// - [`PlanForgeError::InvalidTimeout`] unless the timeout is positive and finite
    /// - [`PlanForgeError::InvalidRequest`] for zero attempts
    /// - [`PlanForgeError::ConfigNotFound`] / [`PlanForgeError::UnsupportedFactoryType`]
    ///   from context resolution
    /// - [`PlanForgeError::StartStateInCollision`] if no valid start is found nearby
    pub fn prepare_for_solve(
        &self,
        scene: &Arc<dyn PlanningScene>,
        request: &MotionPlanRequest,
    ) -> Result<PreparedSolve> {
        self.preparing(|| self.prepare(scene, request))
    }

    fn prepare(
        &self,
        scene: &Arc<dyn PlanningScene>,
        request: &MotionPlanRequest,
    ) -> Result<PreparedSolve> {
        let group = self
            .manager
            .robot_model()
            .group(&request.group_name)
            .ok_or_else(|| PlanForgeError::InvalidGroup(request.group_name.clone()))?;
        if request.goal_constraints.is_empty() || request.goal_constraints.iter().any(Constraints::is_empty) {
            return Err(PlanForgeError::InvalidGoalConstraints(
                "goal constraints are empty".to_string(),
            ));
        }
        let timeout = self.resolve_timeout(request.allowed_planning_time)?;
        let attempts = match request.num_planning_attempts {
            Some(0) => {
                return Err(PlanForgeError::InvalidRequest(
                    "number of planning attempts must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => self.settings.default_attempts.max(1),
        };

        let context = self.get_planning_context(request)?;
        context.set_phase(SolvePhase::Preparing);
        context.set_planning_scene(scene.clone());

        let prefix = match self.resolve_start(scene.as_ref(), group, request) {
            Ok((start, prefix)) => {
                context.set_start_state(start)?;
                prefix
            }
            Err(e) => {
                context.set_phase(SolvePhase::Failed);
                return Err(e);
            }
        };

        Ok(PreparedSolve {
            context,
            attempts,
            timeout,
            prefix,
        })
    }

    /// Plans a request.
    ///
    /// Runs up to the requested number of attempts, each bounded by what is
    /// left of the timeout. Failures carry a code and, once planning
    /// started, the diagnostics gathered so far; never a path.
    pub fn solve(
        &self,
        scene: &Arc<dyn PlanningScene>,
        request: &MotionPlanRequest,
    ) -> MotionPlanResponse {
        let started = Instant::now();
        tracing::info!(
            group = %request.group_name,
            planner = %request.planner_id,
            "Solving motion plan request"
        );

        let prepared = match self.prepare_for_solve(scene, request) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::info!(code = %e.code(), error = %e, "Motion plan request rejected");
                return MotionPlanResponse::failure(
                    &request.group_name,
                    e.code(),
                    e.to_string(),
                    started.elapsed(),
                );
            }
        };

        let outcome = self.run_attempts(&prepared.context, prepared.attempts, prepared.timeout);
        let joint_names = prepared.context.space().group().joint_names();
        let (error_code, message, trajectory) = match outcome.path {
            Ok(path) => {
                let mut trajectory = prepared
                    .prefix
                    .as_ref()
                    .map(|p| p.trajectory.clone())
                    .unwrap_or_default();
                trajectory.append(&JointTrajectory::new(joint_names, path.waypoints));
                (ErrorCode::Success, None, Some(trajectory))
            }
            Err(e) => (e.code(), Some(e.to_string()), None),
        };

        MotionPlanResponse {
            error_code,
            message,
            group_name: request.group_name.clone(),
            trajectory,
            planning_time: started.elapsed(),
            diagnostics: Some(outcome.diagnostics),
        }
    }

    /// Plans a request and reports the `prefix`, `plan` and `interpolate`
    /// stages separately.
    pub fn solve_detailed(
        &self,
        scene: &Arc<dyn PlanningScene>,
        request: &MotionPlanRequest,
    ) -> MotionPlanDetailedResponse {
        let started = Instant::now();
        let prepared = match self.prepare_for_solve(scene, request) {
            Ok(prepared) => prepared,
            Err(e) => {
                return MotionPlanDetailedResponse {
                    error_code: e.code(),
                    message: Some(e.to_string()),
                    group_name: request.group_name.clone(),
                    stages: Vec::new(),
                    diagnostics: None,
                }
            }
        };
        let prepare_time = started.elapsed();

        let mut stages = Vec::new();
        if let Some(prefix) = &prepared.prefix {
            stages.push(PlanStage {
                description: "prefix".to_string(),
                trajectory: prefix.trajectory.clone(),
                processing_time: prepare_time,
            });
        }

        let solve_started = Instant::now();
        let outcome = self.run_attempts(&prepared.context, prepared.attempts, prepared.timeout);
        let path = match outcome.path {
            Ok(path) => path,
            Err(e) => {
                return MotionPlanDetailedResponse {
                    error_code: e.code(),
                    message: Some(e.to_string()),
                    group_name: request.group_name.clone(),
                    stages,
                    diagnostics: Some(outcome.diagnostics),
                }
            }
        };
        let space = prepared.context.space();
        let joint_names = space.group().joint_names();
        stages.push(PlanStage {
            description: "plan".to_string(),
            trajectory: JointTrajectory::new(joint_names.clone(), path.waypoints.clone()),
            processing_time: solve_started.elapsed(),
        });

        let interpolate_started = Instant::now();
        let dense = densify(space, &path.waypoints, self.settings.interpolation_resolution);
        stages.push(PlanStage {
            description: "interpolate".to_string(),
            trajectory: JointTrajectory::new(joint_names, dense),
            processing_time: interpolate_started.elapsed(),
        });

        MotionPlanDetailedResponse {
            error_code: ErrorCode::Success,
            message: None,
            group_name: request.group_name.clone(),
            stages,
            diagnostics: Some(outcome.diagnostics),
        }
    }

    /// Plans directly from a named configuration, returning the raw path.
    ///
    /// `start` is in group joint order and must be valid; no prefix motion
    /// is produced.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_path(
        &self,
        scene: &Arc<dyn PlanningScene>,
        config_name: &str,
        start: &[f64],
        goal: &[Constraints],
        path_constraints: Option<&Constraints>,
        timeout_seconds: f64,
        factory_type: Option<&str>,
    ) -> Result<PlannedPath> {
        let (context, timeout) = self.preparing(|| {
            let timeout = self.resolve_timeout(Some(timeout_seconds))?;
            let context = self.get_planning_context_by_name(config_name, factory_type)?;
            context.set_phase(SolvePhase::Preparing);
            context.set_planning_scene(scene.clone());
            let configured = context
                .set_start_state(start.to_vec())
                .and_then(|_| context.set_goal_constraints(goal))
                .and_then(|_| context.set_path_constraints(path_constraints));
            if let Err(e) = configured {
                context.set_phase(SolvePhase::Failed);
                return Err(e);
            }
            if !context.is_state_valid(start) {
                context.set_phase(SolvePhase::Failed);
                return Err(PlanForgeError::StartStateInCollision(
                    context.group_name().to_string(),
                ));
            }
            Ok((context, timeout))
        })?;
        let attempts = self.settings.default_attempts.max(1);
        self.run_attempts(&context, attempts, timeout).path
    }

    pub(crate) fn resolve_timeout(&self, seconds: Option<f64>) -> Result<Duration> {
        let seconds = seconds.unwrap_or(self.settings.default_timeout_seconds);
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(PlanForgeError::InvalidTimeout(seconds));
        }
        Duration::try_from_secs_f64(seconds).map_err(|_| PlanForgeError::InvalidTimeout(seconds))
    }

    /// Merges the request start onto the scene's current state and, if the
    /// result is invalid, looks for a valid state nearby.
    fn resolve_start(
        &self,
        scene: &dyn PlanningScene,
        group: &JointModelGroup,
        request: &MotionPlanRequest,
    ) -> Result<(Vec<f64>, Option<StartPrefix>)> {
        let space = JointStateSpace::new(group.clone());
        let merged = group.merge(&request.start_state, &scene.current_state());
        let is_valid = |q: &[f64]| space.satisfies_bounds(q) && scene.is_state_valid(group, q);
        if is_valid(&merged) {
            return Ok((merged, None));
        }

        let mut rng = self.seeded_rng(REPAIR_SEED_SALT);
        let repaired = (0..self.settings.start_repair_attempts)
            .map(|_| space.sample_near(&merged, self.settings.start_repair_distance, &mut rng))
            .find(|q| is_valid(q))
            .ok_or_else(|| PlanForgeError::StartStateInCollision(group.name.clone()))?;

        let distance = space.distance(&merged, &repaired);
        let time = if self.settings.nominal_joint_velocity > 0.0 {
            Duration::try_from_secs_f64(distance / self.settings.nominal_joint_velocity)
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        tracing::warn!(group = %group.name, distance, "Start state invalid; repaired nearby");

        Ok((
            repaired.clone(),
            Some(StartPrefix {
                trajectory: JointTrajectory::new(group.joint_names(), vec![merged, repaired.clone()]),
                state: repaired,
                time,
            }),
        ))
    }

    /// Runs up to `attempts` attempts on `context` within `timeout`.
    fn run_attempts(
        &self,
        context: &Arc<PlanningContext>,
        attempts: u32,
        timeout: Duration,
    ) -> SolveOutcome {
        let started = Instant::now();
        context.set_phase(SolvePhase::Solving);
        let pending = self.solve_cancel_slot().take();
        if pending.is_some_and(|flag| flag.load(Ordering::Acquire)) {
            tracing::debug!(context = context.id(), "Applying termination requested during preparation");
            context.terminate();
        }
        let approximation = context.attach_approximation();
        let engine = self.engine_for(context.planner_id());

        let deadline = TimeTermination::new(timeout);
        let termination: AttemptTermination =
            OrTermination::new(deadline, ExternalTermination::new(context.cancel_flag()));
        let minimum = self.settings.minimum_attempt_time();
        let base_seed = self.settings.random_seed.unwrap_or_else(|| rand::rng().random());

        let mut records = Vec::new();
        let mut best: Option<(PlannedPath, u32)> = None;
        let mut out_of_time = false;

        for index in 0..attempts {
            if context.is_cancel_requested() {
                break;
            }
            let remaining = deadline.remaining();
            if remaining.is_zero() || remaining < minimum {
                tracing::debug!(attempt = index, "Not enough time left for another attempt");
                out_of_time = true;
                break;
            }

            tracing::debug!(
                context = context.id(),
                attempt = index,
                remaining_ms = remaining.as_millis() as u64,
                "Starting planning attempt"
            );
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(u64::from(index)));
            let attempt_started = Instant::now();
            let result = context.run_attempt(engine.as_ref(), &termination, &mut rng);
            let duration = attempt_started.elapsed();

            match result {
                Ok(path) => {
                    tracing::debug!(attempt = index, cost = path.cost, "Attempt succeeded");
                    records.push(AttemptRecord {
                        index,
                        outcome: AttemptOutcome::Succeeded {
                            cost: path.cost,
                            waypoints: path.len(),
                        },
                        duration,
                    });
                    let better = best
                        .as_ref()
                        .map_or(true, |(b, _)| path.cost.total_cmp(&b.cost).is_lt());
                    if better {
                        best = Some((path, index));
                    }
                    if self.settings.stop_at_first_success {
                        break;
                    }
                }
                Err(failure) => {
                    tracing::debug!(attempt = index, %failure, "Attempt failed");
                    if matches!(failure, AttemptFailure::Engine(EngineFailure::Terminated))
                        && !context.is_cancel_requested()
                    {
                        out_of_time = true;
                    }
                    records.push(AttemptRecord {
                        index,
                        outcome: AttemptOutcome::Failed(failure),
                        duration,
                    });
                }
            }
        }

        let cancelled = context.is_cancel_requested();
        let best_attempt = best.as_ref().map(|(_, i)| *i);
        let (phase, path) = if cancelled {
            (SolvePhase::Cancelled, Err(PlanForgeError::Cancelled))
        } else if let Some((path, _)) = best {
            (SolvePhase::Succeeded, Ok(path))
        } else if out_of_time || deadline.is_terminated() {
            (SolvePhase::TimedOut, Err(PlanForgeError::TimedOut(timeout)))
        } else {
            (
                SolvePhase::Failed,
                Err(PlanForgeError::PlanningFailed(records.len() as u32)),
            )
        };

        let diagnostics = SolveDiagnostics {
            planner_id: context.planner_id().to_string(),
            attempts: records,
            best_attempt: if cancelled { None } else { best_attempt },
            approximation_used: approximation.is_some(),
            solve_time: started.elapsed(),
        };
        context.record_diagnostics(diagnostics.clone());
        context.set_phase(phase);

        tracing::info!(
            context = context.id(),
            config = context.name(),
            phase = ?phase,
            attempts = diagnostics.attempts.len(),
            millis = diagnostics.solve_time.as_millis() as u64,
            "Solve finished"
        );
        SolveOutcome { path, diagnostics }
    }

    /// Runs a preparation step with a pending-cancel flag open, so a
    /// `terminate_solve` arriving before the context exists is not lost.
    /// The attempt loop consumes the flag; a failed preparation drops it.
    fn preparing<T>(&self, prepare: impl FnOnce() -> Result<T>) -> Result<T> {
        *self.solve_cancel_slot() = Some(Arc::new(AtomicBool::new(false)));
        let prepared = prepare();
        if prepared.is_err() {
            *self.solve_cancel_slot() = None;
        }
        prepared
    }

    fn solve_cancel_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<AtomicBool>>> {
        self.solve_cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seeded_rng(&self, salt: u64) -> ChaCha8Rng {
        match self.settings.random_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed ^ salt),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

/// Inserts states so consecutive waypoints are at most `resolution` apart.
fn densify(space: &JointStateSpace, waypoints: &[Vec<f64>], resolution: f64) -> Vec<Vec<f64>> {
    let Some(first) = waypoints.first() else {
        return Vec::new();
    };
    let mut dense = vec![first.clone()];
    for pair in waypoints.windows(2) {
        dense.extend(space.discretize(&pair[0], &pair[1], resolution));
    }
    dense
}
