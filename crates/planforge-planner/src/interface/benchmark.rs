//! Repeated solves across planner configurations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use planforge_core::{ErrorCode, PlanForgeError, PlanningScene, Result};

use super::PlanningInterface;
use crate::request::MotionPlanRequest;

/// What to benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    pub name: String,
    /// Solves per configuration.
    pub run_count: u32,
    /// Configuration names; empty means every configuration of the request's group.
    pub configurations: Vec<String>,
}

impl BenchmarkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_count: 3,
            configurations: Vec::new(),
        }
    }

    pub fn with_run_count(mut self, runs: u32) -> Self {
        self.run_count = runs;
        self
    }

    pub fn with_configuration(mut self, name: impl Into<String>) -> Self {
        self.configurations.push(name.into());
        self
    }
}

/// One solve of a benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
    pub configuration: String,
    pub run_index: u32,
    pub error_code: ErrorCode,
    pub solve_time: Duration,
    /// Joint-space length of the trajectory, for successful runs.
    pub path_length: Option<f64>,
}

/// All runs of one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationBenchmark {
    pub configuration: String,
    pub runs: Vec<BenchmarkRun>,
}

impl ConfigurationBenchmark {
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn success_count(&self) -> usize {
        self.runs.iter().filter(|r| r.error_code.is_success()).count()
    }

    /// Fraction of successful runs; zero without runs.
    pub fn success_rate(&self) -> f64 {
        if self.runs.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.runs.len() as f64
        }
    }

    pub fn average_solve_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.runs.len()).ok().filter(|n| *n > 0)?;
        Some(self.runs.iter().map(|r| r.solve_time).sum::<Duration>() / count)
    }

    pub fn min_solve_time(&self) -> Option<Duration> {
        self.runs.iter().map(|r| r.solve_time).min()
    }

    pub fn max_solve_time(&self) -> Option<Duration> {
        self.runs.iter().map(|r| r.solve_time).max()
    }

    /// Mean path length over successful runs.
    pub fn average_path_length(&self) -> Option<f64> {
        let lengths: Vec<f64> = self.runs.iter().filter_map(|r| r.path_length).collect();
        if lengths.is_empty() {
            None
        } else {
            Some(lengths.iter().sum::<f64>() / lengths.len() as f64)
        }
    }

    pub fn min_path_length(&self) -> Option<f64> {
        self.runs
            .iter()
            .filter_map(|r| r.path_length)
            .min_by(f64::total_cmp)
    }

    pub fn max_path_length(&self) -> Option<f64> {
        self.runs
            .iter()
            .filter_map(|r| r.path_length)
            .max_by(f64::total_cmp)
    }
}

/// Outcome of [`PlanningInterface::benchmark`].
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub name: String,
    /// In the order they were benchmarked; may be partial when cancelled.
    pub configurations: Vec<ConfigurationBenchmark>,
    pub cancelled: bool,
    pub total_time: Duration,
}

impl BenchmarkResult {
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationBenchmark> {
        self.configurations.iter().find(|c| c.configuration == name)
    }

    pub fn total_runs(&self) -> usize {
        self.configurations.iter().map(ConfigurationBenchmark::run_count).sum()
    }
}

impl PlanningInterface {
    /// Solves `request` `run_count` times with each configuration.
    ///
    /// Each run gets the request's full timeout. [`terminate_solve`] stops
    /// the benchmark after the current run, returning what was collected.
    ///
    /// [`terminate_solve`]: PlanningInterface::terminate_solve
    ///
    /// # Errors
    ///
    /// - [`PlanForgeError::ConfigNotFound`] if a named configuration is unknown
    /// - [`PlanForgeError::InvalidRequest`] if nothing is left to benchmark
    pub fn benchmark(
        &self,
        scene: &Arc<dyn PlanningScene>,
        request: &MotionPlanRequest,
        config: &BenchmarkConfig,
    ) -> Result<BenchmarkResult> {
        let names = self.benchmark_configurations(request, config)?;
        let started = Instant::now();
        let cancel = Arc::new(AtomicBool::new(false));
        *self.benchmark_slot() = Some(cancel.clone());

        tracing::info!(
            benchmark = %config.name,
            configurations = names.len(),
            runs = config.run_count,
            "Benchmark started"
        );

        let mut configurations = Vec::with_capacity(names.len());
        let mut cancelled = false;
        'outer: for name in names {
            let mut runs = Vec::with_capacity(config.run_count as usize);
            let run_request = MotionPlanRequest {
                planner_id: name.clone(),
                ..request.clone()
            };
            for run_index in 0..config.run_count {
                if cancel.load(Ordering::Acquire) {
                    cancelled = true;
                    configurations.push(ConfigurationBenchmark {
                        configuration: name,
                        runs,
                    });
                    break 'outer;
                }
                let response = self.solve(scene, &run_request);
                tracing::debug!(
                    configuration = %name,
                    run = run_index,
                    code = %response.error_code,
                    "Benchmark run finished"
                );
                let run_cancelled = response.error_code == ErrorCode::Cancelled;
                runs.push(BenchmarkRun {
                    configuration: name.clone(),
                    run_index,
                    error_code: response.error_code,
                    solve_time: response.planning_time,
                    path_length: response.trajectory.as_ref().map(|t| t.length()),
                });
                if run_cancelled {
                    cancel.store(true, Ordering::Release);
                }
            }
            configurations.push(ConfigurationBenchmark {
                configuration: name,
                runs,
            });
        }
        // A cancel that landed during the last run still counts.
        cancelled |= cancel.load(Ordering::Acquire);
        *self.benchmark_slot() = None;

        let result = BenchmarkResult {
            name: config.name.clone(),
            configurations,
            cancelled,
            total_time: started.elapsed(),
        };
        tracing::info!(
            benchmark = %result.name,
            runs = result.total_runs(),
            cancelled,
            millis = result.total_time.as_millis() as u64,
            "Benchmark finished"
        );
        Ok(result)
    }

    fn benchmark_configurations(
        &self,
        request: &MotionPlanRequest,
        config: &BenchmarkConfig,
    ) -> Result<Vec<String>> {
        let names = if config.configurations.is_empty() {
            self.registry
                .for_group(&request.group_name)
                .iter()
                .map(|c| c.name.clone())
                .collect()
        } else {
            for name in &config.configurations {
                self.registry.resolve(name)?;
            }
            config.configurations.clone()
        };
        if names.is_empty() {
            return Err(PlanForgeError::InvalidRequest(format!(
                "no planner configurations to benchmark for group '{}'",
                request.group_name
            )));
        }
        Ok(names)
    }

    fn benchmark_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<AtomicBool>>> {
        self.benchmark_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
