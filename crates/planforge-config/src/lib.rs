//! Configuration system for PlanForge.
//!
//! Load planner configurations and interface settings from TOML or YAML
//! files to control planners, timeouts and constraint approximations
//! without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use planforge_config::PlanningConfig;
//! use std::time::Duration;
//!
//! let config = PlanningConfig::from_toml_str(r#"
//!     [interface]
//!     default_timeout_seconds = 2.5
//!     default_attempts = 3
//!
//!     [[planner_configs]]
//!     name = "arm"
//!     group = "arm"
//!     planner_id = "RRTConnect"
//!
//!     [[planner_configs]]
//!     name = "arm[RandomTree]"
//!     group = "arm"
//!     planner_id = "RandomTree"
//!     [planner_configs.parameters]
//!     range = "0.2"
//! "#).unwrap();
//!
//! assert_eq!(config.interface.default_timeout(), Duration::from_millis(2500));
//! assert_eq!(config.planner_configs.len(), 2);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use planforge_config::PlanningConfig;
//!
//! let config = PlanningConfig::load("planning.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

mod registry;

#[cfg(test)]
mod tests;

pub use registry::PlannerConfigRegistry;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use planforge_core::PlanForgeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Planner configuration not found: {0}")]
    NotFound(String),
}

impl From<ConfigError> for PlanForgeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(name) => PlanForgeError::ConfigNotFound(name),
            ConfigError::Io(e) => PlanForgeError::Io(e),
            other => PlanForgeError::InvalidRequest(other.to_string()),
        }
    }
}

/// Main planning configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanningConfig {
    /// Planner configurations, keyed by name once registered.
    #[serde(default)]
    pub planner_configs: Vec<PlannerConfiguration>,

    /// Orchestrator settings.
    #[serde(default)]
    pub interface: InterfaceConfig,

    /// Constraint approximation build settings.
    #[serde(default)]
    pub approximation: ApproximationConfig,
}

impl PlanningConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for pc in &self.planner_configs {
            if pc.name.is_empty() {
                return Err(ConfigError::Invalid("planner config with empty name".into()));
            }
            if !seen.insert(pc.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate planner config '{}'",
                    pc.name
                )));
            }
        }
        if self.interface.default_attempts == 0 {
            return Err(ConfigError::Invalid("default_attempts must be >= 1".into()));
        }
        let timeout = self.interface.default_timeout_seconds;
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_timeout_seconds must be positive, got {timeout}"
            )));
        }
        if self.approximation.samples == 0 {
            return Err(ConfigError::Invalid("approximation samples must be >= 1".into()));
        }
        Ok(())
    }

    /// Adds a planner configuration.
    pub fn with_planner_config(mut self, config: PlannerConfiguration) -> Self {
        self.planner_configs.push(config);
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.interface.random_seed = Some(seed);
        self
    }

    /// Sets the default allowed planning time.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.interface.default_timeout_seconds = timeout.as_secs_f64();
        self
    }
}

/// Planner parameters for one named configuration.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfiguration {
    /// Configuration name, e.g. `arm` or `arm[RRTConnect]`.
    pub name: String,

    /// Joint group the configuration plans for.
    pub group: String,

    /// Identifier of the underlying planning engine.
    #[serde(default)]
    pub planner_id: String,

    /// Algorithm-specific settings.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl PlannerConfiguration {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        planner_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            planner_id: planner_id.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct InterfaceConfig {
    /// Attach cached constraint approximations to new contexts.
    pub use_constraints_approximations: bool,

    /// Attempts per solve when the request does not say.
    pub default_attempts: u32,

    /// Allowed planning time when the request does not say.
    pub default_timeout_seconds: f64,

    /// Base seed for attempt RNGs; random when unset.
    pub random_seed: Option<u64>,

    /// Stop at the first successful attempt instead of running all of them.
    pub stop_at_first_success: bool,

    /// An attempt is not started with less remaining time than this.
    pub minimum_attempt_millis: u64,

    /// Samples tried when repairing an invalid start state.
    pub start_repair_attempts: u32,

    /// Per-joint radius searched when repairing an invalid start state.
    pub start_repair_distance: f64,

    /// Maximum joint-space step between trajectory points.
    pub interpolation_resolution: f64,

    /// Joint speed used to time-stamp trajectories.
    pub nominal_joint_velocity: f64,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            use_constraints_approximations: true,
            default_attempts: 1,
            default_timeout_seconds: 5.0,
            random_seed: None,
            stop_at_first_success: true,
            minimum_attempt_millis: 1,
            start_repair_attempts: 100,
            start_repair_distance: 0.1,
            interpolation_resolution: 0.05,
            nominal_joint_velocity: 1.0,
        }
    }
}

impl InterfaceConfig {
    /// Returns the default allowed planning time as a Duration.
    pub fn default_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_timeout_seconds).unwrap_or(Duration::MAX)
    }

    pub fn minimum_attempt_time(&self) -> Duration {
        Duration::from_millis(self.minimum_attempt_millis)
    }
}

/// Constraint approximation build settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ApproximationConfig {
    /// Accepted states to collect.
    pub samples: usize,

    /// Wall-clock budget for one build.
    pub max_build_seconds: f64,

    /// Accepted states closer than this are candidates for an edge.
    pub connection_radius: f64,

    /// Maximum edges attempted per new state.
    pub max_neighbors: usize,

    /// Joint-space step used when checking an edge.
    pub motion_resolution: f64,

    /// Radius around existing states used to propose new candidates.
    pub explore_bound: f64,
}

impl Default for ApproximationConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            max_build_seconds: 30.0,
            connection_radius: 0.5,
            max_neighbors: 8,
            motion_resolution: 0.01,
            explore_bound: 0.2,
        }
    }
}

impl ApproximationConfig {
    pub fn max_build_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_build_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }
}
