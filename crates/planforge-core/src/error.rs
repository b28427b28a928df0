//! Error types for PlanForge

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, enumerable outcome code.
///
/// Callers branch on the code alone; the message carried by
/// [`PlanForgeError`] is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Success,
    PlanningFailed,
    TimedOut,
    Cancelled,
    ConfigNotFound,
    UnsupportedFactoryType,
    InvalidRequest,
    InvalidGroup,
    InvalidGoalConstraints,
    InvalidTimeout,
    StartStateInCollision,
    ApproximationBuildFailed,
    CorruptStore,
    Io,
}

impl ErrorCode {
    /// Returns the code as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::PlanningFailed => "PLANNING_FAILED",
            ErrorCode::TimedOut => "TIMED_OUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::ConfigNotFound => "CONFIG_NOT_FOUND",
            ErrorCode::UnsupportedFactoryType => "UNSUPPORTED_FACTORY_TYPE",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidGroup => "INVALID_GROUP",
            ErrorCode::InvalidGoalConstraints => "INVALID_GOAL_CONSTRAINTS",
            ErrorCode::InvalidTimeout => "INVALID_TIMEOUT",
            ErrorCode::StartStateInCollision => "START_STATE_IN_COLLISION",
            ErrorCode::ApproximationBuildFailed => "APPROXIMATION_BUILD_FAILED",
            ErrorCode::CorruptStore => "CORRUPT_STORE",
            ErrorCode::Io => "IO",
        }
    }

    /// Returns true for [`ErrorCode::Success`].
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for PlanForge operations
#[derive(Debug, Error)]
pub enum PlanForgeError {
    /// No planner configuration registered under this name
    #[error("Planner configuration not found: {0}")]
    ConfigNotFound(String),

    /// The requested state space factory does not exist or cannot represent the group
    #[error("Unsupported state space factory '{factory}' for group '{group}'")]
    UnsupportedFactoryType { factory: String, group: String },

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request names a group the robot model does not know
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    /// Goal constraints are empty or reference unknown joints/links
    #[error("Invalid goal constraints: {0}")]
    InvalidGoalConstraints(String),

    /// Allowed planning time is not a positive, finite number of seconds
    #[error("Invalid timeout: {0} seconds")]
    InvalidTimeout(f64),

    /// No valid start state could be found near the requested one
    #[error("Start state in collision for group '{0}'")]
    StartStateInCollision(String),

    /// Sampling produced no valid state for the constraint approximation
    #[error("Constraint approximation build failed: {0}")]
    ApproximationBuildFailed(String),

    /// The persisted approximation store failed a structural check
    #[error("Corrupt constraint approximation store: {0}")]
    CorruptStore(String),

    /// The deadline elapsed without a successful attempt
    #[error("Planning timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// The solve was terminated externally
    #[error("Planning was cancelled")]
    Cancelled,

    /// Every attempt failed before the deadline
    #[error("Planning failed after {0} attempt(s)")]
    PlanningFailed(u32),

    /// Persistence I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanForgeError {
    /// Returns the stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PlanForgeError::ConfigNotFound(_) => ErrorCode::ConfigNotFound,
            PlanForgeError::UnsupportedFactoryType { .. } => ErrorCode::UnsupportedFactoryType,
            PlanForgeError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            PlanForgeError::InvalidGroup(_) => ErrorCode::InvalidGroup,
            PlanForgeError::InvalidGoalConstraints(_) => ErrorCode::InvalidGoalConstraints,
            PlanForgeError::InvalidTimeout(_) => ErrorCode::InvalidTimeout,
            PlanForgeError::StartStateInCollision(_) => ErrorCode::StartStateInCollision,
            PlanForgeError::ApproximationBuildFailed(_) => ErrorCode::ApproximationBuildFailed,
            PlanForgeError::CorruptStore(_) => ErrorCode::CorruptStore,
            PlanForgeError::TimedOut(_) => ErrorCode::TimedOut,
            PlanForgeError::Cancelled => ErrorCode::Cancelled,
            PlanForgeError::PlanningFailed(_) => ErrorCode::PlanningFailed,
            PlanForgeError::Io(_) => ErrorCode::Io,
        }
    }
}

/// Result type alias for PlanForge operations
pub type Result<T> = std::result::Result<T, PlanForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            PlanForgeError::ConfigNotFound("arm".into()).code(),
            ErrorCode::ConfigNotFound
        );
        assert_eq!(PlanForgeError::Cancelled.code().as_str(), "CANCELLED");
        assert_eq!(
            PlanForgeError::InvalidTimeout(0.0).code(),
            ErrorCode::InvalidTimeout
        );
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::TimedOut.is_success());
    }

    #[test]
    fn test_io_error_converts() {
        let err: PlanForgeError = std::io::Error::other("disk").into();
        assert_eq!(err.code(), ErrorCode::Io);
        assert!(err.to_string().contains("disk"));
    }
}
