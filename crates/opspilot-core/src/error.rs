//! Error types for the pipeline
//!
//! Covers:
//! - Analyzer failures (recovered as degraded analyses)
//! - Alert lifecycle violations
//! - Outcome tracking violations
//! - Configuration loading and validation

use opspilot_kernel::SchedulerError;
use opspilot_model::{ActionId, AlertId, AlertStatus, OutcomeId};
use std::path::PathBuf;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Gestation scheduler rejected the request
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Alert store rejected the request
    #[error("alert error: {0}")]
    Alert(#[from] AlertError),

    /// Outcome tracker rejected the request
    #[error("outcome error: {0}")]
    Outcome(#[from] OutcomeError),

    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Check if the error reports an invalid state transition
    #[inline]
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_invalid_transition(),
            Self::Alert(e) => matches!(e, AlertError::InvalidTransition { .. }),
            Self::Outcome(e) => matches!(e, OutcomeError::AlreadyFinalized(_)),
            Self::Config(_) => false,
        }
    }

    /// Check if the error names a record that does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Scheduler(SchedulerError::UnknownItem(_)) => true,
            Self::Alert(e) => e.is_not_found(),
            Self::Outcome(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Analyzer failures
///
/// These never escape the fan-out; a failing analyzer degrades to an empty
/// result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// Analyzer ran and failed
    #[error("analysis failed: {0}")]
    Failed(String),

    /// Context lacked readings the analyzer needs
    #[error("missing data: {0}")]
    MissingData(String),
}

/// Alert store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    /// No alert with this id
    #[error("alert not found: {0}")]
    NotFound(AlertId),

    /// Status change not allowed from the current status
    #[error("invalid alert transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Alert
        id: AlertId,
        /// Current status
        from: AlertStatus,
        /// Requested status
        to: AlertStatus,
    },
}

impl AlertError {
    /// Check if the alert does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Outcome tracker errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutcomeError {
    /// No outcome with this id
    #[error("outcome not found: {0}")]
    NotFound(OutcomeId),

    /// Action already has an outcome
    #[error("action {0} is already tracked")]
    AlreadyTracked(ActionId),

    /// Action has not been executed
    #[error("action {0} has not been executed")]
    NotExecuted(ActionId),

    /// Follow-up measurement already recorded
    #[error("outcome {0} is already finalized")]
    AlreadyFinalized(OutcomeId),

    /// Metric source could not produce a measurement
    #[error("measurement failed: {0}")]
    Measurement(String),
}

impl OutcomeError {
    /// Check if the outcome does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// Classifier or scheduler section is invalid
    #[error(transparent)]
    Kernel(#[from] opspilot_kernel::ConfigError),

    /// A pipeline field is out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_gestation_item_is_not_found_and_invalid() {
        let err = PipelineError::from(SchedulerError::UnknownItem(ActionId::new()));
        assert!(err.is_not_found());
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn alert_transition_error_names_both_states() {
        let err = AlertError::InvalidTransition {
            id: AlertId::new(),
            from: AlertStatus::Resolved,
            to: AlertStatus::Acknowledged,
        };
        let message = err.to_string();
        assert!(message.contains("Resolved"));
        assert!(message.contains("Acknowledged"));
        assert!(PipelineError::from(err).is_invalid_transition());
    }
}
