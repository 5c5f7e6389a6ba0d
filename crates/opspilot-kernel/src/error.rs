//! Error types for classification and scheduling

use opspilot_model::{ActionId, ActionStatus};

/// Illegal action status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct StateMachineError {
    /// Current status
    pub from: ActionStatus,
    /// Requested status
    pub to: ActionStatus,
}

/// Gestation scheduler errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// No gestation item with this id
    #[error("invalid state transition: no gestation item {0}")]
    UnknownItem(ActionId),

    /// Requested transition is not legal from the current status
    #[error("invalid state transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Item
        id: ActionId,
        /// Current status
        from: ActionStatus,
        /// Requested status
        to: ActionStatus,
    },

    /// Item already in the queue
    #[error("action {0} is already queued")]
    AlreadyQueued(ActionId),

    /// Assisted actions need operator approval before queueing
    #[error("action {0} requires explicit operator approval")]
    ApprovalRequired(ActionId),
}

impl SchedulerError {
    /// Check if the error reports an invalid state transition
    ///
    /// Unknown items count: objecting to something that is not queued is an
    /// attempt to leave a state the item is not in.
    #[inline]
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::UnknownItem(_) | Self::InvalidTransition { .. })
    }

    pub(crate) fn from_state(id: ActionId, err: StateMachineError) -> Self {
        Self::InvalidTransition {
            id,
            from: err.from,
            to: err.to,
        }
    }
}

/// Errors reported by action executors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// Downstream system rejected or failed the action
    #[error("execution failed: {0}")]
    Failed(String),

    /// Downstream system could not be reached
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Invalid classifier or scheduler configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Threshold pair out of order or outside [0, 1]
    #[error("invalid {name} thresholds: medium {medium} must be below high {high} within [0, 1]")]
    Thresholds {
        /// Threshold family
        name: &'static str,
        /// Medium threshold
        medium: f64,
        /// High threshold
        high: f64,
    },

    /// Impact weights do not sum to one
    #[error("impact weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    /// Field value out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field
        field: &'static str,
        /// Why
        reason: String,
    },
}
