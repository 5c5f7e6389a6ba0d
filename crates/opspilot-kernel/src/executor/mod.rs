//! Action execution
//!
//! The scheduler never talks to robots, pagers or cameras itself. It hands
//! each action whose countdown fired to an [`ActionExecutor`]; executors can
//! be registered per action id, and [`DefaultDispatcher`] handles the rest.

use crate::error::ExecutorError;
use opspilot_model::{Action, ClassifiedAction, ExecutionResult};

/// Executes classified actions against downstream systems
///
/// Implement this trait to wire actions to real fleet, paging or camera
/// control. Returning `Err` (or panicking) is recorded as a failed execution;
/// the scheduler never retries.
#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute every action of the classified recommendation
    async fn execute(&self, action: &ClassifiedAction) -> Result<ExecutionResult, ExecutorError>;
}

/// Fallback executor that reports what each action would have done
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDispatcher;

impl DefaultDispatcher {
    /// Create the dispatcher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Human-readable effect of a single action
    #[must_use]
    pub fn describe(action: &Action) -> String {
        match action {
            Action::Camera { target, parameters } => format!(
                "Camera focused on {target} at {:.1}x for {}s",
                parameters.zoom, parameters.duration_secs
            ),
            Action::Notify { target, parameters } => format!(
                "Notified {target} via {} ({}): {}",
                parameters.channel, parameters.urgency, parameters.message
            ),
            Action::Dispatch { target, parameters } => {
                format!("Dispatched {target} to {}", parameters.destination)
            }
            Action::Reallocate { target, parameters } => {
                let from = parameters.from_zone.as_deref().unwrap_or("available capacity");
                format!(
                    "Reallocated {target} ({} entities) from {from} to {}",
                    parameters.entities.len(),
                    parameters.to_zone
                )
            }
        }
    }
}

#[async_trait::async_trait]
impl ActionExecutor for DefaultDispatcher {
    async fn execute(&self, action: &ClassifiedAction) -> Result<ExecutionResult, ExecutorError> {
        let lines: Vec<String> = action
            .recommendation
            .actions
            .iter()
            .map(Self::describe)
            .collect();

        tracing::debug!(action = %action.id, steps = lines.len(), "default dispatch");

        Ok(ExecutionResult::success(format!(
            "Executed {} action(s) for '{}'",
            lines.len(),
            action.recommendation.title
        ))
        .with_data(serde_json::json!({ "results": lines })))
    }
}
