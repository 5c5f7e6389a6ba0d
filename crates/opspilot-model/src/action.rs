//! Classified actions: recommendations annotated with an autonomy tier

use crate::ids::ActionId;
use crate::recommendation::Recommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Autonomy tier, ordered by the amount of human oversight required
///
/// `Automated < SemiAutomated < Assisted`: moving up the order never grants
/// more autonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Executes after a short objection window
    Automated,
    /// Executes after a longer objection window
    SemiAutomated,
    /// Never executes without explicit operator approval
    Assisted,
}

impl Tier {
    /// Whether the tier is eligible for deferred unattended execution
    #[inline]
    #[must_use]
    pub fn allows_gestation(self) -> bool {
        !matches!(self, Tier::Assisted)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Automated => "automated",
            Tier::SemiAutomated => "semi-automated",
            Tier::Assisted => "assisted",
        };
        f.write_str(label)
    }
}

/// Execution lifecycle of a classified action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Waiting for its countdown
    Pending,
    /// Countdown fired, executor running
    Executing,
    /// Execution attempted (successfully or not)
    Completed,
    /// Cancelled by an operator
    Objected,
    /// Recommendation expired before execution
    Expired,
}

impl ActionStatus {
    /// Terminal statuses never change again
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Objected | ActionStatus::Expired
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_lowercase())
    }
}

/// Scores behind a tier decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Recommendation confidence
    pub confidence: f64,
    /// Weighted impact score in [0, 1]
    pub impact: f64,
    /// Human-readable explanation
    pub reasoning: String,
}

/// Result reported by an action executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Whether the action took effect
    pub success: bool,
    /// Summary message
    pub message: String,
    /// Executor-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When execution finished
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Successful result
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
            executed_at: Utc::now(),
        }
    }

    /// Failed result
    #[must_use]
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
            executed_at: Utc::now(),
        }
    }

    /// With payload
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A recommendation with its autonomy decision and execution state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedAction {
    /// Action identifier
    pub id: ActionId,
    /// Autonomy tier
    pub tier: Tier,
    /// Recommendation to carry out
    pub recommendation: Recommendation,
    /// Scores behind the tier
    pub classification: Classification,
    /// Objection window; `None` means explicit approval is required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestation_period_ms: Option<u64>,
    /// Execution status
    pub status: ActionStatus,
    /// Classification time, replaced by the queueing time once queued
    pub queued_at: DateTime<Utc>,
    /// Executor result, set once execution has been attempted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionResult>,
}

impl ClassifiedAction {
    /// Gestation period as a duration
    #[inline]
    #[must_use]
    pub fn gestation_period(&self) -> Option<Duration> {
        self.gestation_period_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_by_oversight() {
        assert!(Tier::Automated < Tier::SemiAutomated);
        assert!(Tier::SemiAutomated < Tier::Assisted);
    }

    #[test]
    fn tier_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&Tier::SemiAutomated).unwrap();
        assert_eq!(json, "\"semi-automated\"");
    }

    #[test]
    fn only_final_statuses_are_terminal() {
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::Executing.is_terminal());
        assert!(ActionStatus::Completed.is_terminal());
        assert!(ActionStatus::Objected.is_terminal());
        assert!(ActionStatus::Expired.is_terminal());
    }

    #[test]
    fn assisted_tier_is_not_gestated() {
        assert!(Tier::Automated.allows_gestation());
        assert!(!Tier::Assisted.allows_gestation());
    }
}
