//! Outcomes: promised versus achieved impact of an executed action

use crate::ids::{ActionId, OutcomeId, RecommendationId};
use crate::issue::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracking status of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Awaiting the follow-up measurement
    InProgress,
    /// Measured, promise held
    Completed,
    /// Measured, promise missed
    Failed,
}

/// A named metric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Metric name, matched across promised and achieved readings
    pub name: String,
    /// Value
    pub value: f64,
    /// Unit
    #[serde(default)]
    pub unit: String,
}

impl MetricValue {
    /// Create a reading
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// What the recommendation promised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromisedImpact {
    /// Predicted metric values
    pub metrics: Vec<MetricValue>,
    /// Minutes after execution at which to measure
    pub timeframe_minutes: u32,
}

/// What was actually measured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievedImpact {
    /// Measured metric values
    pub metrics: Vec<MetricValue>,
    /// Minutes that actually elapsed before measurement
    pub actual_timeframe_minutes: u32,
}

/// Post-execution comparison of promised and achieved impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Outcome identifier
    pub id: OutcomeId,
    /// Recommendation that was executed
    pub recommendation_id: RecommendationId,
    /// Action that was executed
    pub action_id: ActionId,
    /// Domain, for per-category statistics
    pub category: Category,
    /// Execution time
    pub executed_at: DateTime<Utc>,
    /// Tracking status
    pub status: OutcomeStatus,
    /// Promise
    pub promised: PromisedImpact,
    /// Measurement
    pub achieved: AchievedImpact,
    /// Accuracy in [0, 1]
    pub accuracy: f64,
    /// Measurement time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Outcome {
    /// Whether the follow-up measurement has been recorded
    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status != OutcomeStatus::InProgress
    }
}
