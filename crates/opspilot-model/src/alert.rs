//! Alerts: deduplicated, scored issues surfaced to operators

use crate::ids::AlertId;
use crate::issue::{Category, IssueSignature, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Newly detected
    Active,
    /// Seen by an operator
    Acknowledged,
    /// Underlying problem fixed
    Resolved,
    /// Judged not actionable
    Dismissed,
}

impl AlertStatus {
    /// Statuses reachable from this one
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [AlertStatus] {
        use AlertStatus::*;
        match self {
            Active => &[Acknowledged, Resolved, Dismissed],
            Acknowledged => &[Resolved, Dismissed],
            Resolved | Dismissed => &[],
        }
    }

    /// Check whether `to` is reachable in one step
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: AlertStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Open alerts still hold their issue signature
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::Acknowledged)
    }
}

/// How far an alert's effect reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactScope {
    /// Individual robots, workers or SKUs
    Entity,
    /// One or a few zones
    Zone,
    /// Most of the building
    Warehouse,
}

/// Scored reach and urgency of an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertImpact {
    /// Reach
    pub scope: ImpactScope,
    /// Magnitude in [0, 1]
    pub magnitude: f64,
    /// Minutes within which the alert should be handled
    pub time_window_minutes: u32,
}

/// Share of a data factor in the alert's explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    /// Signal name
    pub name: String,
    /// Observed value
    pub value: f64,
    /// Optional unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Contribution weight; all weights of an alert sum to 1
    pub contribution: f64,
}

/// Why the alert was raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explainability {
    /// Supporting factors with contributions
    pub data_factors: Vec<FactorContribution>,
    /// Templated reasoning sentence
    pub reasoning: String,
}

/// A deduplicated, severity-and-impact-scored issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Alert identifier
    pub id: AlertId,
    /// Severity
    pub severity: Severity,
    /// Domain
    pub category: Category,
    /// Title copied from the issue
    pub title: String,
    /// Description copied from the issue
    pub description: String,
    /// First detection time
    pub detected_at: DateTime<Utc>,
    /// Entities involved
    pub affected_entities: Vec<String>,
    /// Zones involved
    pub affected_zones: Vec<String>,
    /// Highest confidence seen for this signature
    pub confidence: f64,
    /// Impact assessment
    pub impact: AlertImpact,
    /// Explanation
    pub explainability: Explainability,
    /// Lifecycle status
    pub status: AlertStatus,
    /// Deduplication identity of the source issue
    pub signature: IssueSignature,
}

impl Alert {
    /// Check whether the alert is still open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
