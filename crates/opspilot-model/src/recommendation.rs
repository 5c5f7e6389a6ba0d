//! Recommendations and their typed corrective actions

use crate::ids::{AlertId, RecommendationId};
use crate::issue::{Category, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommendation priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl Priority {
    /// One level less urgent; `Low` stays `Low`
    #[inline]
    #[must_use]
    pub fn step_down(self) -> Self {
        match self {
            Priority::Critical => Priority::High,
            Priority::High => Priority::Medium,
            Priority::Medium | Priority::Low => Priority::Low,
        }
    }
}

impl From<Severity> for Priority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::Critical,
            Severity::High => Priority::High,
            Severity::Medium => Priority::Medium,
            Severity::Low => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Camera focus parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraParams {
    /// Zoom factor
    pub zoom: f64,
    /// How long to hold focus, in seconds
    pub duration_secs: u32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            zoom: 1.5,
            duration_secs: 300,
        }
    }
}

/// Notification parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyParams {
    /// Delivery channel (pager, radio, dashboard)
    pub channel: String,
    /// Message body
    pub message: String,
    /// Urgency shown to the recipient
    pub urgency: Severity,
}

/// Dispatch parameters: send an entity to a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Where to send the entity
    pub destination: String,
    /// Why
    pub reason: String,
}

/// Reallocation parameters: move capacity between zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocateParams {
    /// Zone giving up capacity, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_zone: Option<String>,
    /// Zone receiving capacity
    pub to_zone: String,
    /// Workers, robots or SKUs being moved
    #[serde(default)]
    pub entities: Vec<String>,
}

/// Discriminant of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Point a camera
    Camera,
    /// Send a notification
    Notify,
    /// Send an entity somewhere
    Dispatch,
    /// Move capacity between zones
    Reallocate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Camera => "camera",
            ActionKind::Notify => "notify",
            ActionKind::Dispatch => "dispatch",
            ActionKind::Reallocate => "reallocate",
        };
        f.write_str(label)
    }
}

/// A corrective action with kind-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Focus a camera on a zone or entity
    Camera {
        /// Zone or entity to observe
        target: String,
        /// Camera parameters
        parameters: CameraParams,
    },
    /// Notify a team or person
    Notify {
        /// Recipient
        target: String,
        /// Notification parameters
        parameters: NotifyParams,
    },
    /// Dispatch an entity
    Dispatch {
        /// Entity being dispatched
        target: String,
        /// Dispatch parameters
        parameters: DispatchParams,
    },
    /// Reallocate capacity
    Reallocate {
        /// Resource pool being reallocated
        target: String,
        /// Reallocation parameters
        parameters: ReallocateParams,
    },
}

impl Action {
    /// Kind discriminant
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Camera { .. } => ActionKind::Camera,
            Action::Notify { .. } => ActionKind::Notify,
            Action::Dispatch { .. } => ActionKind::Dispatch,
            Action::Reallocate { .. } => ActionKind::Reallocate,
        }
    }

    /// Target of the action
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Action::Camera { target, .. }
            | Action::Notify { target, .. }
            | Action::Dispatch { target, .. }
            | Action::Reallocate { target, .. } => target,
        }
    }

    /// Explicitly listed entities carried by the action
    #[inline]
    #[must_use]
    pub fn listed_entities(&self) -> &[String] {
        match self {
            Action::Reallocate { parameters, .. } => &parameters.entities,
            _ => &[],
        }
    }

    /// Camera focus with default parameters
    #[must_use]
    pub fn camera(target: impl Into<String>) -> Self {
        Action::Camera {
            target: target.into(),
            parameters: CameraParams::default(),
        }
    }

    /// Notification
    #[must_use]
    pub fn notify(
        target: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
        urgency: Severity,
    ) -> Self {
        Action::Notify {
            target: target.into(),
            parameters: NotifyParams {
                channel: channel.into(),
                message: message.into(),
                urgency,
            },
        }
    }

    /// Dispatch an entity to a destination
    #[must_use]
    pub fn dispatch(
        target: impl Into<String>,
        destination: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Action::Dispatch {
            target: target.into(),
            parameters: DispatchParams {
                destination: destination.into(),
                reason: reason.into(),
            },
        }
    }

    /// Reallocate entities into a zone
    #[must_use]
    pub fn reallocate(
        target: impl Into<String>,
        to_zone: impl Into<String>,
        entities: Vec<String>,
    ) -> Self {
        Action::Reallocate {
            target: target.into(),
            parameters: ReallocateParams {
                from_zone: None,
                to_zone: to_zone.into(),
                entities,
            },
        }
    }
}

/// Projected change of one named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetric {
    /// Metric name
    pub name: String,
    /// Value today
    pub current: f64,
    /// Value expected after the recommendation is applied
    pub predicted: f64,
    /// Unit
    pub unit: String,
}

impl ImpactMetric {
    /// Create a metric projection
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        current: f64,
        predicted: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            current,
            predicted,
            unit: unit.into(),
        }
    }

    /// Absolute change relative to the current value
    ///
    /// A zero baseline counts as a full change unless the prediction is also zero.
    #[must_use]
    pub fn fractional_change(&self) -> f64 {
        if self.current == 0.0 {
            if self.predicted == 0.0 {
                0.0
            } else {
                1.0
            }
        } else {
            ((self.predicted - self.current) / self.current).abs()
        }
    }
}

/// Expected consequences of a recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationImpact {
    /// Expected benefits
    pub positive: Vec<String>,
    /// Expected drawbacks
    pub negative: Vec<String>,
    /// Projected metric changes
    pub metrics: Vec<ImpactMetric>,
}

/// A proposed corrective action with projected metric impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommendation identifier
    pub id: RecommendationId,
    /// Alert this recommendation answers
    pub alert_id: AlertId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Domain of the source alert
    pub category: Category,
    /// Priority
    pub priority: Priority,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Projected impact
    pub impact: RecommendationImpact,
    /// Actions to carry out
    pub actions: Vec<Action>,
    /// Alternatives generated alongside a primary recommendation
    pub alternatives: Vec<RecommendationId>,
    /// Primary recommendation this one is an alternative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_of: Option<RecommendationId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time after which the recommendation must not be executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    /// Check whether the recommendation has expired at `now`
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    /// Check whether this is a primary recommendation
    #[inline]
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.alternative_of.is_none()
    }

    /// Check whether every action is of one of the given kinds
    #[must_use]
    pub fn actions_all_within(&self, kinds: &[ActionKind]) -> bool {
        self.actions.iter().all(|a| kinds.contains(&a.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_steps_down_one_level() {
        assert_eq!(Priority::Critical.step_down(), Priority::High);
        assert_eq!(Priority::High.step_down(), Priority::Medium);
        assert_eq!(Priority::Medium.step_down(), Priority::Low);
        assert_eq!(Priority::Low.step_down(), Priority::Low);
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let action = Action::dispatch("R-1", "charging-station", "battery low");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "dispatch");
        assert_eq!(json["target"], "R-1");
        assert_eq!(json["parameters"]["destination"], "charging-station");
    }

    #[test]
    fn action_round_trips_through_json() {
        let action = Action::reallocate("pickers", "zone-b", vec!["W-1".into(), "W-2".into()]);
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ActionKind::Reallocate);
        assert_eq!(back.listed_entities().len(), 2);
    }

    #[test]
    fn fractional_change_handles_zero_baseline() {
        assert_eq!(ImpactMetric::new("x", 0.0, 0.0, "USD").fractional_change(), 0.0);
        assert_eq!(ImpactMetric::new("x", 0.0, 5.0, "USD").fractional_change(), 1.0);
        let m = ImpactMetric::new("Overtime Cost", 2000.0, 1500.0, "USD");
        assert!((m.fractional_change() - 0.25).abs() < 1e-9);
    }
}
