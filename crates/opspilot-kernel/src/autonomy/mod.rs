//! Autonomy classification
//!
//! Scores a recommendation on confidence and impact and maps the pair onto a
//! [`Tier`]. High-impact actions are never fully automated, whatever their
//! confidence.

use crate::config::AutonomyConfig;
use chrono::Utc;
use opspilot_model::{
    ActionId, ActionKind, ActionStatus, Category, Classification, ClassifiedAction, Priority,
    Recommendation, Tier,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CURRENCY_UNITS: [&str; 7] = ["usd", "eur", "gbp", "$", "€", "£", "currency"];

/// The four impact sub-scores and their weighted total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactBreakdown {
    /// Affected entity count, normalized
    pub entity: f64,
    /// Priority-derived criticality
    pub criticality: f64,
    /// Irreversibility (higher is harder to undo)
    pub reversibility: f64,
    /// Financial effect
    pub cost: f64,
    /// Weighted sum in [0, 1]
    pub total: f64,
}

/// Assigns autonomy tiers and gestation periods
#[derive(Debug, Clone, Default)]
pub struct AutonomyClassifier {
    config: AutonomyConfig,
}

impl AutonomyClassifier {
    /// Create a classifier
    #[inline]
    #[must_use]
    pub fn new(config: AutonomyConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AutonomyConfig {
        &self.config
    }

    /// Classify a recommendation into a pending [`ClassifiedAction`]
    #[must_use]
    pub fn classify(&self, recommendation: &Recommendation) -> ClassifiedAction {
        let confidence = recommendation.confidence.clamp(0.0, 1.0);
        let impact = self.impact(recommendation).total;
        let tier = self.decide_tier(confidence, impact);
        let gestation = self.gestation_period(tier, impact);

        tracing::debug!(
            recommendation = %recommendation.id,
            confidence,
            impact,
            %tier,
            "classified recommendation"
        );

        ClassifiedAction {
            id: ActionId::new(),
            tier,
            recommendation: recommendation.clone(),
            classification: Classification {
                confidence,
                impact,
                reasoning: self.reasoning(tier, confidence, impact),
            },
            gestation_period_ms: gestation
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            status: ActionStatus::Pending,
            queued_at: Utc::now(),
            execution_result: None,
        }
    }

    /// Compute the weighted impact score
    #[must_use]
    pub fn impact(&self, recommendation: &Recommendation) -> ImpactBreakdown {
        let entity = entity_score(recommendation);
        let criticality = self.criticality_score(recommendation);
        let reversibility = reversibility_score(recommendation);
        let cost = self.cost_score(recommendation);

        let w = &self.config.weights;
        let total = (entity * w.entity
            + criticality * w.criticality
            + reversibility * w.reversibility
            + cost * w.cost)
            .clamp(0.0, 1.0);

        ImpactBreakdown {
            entity,
            criticality,
            reversibility,
            cost,
            total,
        }
    }

    /// Map confidence and impact onto a tier
    #[must_use]
    pub fn decide_tier(&self, confidence: f64, impact: f64) -> Tier {
        let c = &self.config;

        if impact >= c.impact_high {
            return if confidence >= c.confidence_high {
                Tier::SemiAutomated
            } else {
                Tier::Assisted
            };
        }

        if confidence >= c.confidence_medium {
            if impact < c.impact_medium {
                Tier::Automated
            } else {
                Tier::SemiAutomated
            }
        } else {
            Tier::Assisted
        }
    }

    /// Objection window for a tier; `None` for assisted actions
    #[must_use]
    pub fn gestation_period(&self, tier: Tier, impact: f64) -> Option<Duration> {
        let table = &self.config.gestation;
        match tier {
            Tier::Automated => Some(Duration::from_millis(table.automated_ms)),
            Tier::SemiAutomated => {
                let base = Duration::from_millis(table.semi_automated_ms);
                if impact > self.config.extended_gestation_impact {
                    let extended = base.as_secs_f64() * self.config.extended_gestation_factor;
                    Some(Duration::try_from_secs_f64(extended).unwrap_or(Duration::MAX))
                } else {
                    Some(base)
                }
            }
            Tier::Assisted => None,
        }
    }

    /// Conservative guard usable independently of tier assignment
    ///
    /// Only trusted, non-critical recommendations made purely of camera and
    /// notification actions pass.
    #[must_use]
    pub fn is_safe_for_automation(&self, recommendation: &Recommendation) -> bool {
        recommendation.confidence >= self.config.confidence_medium
            && recommendation.priority != Priority::Critical
            && recommendation.actions_all_within(&[ActionKind::Camera, ActionKind::Notify])
    }

    fn criticality_score(&self, recommendation: &Recommendation) -> f64 {
        let base = match recommendation.priority {
            Priority::Critical => 1.0,
            Priority::High => 0.75,
            Priority::Medium => 0.5,
            Priority::Low => 0.25,
        };
        if recommendation.category == Category::Safety {
            (base * self.config.safety_criticality_boost).min(1.0)
        } else {
            base
        }
    }

    fn cost_score(&self, recommendation: &Recommendation) -> f64 {
        let changes: Vec<f64> = recommendation
            .impact
            .metrics
            .iter()
            .filter(|m| {
                m.name.to_lowercase().contains("cost")
                    || CURRENCY_UNITS.contains(&m.unit.to_lowercase().as_str())
            })
            .map(opspilot_model::ImpactMetric::fractional_change)
            .collect();

        if changes.is_empty() {
            self.config.default_cost_score
        } else {
            (changes.iter().sum::<f64>() / changes.len() as f64).min(1.0)
        }
    }

    fn reasoning(&self, tier: Tier, confidence: f64, impact: f64) -> String {
        let c = &self.config;
        let confidence_band = band(confidence, c.confidence_medium, c.confidence_high);
        let impact_band = band(impact, c.impact_medium, c.impact_high);
        let sentence = match tier {
            Tier::Automated => {
                "Low-impact action with adequate confidence; executes automatically after a \
                 short objection window."
            }
            Tier::SemiAutomated => {
                "Executes automatically unless an operator objects during the gestation period."
            }
            Tier::Assisted => "Requires explicit operator approval before execution.",
        };
        format!(
            "Confidence is {confidence_band} ({confidence:.2}) and impact is \
             {impact_band} ({impact:.2}). {sentence}"
        )
    }
}

/// Count dispatch/reallocate actions plus listed entities, normalized to 10
fn entity_score(recommendation: &Recommendation) -> f64 {
    let moving = recommendation
        .actions
        .iter()
        .filter(|a| matches!(a.kind(), ActionKind::Dispatch | ActionKind::Reallocate))
        .count();
    let listed: usize = recommendation
        .actions
        .iter()
        .map(|a| a.listed_entities().len())
        .sum();
    let estimate = (moving + listed).max(1);
    (estimate as f64 / 10.0).min(1.0)
}

fn reversibility_score(recommendation: &Recommendation) -> f64 {
    let kinds: Vec<ActionKind> = recommendation.actions.iter().map(|a| a.kind()).collect();

    if !kinds.is_empty() && kinds.iter().all(|k| *k == ActionKind::Camera) {
        0.1
    } else if kinds.contains(&ActionKind::Notify) {
        0.2
    } else if kinds
        .iter()
        .any(|k| matches!(k, ActionKind::Dispatch | ActionKind::Reallocate))
    {
        0.7
    } else {
        0.5
    }
}

fn band(value: f64, medium: f64, high: f64) -> &'static str {
    if value >= high {
        "high"
    } else if value >= medium {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opspilot_model::{
        Action, AlertId, ImpactMetric, RecommendationId, RecommendationImpact, Severity,
    };

    fn recommendation(priority: Priority, confidence: f64, actions: Vec<Action>) -> Recommendation {
        Recommendation {
            id: RecommendationId::new(),
            alert_id: AlertId::new(),
            title: "test".into(),
            description: String::new(),
            category: Category::Maintenance,
            priority,
            confidence,
            impact: RecommendationImpact::default(),
            actions,
            alternatives: Vec::new(),
            alternative_of: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn oversized_extension_saturates() {
        let mut config = AutonomyConfig::default();
        config.extended_gestation_factor = 1e300;
        assert!(config.validate().is_ok());
        let classifier = AutonomyClassifier::new(config);
        assert_eq!(
            classifier.gestation_period(Tier::SemiAutomated, 0.9),
            Some(Duration::MAX)
        );
    }

    #[test]
    fn all_camera_actions_are_most_reversible() {
        let rec = recommendation(Priority::Medium, 0.85, vec![Action::camera("zone-a")]);
        assert_eq!(reversibility_score(&rec), 0.1);
    }

    #[test]
    fn notify_takes_precedence_over_dispatch() {
        let rec = recommendation(
            Priority::Medium,
            0.85,
            vec![
                Action::dispatch("R-1", "bay", "fault"),
                Action::notify("ops", "pager", "fault", Severity::High),
            ],
        );
        assert_eq!(reversibility_score(&rec), 0.2);
    }

    #[test]
    fn dispatch_only_is_hard_to_reverse() {
        let rec = recommendation(Priority::Medium, 0.85, vec![Action::dispatch("R-1", "bay", "x")]);
        assert_eq!(reversibility_score(&rec), 0.7);
    }

    #[test]
    fn no_actions_is_neutral() {
        let rec = recommendation(Priority::Medium, 0.85, vec![]);
        assert_eq!(reversibility_score(&rec), 0.5);
        assert_eq!(entity_score(&rec), 0.1);
    }

    #[test]
    fn entity_estimate_counts_listed_entities() {
        let workers: Vec<String> = (0..6).map(|i| format!("W-{i}")).collect();
        let rec = recommendation(
            Priority::Medium,
            0.85,
            vec![Action::reallocate("pickers", "zone-b", workers)],
        );
        assert!((entity_score(&rec) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn safety_criticality_is_boosted_and_capped() {
        let classifier = AutonomyClassifier::default();
        let mut rec = recommendation(Priority::High, 0.9, vec![]);
        rec.category = Category::Safety;
        assert_eq!(classifier.criticality_score(&rec), 1.0);
        rec.priority = Priority::Low;
        assert!((classifier.criticality_score(&rec) - 0.375).abs() < 1e-9);
    }

    #[test]
    fn cost_score_averages_currency_metrics() {
        let classifier = AutonomyClassifier::default();
        let mut rec = recommendation(Priority::Medium, 0.85, vec![]);
        assert_eq!(classifier.cost_score(&rec), 0.3);

        rec.impact.metrics = vec![
            ImpactMetric::new("Overtime Cost", 2000.0, 1500.0, "USD"),
            ImpactMetric::new("Spend", 100.0, 150.0, "usd"),
            ImpactMetric::new("Throughput", 400.0, 460.0, "units/h"),
        ];
        assert!((classifier.cost_score(&rec) - 0.375).abs() < 1e-9);
    }

    #[test]
    fn semi_automated_high_impact_gets_extended_window() {
        let classifier = AutonomyClassifier::default();
        assert_eq!(
            classifier.gestation_period(Tier::SemiAutomated, 0.65),
            Some(Duration::from_millis(67_500))
        );
        assert_eq!(
            classifier.gestation_period(Tier::SemiAutomated, 0.5),
            Some(Duration::from_millis(45_000))
        );
        assert_eq!(classifier.gestation_period(Tier::Assisted, 0.9), None);
    }

    #[test]
    fn low_confidence_is_assisted() {
        let classifier = AutonomyClassifier::default();
        assert_eq!(classifier.decide_tier(0.3, 0.1), Tier::Assisted);
        assert_eq!(classifier.decide_tier(0.6, 0.1), Tier::Automated);
        assert_eq!(classifier.decide_tier(0.6, 0.5), Tier::SemiAutomated);
        assert_eq!(classifier.decide_tier(0.6, 0.75), Tier::Assisted);
    }

    #[test]
    fn reasoning_reports_bands() {
        let classifier = AutonomyClassifier::default();
        let text = classifier.reasoning(Tier::Assisted, 0.3, 0.75);
        assert!(text.contains("Confidence is low (0.30)"));
        assert!(text.contains("impact is high (0.75)"));
        assert!(text.contains("explicit operator approval"));
    }

    #[test]
    fn safe_for_automation_guard() {
        let classifier = AutonomyClassifier::default();
        let rec = recommendation(Priority::High, 0.7, vec![Action::camera("zone-a")]);
        assert!(classifier.is_safe_for_automation(&rec));

        let critical = recommendation(Priority::Critical, 0.95, vec![Action::camera("zone-a")]);
        assert!(!classifier.is_safe_for_automation(&critical));

        let unsure = recommendation(Priority::Low, 0.4, vec![Action::camera("zone-a")]);
        assert!(!classifier.is_safe_for_automation(&unsure));

        let dispatch =
            recommendation(Priority::Low, 0.9, vec![Action::dispatch("R-1", "bay", "x")]);
        assert!(!classifier.is_safe_for_automation(&dispatch));
    }
}
