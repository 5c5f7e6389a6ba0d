//! Recommendation synthesis
//!
//! Each alert yields one primary recommendation built from its category
//! template, plus alternatives that keep the primary's actions at reduced
//! confidence and one step lower priority.

mod store;
mod templates;

pub use store::RecommendationStore;
pub use templates::{default_metrics, TEMPLATE_KEYS};

use crate::config::SynthesisConfig;
use chrono::{Duration, Utc};
use opspilot_model::{
    Alert, OperationalContext, Priority, Recommendation, RecommendationId, RecommendationImpact,
};
use std::sync::Arc;
use templates::Draft;

/// Produces recommendations for alerts and retains them
#[derive(Debug, Clone)]
pub struct RecommendationSynthesizer {
    config: SynthesisConfig,
    store: Arc<RecommendationStore>,
}

impl RecommendationSynthesizer {
    /// Create a synthesizer writing into `store`
    #[must_use]
    pub fn new(config: SynthesisConfig, store: Arc<RecommendationStore>) -> Self {
        Self { config, store }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<RecommendationStore> {
        &self.store
    }

    /// Recommendations for one alert, primary first
    ///
    /// Every alert gets a primary with at least one action. All returned
    /// recommendations are stored before this returns.
    pub fn synthesize(&self, alert: &Alert, context: &OperationalContext) -> Vec<Recommendation> {
        let draft = templates::draft(alert, &self.config);
        let metrics = self.metrics_for(draft.template);
        let now = Utc::now();

        let mut primary = Recommendation {
            id: RecommendationId::new(),
            alert_id: alert.id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: alert.category,
            priority: Priority::from(alert.severity),
            confidence: (alert.confidence * self.config.dampening.get(alert.category))
                .clamp(0.0, 1.0),
            impact: RecommendationImpact {
                positive: draft.positive.clone(),
                negative: draft.negative.clone(),
                metrics,
            },
            actions: draft.actions.clone(),
            alternatives: Vec::new(),
            alternative_of: None,
            created_at: now,
            expires_at: draft
                .expires_in_minutes
                .map(|minutes| now + Duration::minutes(i64::from(minutes))),
        };

        let alternatives = self.alternatives(&primary, &draft);
        primary.alternatives = alternatives.iter().map(|r| r.id).collect();

        let mut recommendations = Vec::with_capacity(1 + alternatives.len());
        recommendations.push(primary);
        recommendations.extend(alternatives);

        self.store.insert_all(&recommendations);
        tracing::info!(
            alert = %alert.id,
            warehouse = %context.warehouse_id,
            template = draft.template,
            count = recommendations.len(),
            "recommendations generated"
        );
        recommendations
    }

    fn metrics_for(&self, template: &str) -> Vec<opspilot_model::ImpactMetric> {
        self.config
            .metric_overrides
            .get(template)
            .cloned()
            .unwrap_or_else(|| default_metrics(template))
    }

    fn alternatives(&self, primary: &Recommendation, draft: &Draft) -> Vec<Recommendation> {
        let mut alternatives = Vec::with_capacity(self.config.max_alternatives);
        let mut confidence = primary.confidence;
        let mut priority = primary.priority;

        for step in 1..=self.config.max_alternatives {
            confidence *= self.config.alternative_confidence_factor;
            priority = priority.step_down();
            let (title, description) = reword(step, draft);

            alternatives.push(Recommendation {
                id: RecommendationId::new(),
                title,
                description,
                priority,
                confidence,
                alternatives: Vec::new(),
                alternative_of: Some(primary.id),
                ..primary.clone()
            });
        }
        alternatives
    }
}

fn reword(step: usize, draft: &Draft) -> (String, String) {
    if step == 1 {
        (
            format!("Staged response: {}", draft.title),
            format!("Lower-commitment variant, to be confirmed on site. {}", draft.description),
        )
    } else {
        (
            format!("Deferred response: {}", draft.title),
            format!("Defer until the next planning window. {}", draft.description),
        )
    }
}
