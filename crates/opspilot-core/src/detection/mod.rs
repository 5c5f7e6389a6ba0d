//! Alert detection
//!
//! Turns the union of issues from one cycle into scored alerts:
//! 1. Issues with the same signature collapse into one (max confidence)
//! 2. Severity is kept from the analyzer or derived from confidence and reach
//! 3. Impact scope and magnitude are scored and weighted by category
//! 4. Every data factor gets an equal share of the explanation
//!
//! New alerts land in the [`AlertStore`]; re-detecting an open signature
//! merges the new issue into the stored alert and re-scores it instead of
//! opening a second one. A refresh never lowers severity.

mod store;

pub use store::{AlertFilter, AlertStore, Upsert};

use crate::config::DetectionConfig;
use chrono::Utc;
use opspilot_model::{
    Alert, AlertId, AlertImpact, AlertStatus, Category, DataFactor, Explainability,
    FactorContribution, ImpactScope, Issue, IssueId, IssueSignature, Severity,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Scores issues into alerts and retains them
#[derive(Debug, Clone)]
pub struct AlertDetector {
    config: DetectionConfig,
    store: Arc<AlertStore>,
}

impl AlertDetector {
    /// Create a detector writing into `store`
    #[must_use]
    pub fn new(config: DetectionConfig, store: Arc<AlertStore>) -> Self {
        Self { config, store }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    /// Detect alerts for one cycle
    ///
    /// Returns one alert per distinct signature, in first-seen order. Alerts
    /// whose signature was already open come back refreshed, not duplicated.
    pub fn detect<I>(&self, issues: I) -> Vec<Alert>
    where
        I: IntoIterator<Item = Issue>,
    {
        self.scan(issues).into_iter().map(Upsert::into_alert).collect()
    }

    /// Detect alerts for one cycle, telling new alerts from refreshed ones
    pub fn scan<I>(&self, issues: I) -> Vec<Upsert>
    where
        I: IntoIterator<Item = Issue>,
    {
        let upserts: Vec<Upsert> = deduplicate(issues)
            .into_iter()
            .map(|issue| {
                let alert = self.build_alert(issue.clone());
                self.store.upsert_with(alert, |existing| self.rescore(existing, issue))
            })
            .collect();

        let raised = upserts.iter().filter(|u| u.is_new()).count();
        tracing::info!(
            alerts = upserts.len(),
            raised,
            refreshed = upserts.len() - raised,
            "alert detection complete"
        );
        upserts
    }

    /// Merge a re-detected issue into an open alert and score the result
    fn rescore(&self, existing: &Alert, issue: Issue) -> Alert {
        let mut merged = Issue {
            id: IssueId::new(),
            category: existing.category,
            title: existing.title.clone(),
            description: existing.description.clone(),
            severity: None,
            confidence: existing.confidence,
            affected_entities: existing.affected_entities.clone(),
            affected_zones: existing.affected_zones.clone(),
            data_factors: existing
                .explainability
                .data_factors
                .iter()
                .map(|f| DataFactor {
                    name: f.name.clone(),
                    value: f.value,
                    unit: f.unit.clone(),
                })
                .collect(),
        };
        merge_into(&mut merged, issue);

        let mut alert = self.build_alert(merged);
        alert.severity = alert.severity.max(existing.severity);
        alert
    }

    /// Score a single (already merged) issue
    #[must_use]
    pub fn build_alert(&self, issue: Issue) -> Alert {
        let severity = derive_severity(&issue);
        let impact = assess_impact(&issue, self.config.category_weights.get(issue.category));
        let explainability = explain(&issue);
        let signature = issue.signature();

        tracing::debug!(
            category = %issue.category,
            %severity,
            scope = ?impact.scope,
            magnitude = impact.magnitude,
            "issue scored"
        );

        Alert {
            id: AlertId::new(),
            severity,
            category: issue.category,
            title: issue.title,
            description: issue.description,
            detected_at: Utc::now(),
            affected_entities: issue.affected_entities,
            affected_zones: issue.affected_zones,
            confidence: issue.confidence,
            impact,
            explainability,
            status: AlertStatus::Active,
            signature,
        }
    }
}

/// Collapse issues sharing a signature
///
/// The survivor keeps the first occurrence's id and text, the maximum
/// confidence and severity, and the union of zones and data factors.
#[must_use]
pub fn deduplicate<I>(issues: I) -> Vec<Issue>
where
    I: IntoIterator<Item = Issue>,
{
    let mut merged: Vec<Issue> = Vec::new();
    let mut index: HashMap<IssueSignature, usize> = HashMap::new();

    for issue in issues {
        let signature = issue.signature();
        match index.get(&signature) {
            Some(&at) => merge_into(&mut merged[at], issue),
            None => {
                index.insert(signature, merged.len());
                merged.push(issue);
            }
        }
    }
    merged
}

fn merge_into(kept: &mut Issue, duplicate: Issue) {
    kept.confidence = kept.confidence.max(duplicate.confidence);
    kept.severity = match (kept.severity, duplicate.severity) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    for zone in duplicate.affected_zones {
        if !kept.affected_zones.contains(&zone) {
            kept.affected_zones.push(zone);
        }
    }
    for factor in duplicate.data_factors {
        if !kept.data_factors.iter().any(|f| f.name == factor.name) {
            kept.data_factors.push(factor);
        }
    }
}

/// Severity of an issue, derived when the analyzer did not assert one
#[must_use]
pub fn derive_severity(issue: &Issue) -> Severity {
    if let Some(severity) = issue.severity {
        return severity;
    }

    let confidence = issue.confidence;
    let zones = issue.affected_zones.len();
    let entities = issue.affected_entities.len();

    if confidence > 0.8 && issue.category == Category::Safety {
        Severity::Critical
    } else if confidence > 0.9 && zones > 2 {
        Severity::Critical
    } else if confidence > 0.7 && (zones > 1 || entities > 3) {
        Severity::High
    } else if confidence > 0.5 || entities > 1 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Scope, magnitude and handling window of an issue
#[must_use]
pub fn assess_impact(issue: &Issue, category_weight: f64) -> AlertImpact {
    #[allow(clippy::cast_precision_loss)]
    let zones = issue.affected_zones.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let entities = issue.affected_entities.len() as f64;

    let (scope, base) = if zones > 2.0 {
        (ImpactScope::Warehouse, 0.8 + zones.min(5.0) / 5.0 * 0.2)
    } else if zones > 0.0 {
        (ImpactScope::Zone, 0.4 + zones.min(3.0) / 3.0 * 0.4)
    } else {
        (ImpactScope::Entity, (entities / 10.0).min(0.4))
    };
    let magnitude = (base * category_weight).min(1.0);

    let time_window_minutes = match issue.category {
        Category::Safety => 5,
        Category::Maintenance => 30,
        _ if magnitude > 0.7 => 15,
        _ => 60,
    };

    AlertImpact {
        scope,
        magnitude,
        time_window_minutes,
    }
}

/// Equal-share factor contributions and a reasoning sentence
#[must_use]
pub fn explain(issue: &Issue) -> Explainability {
    #[allow(clippy::cast_precision_loss)]
    let share = if issue.data_factors.is_empty() {
        0.0
    } else {
        1.0 / issue.data_factors.len() as f64
    };

    let data_factors = issue
        .data_factors
        .iter()
        .map(|f| FactorContribution {
            name: f.name.clone(),
            value: f.value,
            unit: f.unit.clone(),
            contribution: share,
        })
        .collect();

    Explainability {
        data_factors,
        reasoning: reasoning(issue),
    }
}

fn reasoning(issue: &Issue) -> String {
    let lead = if issue.description.is_empty() {
        issue.title.as_str()
    } else {
        issue.description.as_str()
    }
    .trim_end_matches('.');
    let entities = issue.affected_entities.len();
    let zones = issue.affected_zones.len();
    let factors = if issue.data_factors.is_empty() {
        "No supporting data factors reported.".to_string()
    } else {
        let listed: Vec<String> = issue.data_factors.iter().map(DataFactor::to_string).collect();
        format!("Supporting factors: {}.", listed.join(", "))
    };

    format!(
        "{lead}. Affects {entities} {} across {zones} {}. {factors}",
        if entities == 1 { "entity" } else { "entities" },
        if zones == 1 { "zone" } else { "zones" },
    )
}
