//! Accuracy scoring and aggregate statistics

use chrono::{DateTime, Utc};
use opspilot_model::{Category, MetricValue, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accuracy of achieved against promised metrics
///
/// Metrics are matched by name; unmatched ones are ignored. Each match
/// scores `max(1 - |a - p| / |p|, 0)`, and two zeros score 1. Returns `None`
/// when no metric matches.
#[must_use]
pub fn accuracy(promised: &[MetricValue], achieved: &[MetricValue]) -> Option<f64> {
    let scores: Vec<f64> = promised
        .iter()
        .filter_map(|p| {
            achieved
                .iter()
                .find(|a| a.name == p.name)
                .map(|a| metric_accuracy(p.value, a.value))
        })
        .collect();

    if scores.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Some(mean.clamp(0.0, 1.0))
    }
}

fn metric_accuracy(promised: f64, achieved: f64) -> f64 {
    if promised == 0.0 {
        return if achieved == 0.0 { 1.0 } else { 0.0 };
    }
    let score = 1.0 - (achieved - promised).abs() / promised.abs();
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Selects outcomes for statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeFilter {
    /// Executed at or after
    pub since: Option<DateTime<Utc>>,
    /// Executed before
    pub until: Option<DateTime<Utc>>,
    /// Only this category
    pub category: Option<Category>,
}

impl OutcomeFilter {
    /// Match every outcome
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With lower time bound
    #[inline]
    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// With upper time bound
    #[inline]
    #[must_use]
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// With category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub(crate) fn matches(&self, outcome: &Outcome) -> bool {
        self.since.map_or(true, |s| outcome.executed_at >= s)
            && self.until.map_or(true, |u| outcome.executed_at < u)
            && self.category.map_or(true, |c| outcome.category == c)
    }
}

/// Accuracy and volume for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Outcomes tracked
    pub count: usize,
    /// Mean accuracy of measured outcomes
    pub mean_accuracy: f64,
}

/// Aggregate outcome statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeStats {
    /// Outcomes tracked
    pub count: usize,
    /// Outcomes with a recorded measurement
    pub measured: usize,
    /// Mean accuracy of measured outcomes
    pub mean_accuracy: f64,
    /// Share of measured outcomes that met the success threshold
    pub success_rate: f64,
    /// Per-category breakdown
    pub by_category: BTreeMap<Category, CategoryStats>,
}

impl OutcomeStats {
    pub(crate) fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut stats = Self::default();
        let mut accuracy_sum = 0.0;
        let mut successes = 0_usize;
        let mut per_category: BTreeMap<Category, (usize, usize, f64)> = BTreeMap::new();

        for outcome in outcomes {
            stats.count += 1;
            let entry = per_category.entry(outcome.category).or_default();
            entry.0 += 1;
            if outcome.is_finalized() {
                stats.measured += 1;
                accuracy_sum += outcome.accuracy;
                entry.1 += 1;
                entry.2 += outcome.accuracy;
                if outcome.status == opspilot_model::OutcomeStatus::Completed {
                    successes += 1;
                }
            }
        }

        if stats.measured > 0 {
            #[allow(clippy::cast_precision_loss)]
            let measured = stats.measured as f64;
            #[allow(clippy::cast_precision_loss)]
            let succeeded = successes as f64;
            stats.mean_accuracy = accuracy_sum / measured;
            stats.success_rate = succeeded / measured;
        }
        stats.by_category = per_category
            .into_iter()
            .map(|(category, (count, measured, sum))| {
                #[allow(clippy::cast_precision_loss)]
                let mean_accuracy = if measured > 0 { sum / measured as f64 } else { 0.0 };
                (category, CategoryStats { count, mean_accuracy })
            })
            .collect();
        stats
    }
}
