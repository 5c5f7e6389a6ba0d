//! Analyzer contract and concurrent fan-out
//!
//! Specialist analyzers are opaque. Each one receives the operational
//! context and returns a bounded, confidence-scored list of issues. The
//! pipeline runs every analyzer of a cycle concurrently and joins them
//! before detection; a failing or panicking analyzer only degrades its own
//! result.

use crate::error::AnalysisError;
use async_trait::async_trait;
use opspilot_model::{Issue, OperationalContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Contract every specialist analyzer satisfies
#[async_trait]
pub trait AnalysisContract: Send + Sync {
    /// Analyzer name, used in logs and reports
    fn name(&self) -> &str;

    /// Analyze the current operational state
    async fn analyze(&self, context: &OperationalContext) -> Result<AnalysisResult, AnalysisError>;
}

/// Output of one analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Issues found
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Free-text suggestions from the analyzer
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Overall analyzer confidence in [0, 1]
    pub confidence: f64,
    /// One-line summary
    #[serde(default)]
    pub summary: String,
}

impl AnalysisResult {
    /// Create a result from issues
    #[must_use]
    pub fn new(issues: Vec<Issue>, confidence: f64, summary: impl Into<String>) -> Self {
        Self {
            issues,
            recommendations: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            summary: summary.into(),
        }
    }

    /// Zero-confidence empty result standing in for a failed analyzer
    #[must_use]
    pub fn degraded(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Clamp confidences and keep the `max` most confident issues
    #[must_use]
    pub fn bounded(mut self, max: usize) -> Self {
        self.confidence = clamp_unit(self.confidence);
        for issue in &mut self.issues {
            issue.confidence = clamp_unit(issue.confidence);
        }
        if self.issues.len() > max {
            self.issues
                .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            self.issues.truncate(max);
        }
        self
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// One analyzer's contribution to a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerReport {
    /// Analyzer name
    pub analyzer: String,
    /// Bounded result, empty when the analyzer failed
    pub result: AnalysisResult,
    /// Failure reason, if the analyzer failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerReport {
    /// Whether the analyzer failed and its result is a placeholder
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Issues from every report, in analyzer order
pub fn collect_issues(reports: &[AnalyzerReport]) -> Vec<Issue> {
    reports
        .iter()
        .flat_map(|r| r.result.issues.iter().cloned())
        .collect()
}

/// Run every analyzer concurrently and wait for all of them
///
/// Reports come back in the order of `analyzers`. Failures and panics are
/// logged and replaced by [`AnalysisResult::degraded`].
pub async fn run_analyses(
    analyzers: &[Arc<dyn AnalysisContract>],
    context: &OperationalContext,
    max_issues: usize,
) -> Vec<AnalyzerReport> {
    let context = Arc::new(context.clone());

    let tasks = analyzers.iter().map(|analyzer| {
        let analyzer = Arc::clone(analyzer);
        let context = Arc::clone(&context);
        tokio::spawn(async move { analyzer.analyze(&context).await })
    });
    let joined = futures::future::join_all(tasks).await;

    analyzers
        .iter()
        .zip(joined)
        .map(|(analyzer, outcome)| {
            let name = analyzer.name().to_string();
            let failure = match outcome {
                Ok(Ok(result)) => {
                    let result = result.bounded(max_issues);
                    tracing::debug!(
                        analyzer = %name,
                        issues = result.issues.len(),
                        confidence = result.confidence,
                        "analysis complete"
                    );
                    return AnalyzerReport {
                        analyzer: name,
                        result,
                        error: None,
                    };
                }
                Ok(Err(e)) => e.to_string(),
                Err(join_error) => format!("analyzer panicked: {join_error}"),
            };
            tracing::warn!(
                analyzer = %name,
                error = %failure,
                "analyzer failed; using degraded result"
            );
            AnalyzerReport {
                result: AnalysisResult::degraded(format!("{name} unavailable")),
                analyzer: name,
                error: Some(failure),
            }
        })
        .collect()
}

/// Analyzer that replays a fixed list of issues
///
/// Used by the `replay` command to push recorded issues through a cycle.
#[derive(Debug, Clone)]
pub struct RecordedAnalyzer {
    name: String,
    issues: Vec<Issue>,
}

impl RecordedAnalyzer {
    /// Create an analyzer that always reports `issues`
    #[must_use]
    pub fn new(name: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            name: name.into(),
            issues,
        }
    }
}

#[async_trait]
impl AnalysisContract for RecordedAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        _context: &OperationalContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        let confidence = self
            .issues
            .iter()
            .map(|i| i.confidence)
            .fold(0.0_f64, f64::max);
        Ok(AnalysisResult::new(
            self.issues.clone(),
            confidence,
            format!("{} recorded issue(s)", self.issues.len()),
        ))
    }
}
