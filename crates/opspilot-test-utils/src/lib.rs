//! Testing utilities for the OpsPilot workspace
//!
//! Shared fixtures, scripted analyzers and executors.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use opspilot_core::{
    AnalysisContract, AnalysisError, AnalysisResult, MetricSource, OpsPipeline, OutcomeError,
    PipelineConfig,
};
use opspilot_kernel::{ActionExecutor, ExecutorError};
use opspilot_model::{
    Action, ActionId, ActionStatus, AlertId, Category, Classification, ClassifiedAction,
    ExecutionResult, ImpactMetric, Issue, MetricValue, OperationalContext, Outcome, Priority,
    Recommendation, RecommendationId, RecommendationImpact, Tier,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn context() -> OperationalContext {
    OperationalContext::new("test-warehouse").with_zones(["zone-a", "zone-b", "zone-c"])
}

pub fn recommendation(
    category: Category,
    priority: Priority,
    confidence: f64,
    actions: Vec<Action>,
) -> Recommendation {
    Recommendation {
        id: RecommendationId::new(),
        alert_id: AlertId::new(),
        title: format!("Test {category} recommendation"),
        description: String::new(),
        category,
        priority,
        confidence,
        impact: RecommendationImpact {
            positive: Vec::new(),
            negative: Vec::new(),
            metrics: vec![ImpactMetric::new("Stock Level", 60.0, 85.0, "%")],
        },
        actions,
        alternatives: Vec::new(),
        alternative_of: None,
        created_at: Utc::now(),
        expires_at: None,
    }
}

pub fn camera_recommendation(confidence: f64) -> Recommendation {
    recommendation(
        Category::General,
        Priority::Medium,
        confidence,
        vec![Action::camera("zone-a")],
    )
}

pub fn classified(
    tier: Tier,
    recommendation: Recommendation,
    gestation: Duration,
) -> ClassifiedAction {
    ClassifiedAction {
        id: ActionId::new(),
        tier,
        classification: Classification {
            confidence: recommendation.confidence,
            impact: 0.2,
            reasoning: "test fixture".into(),
        },
        recommendation,
        gestation_period_ms: u64::try_from(gestation.as_millis()).ok(),
        status: ActionStatus::Pending,
        queued_at: Utc::now(),
        execution_result: None,
    }
}

pub fn automated_action() -> ClassifiedAction {
    classified(Tier::Automated, camera_recommendation(0.85), Duration::from_secs(10))
}

pub fn safety_issue(confidence: f64, zones: &[&str]) -> Issue {
    Issue::new(Category::Safety, "Blocked fire exit", confidence)
        .with_description("Pallet obstructing the fire exit")
        .with_zones(zones.iter().copied())
}

pub fn setup_test_pipeline() -> OpsPipeline {
    match OpsPipeline::new(PipelineConfig::default()) {
        Ok(pipeline) => pipeline,
        Err(e) => panic!("default configuration must be valid: {e}"),
    }
}

/// Analyzer returning a fixed result
#[derive(Debug, Clone)]
pub struct StaticAnalyzer {
    pub name: String,
    pub result: AnalysisResult,
}

impl StaticAnalyzer {
    pub fn new(name: &str, issues: Vec<Issue>) -> Self {
        Self {
            name: name.into(),
            result: AnalysisResult::new(issues, 0.9, format!("{name} static result")),
        }
    }
}

#[async_trait]
impl AnalysisContract for StaticAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        _context: &OperationalContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.result.clone())
    }
}

/// Analyzer that always returns an error
#[derive(Debug, Clone)]
pub struct FailingAnalyzer(pub String);

#[async_trait]
impl AnalysisContract for FailingAnalyzer {
    fn name(&self) -> &str {
        &self.0
    }

    async fn analyze(
        &self,
        _context: &OperationalContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        Err(AnalysisError::MissingData("no telemetry".into()))
    }
}

/// Analyzer that panics
#[derive(Debug, Clone)]
pub struct PanickingAnalyzer(pub String);

#[async_trait]
impl AnalysisContract for PanickingAnalyzer {
    fn name(&self) -> &str {
        &self.0
    }

    async fn analyze(
        &self,
        _context: &OperationalContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        panic!("analyzer {} crashed", self.0)
    }
}

/// Executor that records every action it runs
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<ActionId>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<ActionId> {
        self.executed.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.executed.lock().len()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(&self, action: &ClassifiedAction) -> Result<ExecutionResult, ExecutorError> {
        self.executed.lock().push(action.id);
        Ok(ExecutionResult::success(format!("recorded {}", action.id)))
    }
}

/// Executor that always fails
#[derive(Debug, Default)]
pub struct FailingExecutor;

#[async_trait]
impl ActionExecutor for FailingExecutor {
    async fn execute(&self, _action: &ClassifiedAction) -> Result<ExecutionResult, ExecutorError> {
        Err(ExecutorError::Unavailable("fleet manager offline".into()))
    }
}

/// Executor that panics
#[derive(Debug, Default)]
pub struct PanickingExecutor;

#[async_trait]
impl ActionExecutor for PanickingExecutor {
    async fn execute(&self, _action: &ClassifiedAction) -> Result<ExecutionResult, ExecutorError> {
        panic!("executor crashed")
    }
}

/// Metric source returning fixed readings and counting calls
#[derive(Debug, Default)]
pub struct FixedMetricSource {
    pub metrics: Vec<MetricValue>,
    calls: AtomicUsize,
}

impl FixedMetricSource {
    pub fn new(metrics: Vec<MetricValue>) -> Self {
        Self {
            metrics,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSource for FixedMetricSource {
    async fn measure(&self, _outcome: &Outcome) -> Result<Vec<MetricValue>, OutcomeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metrics.clone())
    }
}
