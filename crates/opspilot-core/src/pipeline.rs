//! The operations pipeline facade
//!
//! [`OpsPipeline`] owns one instance of every stage and the stores they
//! share, and exposes the pipeline entry points. Data flows strictly
//! forward; the only way back is an operator objection, which cancels a
//! queued action before it executes.

use crate::analysis::{collect_issues, run_analyses, AnalysisContract, AnalyzerReport};
use crate::config::PipelineConfig;
use crate::detection::{AlertDetector, AlertFilter, AlertStore};
use crate::error::Result;
use crate::outcome::{MetricSource, OutcomeFilter, OutcomeStats, OutcomeTracker};
use crate::synthesis::{RecommendationStore, RecommendationSynthesizer};
use opspilot_kernel::{ActionExecutor, AutonomyClassifier, GestationItem, GestationScheduler};
use opspilot_model::{
    ActionId, ActionStatus, Alert, AlertId, ClassifiedAction, MetricValue, OperationalContext,
    Outcome, OutcomeId, Recommendation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// What one evaluation cycle produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Per-analyzer results
    pub analyses: Vec<AnalyzerReport>,
    /// Alerts raised or refreshed
    pub alerts: Vec<Alert>,
    /// Open alerts that were only refreshed; nothing new was synthesized for them
    #[serde(default)]
    pub refreshed: Vec<AlertId>,
    /// Recommendations generated, primaries and alternatives
    pub recommendations: Vec<Recommendation>,
    /// Classified primary recommendations
    pub actions: Vec<ClassifiedAction>,
    /// Actions queued for deferred execution
    pub queued: Vec<ActionId>,
    /// Actions waiting for operator approval
    pub awaiting_approval: Vec<ActionId>,
}

impl CycleReport {
    /// Number of analyzers that failed
    #[must_use]
    pub fn degraded_analyzers(&self) -> usize {
        self.analyses.iter().filter(|a| a.is_degraded()).count()
    }
}

/// The five-stage operations pipeline
///
/// Every executed action is tracked automatically: the pipeline registers a
/// scheduler completion callback that opens an outcome for it.
#[derive(Debug)]
pub struct OpsPipeline {
    config: PipelineConfig,
    alerts: Arc<AlertStore>,
    recommendations: Arc<RecommendationStore>,
    detector: AlertDetector,
    synthesizer: RecommendationSynthesizer,
    classifier: AutonomyClassifier,
    scheduler: GestationScheduler,
    outcomes: OutcomeTracker,
}

impl OpsPipeline {
    /// Create a pipeline with the default dispatcher
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let scheduler = GestationScheduler::new(config.gestation);
        Self::with_scheduler(config, scheduler)
    }

    /// Create a pipeline around an existing scheduler
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn with_scheduler(config: PipelineConfig, scheduler: GestationScheduler) -> Result<Self> {
        config.validate()?;

        let alerts = Arc::new(AlertStore::new());
        let recommendations = Arc::new(RecommendationStore::new());
        let outcomes = OutcomeTracker::new(config.outcome);

        let tracker = outcomes.clone();
        scheduler.on_completion(Arc::new(move |item: &GestationItem| {
            if item.status() != ActionStatus::Completed {
                return;
            }
            if let Err(e) = tracker.start_tracking(&item.action.recommendation, &item.action) {
                tracing::warn!(action = %item.id(), error = %e, "outcome tracking not started");
            }
        }));

        Ok(Self {
            detector: AlertDetector::new(config.detection, Arc::clone(&alerts)),
            synthesizer: RecommendationSynthesizer::new(
                config.synthesis.clone(),
                Arc::clone(&recommendations),
            ),
            classifier: AutonomyClassifier::new(config.autonomy),
            scheduler,
            outcomes,
            alerts,
            recommendations,
            config,
        })
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Alert store
    #[inline]
    #[must_use]
    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    /// Recommendation store
    #[inline]
    #[must_use]
    pub fn recommendations(&self) -> &RecommendationStore {
        &self.recommendations
    }

    /// Gestation scheduler
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &GestationScheduler {
        &self.scheduler
    }

    /// Outcome tracker
    #[inline]
    #[must_use]
    pub fn outcomes(&self) -> &OutcomeTracker {
        &self.outcomes
    }

    /// Run analyzers concurrently
    pub async fn run_analyses(
        &self,
        context: &OperationalContext,
        analyzers: &[Arc<dyn AnalysisContract>],
    ) -> Vec<AnalyzerReport> {
        run_analyses(analyzers, context, self.config.max_issues_per_analyzer).await
    }

    /// Turn analyzer output into alerts
    pub fn detect_alerts(
        &self,
        context: &OperationalContext,
        analyses: &[AnalyzerReport],
    ) -> Vec<Alert> {
        tracing::debug!(
            warehouse = %context.warehouse_id,
            analyses = analyses.len(),
            "detecting alerts"
        );
        self.detector.detect(collect_issues(analyses))
    }

    /// Recommendations for one alert, primary first
    pub fn generate_recommendations(
        &self,
        alert: &Alert,
        context: &OperationalContext,
    ) -> Vec<Recommendation> {
        self.synthesizer.synthesize(alert, context)
    }

    /// Assign an autonomy tier to a recommendation
    #[must_use]
    pub fn classify_action(
        &self,
        recommendation: &Recommendation,
        context: &OperationalContext,
    ) -> ClassifiedAction {
        let action = self.classifier.classify(recommendation);
        tracing::debug!(
            warehouse = %context.warehouse_id,
            action = %action.id,
            tier = %action.tier,
            "recommendation classified"
        );
        action
    }

    /// Queue an action for execution after `period`
    ///
    /// # Errors
    /// Fails for assisted actions, duplicates and non-pending actions.
    pub fn queue_action(
        &self,
        action: ClassifiedAction,
        period: Duration,
    ) -> Result<GestationItem> {
        Ok(self.scheduler.queue(action, period)?)
    }

    /// Queue an operator-approved action for immediate execution
    ///
    /// # Errors
    /// Fails for duplicates and non-pending actions.
    pub fn approve_action(&self, action: ClassifiedAction) -> Result<GestationItem> {
        Ok(self.scheduler.approve(action)?)
    }

    /// Cancel a pending action
    ///
    /// # Errors
    /// Returns an invalid-transition error for unknown or non-pending items.
    pub fn object_to_action(
        &self,
        id: ActionId,
        reason: impl Into<String>,
    ) -> Result<GestationItem> {
        Ok(self.scheduler.object_to_action(id, reason)?)
    }

    /// Use `executor` for one queued action
    pub fn register_executor(&self, id: ActionId, executor: Arc<dyn ActionExecutor>) {
        self.scheduler.register_executor(id, executor);
    }

    /// Start tracking an executed action by hand
    ///
    /// Executions through the scheduler are tracked automatically.
    ///
    /// # Errors
    /// Fails if the action was not executed or is already tracked.
    pub fn start_tracking(
        &self,
        recommendation: &Recommendation,
        action: &ClassifiedAction,
    ) -> Result<Outcome> {
        Ok(self.outcomes.start_tracking(recommendation, action)?)
    }

    /// Record a follow-up measurement
    ///
    /// # Errors
    /// Fails for unknown or already measured outcomes.
    pub fn update_outcome(&self, id: OutcomeId, achieved: Vec<MetricValue>) -> Result<Outcome> {
        Ok(self.outcomes.update_outcome(id, achieved)?)
    }

    /// Use `source` for follow-up measurements
    pub fn set_metric_source(&self, source: Arc<dyn MetricSource>) {
        self.outcomes.set_metric_source(source);
    }

    /// Open alerts matching `filter`, most severe first
    #[must_use]
    pub fn get_active_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts.query(filter)
    }

    /// Acknowledge an alert
    ///
    /// # Errors
    /// Fails for unknown alerts and illegal transitions.
    pub fn acknowledge_alert(&self, id: AlertId) -> Result<Alert> {
        Ok(self.alerts.acknowledge(id)?)
    }

    /// Resolve an alert
    ///
    /// # Errors
    /// Fails for unknown alerts and illegal transitions.
    pub fn resolve_alert(&self, id: AlertId) -> Result<Alert> {
        Ok(self.alerts.resolve(id)?)
    }

    /// Dismiss an alert
    ///
    /// # Errors
    /// Fails for unknown alerts and illegal transitions.
    pub fn dismiss_alert(&self, id: AlertId) -> Result<Alert> {
        Ok(self.alerts.dismiss(id)?)
    }

    /// Actions still waiting or executing, soonest first
    #[must_use]
    pub fn get_pending_items(&self) -> Vec<GestationItem> {
        self.scheduler.pending_items()
    }

    /// Aggregate outcome statistics
    #[must_use]
    pub fn get_outcome_stats(&self, filter: &OutcomeFilter) -> OutcomeStats {
        self.outcomes.stats(filter)
    }

    /// Run one full evaluation cycle
    ///
    /// Analyzes, detects, synthesizes and classifies, then queues every
    /// primary recommendation whose tier allows deferred execution.
    /// Assisted actions are reported for operator approval. Alternatives
    /// are generated and stored but never classified automatically.
    ///
    /// Only newly raised alerts are synthesized. An alert that was already
    /// open keeps the recommendations and actions of the cycle that raised
    /// it; call [`Self::generate_recommendations`] to draft fresh ones.
    pub async fn run_cycle(
        &self,
        context: &OperationalContext,
        analyzers: &[Arc<dyn AnalysisContract>],
    ) -> CycleReport {
        let analyses = self.run_analyses(context, analyzers).await;
        tracing::debug!(warehouse = %context.warehouse_id, "detecting alerts");
        let upserts = self.detector.scan(collect_issues(&analyses));

        let mut alerts = Vec::with_capacity(upserts.len());
        let mut raised = Vec::new();
        let mut refreshed = Vec::new();
        for upsert in upserts {
            if upsert.is_new() {
                raised.push(upsert.alert().clone());
            } else {
                refreshed.push(upsert.alert().id);
            }
            alerts.push(upsert.into_alert());
        }

        let mut recommendations = Vec::new();
        let mut actions = Vec::new();
        let mut queued = Vec::new();
        let mut awaiting_approval = Vec::new();

        for alert in &raised {
            let generated = self.generate_recommendations(alert, context);
            for primary in generated.iter().filter(|r| r.is_primary()) {
                let action = self.classify_action(primary, context);
                match action.gestation_period() {
                    Some(period) => match self.scheduler.queue(action.clone(), period) {
                        Ok(item) => queued.push(item.id()),
                        Err(e) => {
                            tracing::warn!(action = %action.id, error = %e, "action not queued");
                        }
                    },
                    None => awaiting_approval.push(action.id),
                }
                actions.push(action);
            }
            recommendations.extend(generated);
        }

        tracing::info!(
            warehouse = %context.warehouse_id,
            alerts = alerts.len(),
            refreshed = refreshed.len(),
            recommendations = recommendations.len(),
            queued = queued.len(),
            awaiting_approval = awaiting_approval.len(),
            "cycle complete"
        );

        CycleReport {
            analyses,
            alerts,
            refreshed,
            recommendations,
            actions,
            queued,
            awaiting_approval,
        }
    }

    /// Drop all state and cancel every timer
    pub fn clear(&self) {
        self.scheduler.clear();
        self.outcomes.clear();
        self.recommendations.clear();
        self.alerts.clear();
    }
}
