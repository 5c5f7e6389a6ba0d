//! Outcome tracking
//!
//! Every executed action gets an [`Outcome`] holding the metric values its
//! recommendation promised. After the promise's timeframe a one-shot
//! follow-up asks the configured [`MetricSource`] for the achieved values
//! and scores them. Without a source the outcome waits for a manual
//! [`OutcomeTracker::update_outcome`].
//!
//! Statistics cover every outcome still held. With a retention window
//! configured, measured outcomes older than the window are swept whenever
//! tracking starts; otherwise they live until [`OutcomeTracker::clear`].

mod stats;

pub use stats::{accuracy, CategoryStats, OutcomeFilter, OutcomeStats};

use crate::config::OutcomeConfig;
use crate::error::OutcomeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use opspilot_model::{
    AchievedImpact, ActionId, ClassifiedAction, MetricValue, Outcome, OutcomeId, OutcomeStatus,
    PromisedImpact, Recommendation,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Supplies achieved metric values for a follow-up measurement
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Measure the metrics named in the outcome's promise
    async fn measure(&self, outcome: &Outcome) -> Result<Vec<MetricValue>, OutcomeError>;
}

struct Inner {
    config: OutcomeConfig,
    outcomes: DashMap<OutcomeId, Outcome>,
    by_action: DashMap<ActionId, OutcomeId>,
    follow_ups: DashMap<OutcomeId, JoinHandle<()>>,
    metric_source: RwLock<Option<Arc<dyn MetricSource>>>,
}

/// Tracks promised against achieved impact
///
/// Cheap to clone; clones share the same records.
#[derive(Clone)]
pub struct OutcomeTracker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OutcomeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeTracker")
            .field("config", &self.inner.config)
            .field("outcomes", &self.inner.outcomes.len())
            .finish_non_exhaustive()
    }
}

impl OutcomeTracker {
    /// Create a tracker without a metric source
    #[must_use]
    pub fn new(config: OutcomeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                outcomes: DashMap::new(),
                by_action: DashMap::new(),
                follow_ups: DashMap::new(),
                metric_source: RwLock::new(None),
            }),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OutcomeConfig {
        &self.inner.config
    }

    /// Use `source` for every follow-up measurement from now on
    pub fn set_metric_source(&self, source: Arc<dyn MetricSource>) {
        *self.inner.metric_source.write() = Some(source);
    }

    /// Start tracking an executed action
    ///
    /// Must be called from within a Tokio runtime; the follow-up runs as a
    /// background task.
    ///
    /// # Errors
    /// - `OutcomeError::NotExecuted` if the action has no execution result
    /// - `OutcomeError::AlreadyTracked` if the action already has an outcome
    pub fn start_tracking(
        &self,
        recommendation: &Recommendation,
        action: &ClassifiedAction,
    ) -> Result<Outcome, OutcomeError> {
        let executed_at = action
            .execution_result
            .as_ref()
            .map(|r| r.executed_at)
            .ok_or(OutcomeError::NotExecuted(action.id))?;

        let now = Utc::now();
        if let Some(minutes) = self.inner.config.retention_minutes {
            self.purge_finalized_before(now - chrono::Duration::minutes(i64::from(minutes)));
        }

        let timeframe_minutes = self.timeframe_minutes(recommendation, now);
        let outcome = Outcome {
            id: OutcomeId::new(),
            recommendation_id: recommendation.id,
            action_id: action.id,
            category: recommendation.category,
            executed_at,
            status: OutcomeStatus::InProgress,
            promised: PromisedImpact {
                metrics: recommendation
                    .impact
                    .metrics
                    .iter()
                    .map(|m| MetricValue::new(m.name.clone(), m.predicted, m.unit.clone()))
                    .collect(),
                timeframe_minutes,
            },
            achieved: AchievedImpact::default(),
            accuracy: 0.0,
            completed_at: None,
        };

        match self.inner.by_action.entry(action.id) {
            Entry::Occupied(_) => return Err(OutcomeError::AlreadyTracked(action.id)),
            Entry::Vacant(slot) => {
                slot.insert(outcome.id);
                self.inner.outcomes.insert(outcome.id, outcome.clone());
            }
        }

        let tracker = self.clone();
        let id = outcome.id;
        let delay = Duration::from_secs(u64::from(timeframe_minutes) * 60);
        let follow_up = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracker.follow_up(id).await;
        });
        self.inner.follow_ups.insert(id, follow_up);

        tracing::info!(
            outcome = %id,
            action = %action.id,
            timeframe_minutes,
            "outcome tracking started"
        );
        Ok(outcome)
    }

    fn timeframe_minutes(&self, recommendation: &Recommendation, now: DateTime<Utc>) -> u32 {
        match recommendation.expires_at {
            Some(expires) => u32::try_from((expires - now).num_minutes())
                .unwrap_or(0)
                .max(self.inner.config.min_timeframe_minutes),
            None => self.inner.config.timeframes.get(recommendation.category),
        }
    }

    async fn follow_up(&self, id: OutcomeId) {
        self.inner.follow_ups.remove(&id);

        let source = self.inner.metric_source.read().clone();
        let Some(source) = source else {
            tracing::info!(outcome = %id, "follow-up due; awaiting manual measurement");
            return;
        };
        let Some(outcome) = self.get(id) else {
            return;
        };
        if outcome.is_finalized() {
            return;
        }

        match source.measure(&outcome).await {
            Ok(metrics) => {
                if let Err(e) = self.update_outcome(id, metrics) {
                    tracing::debug!(
                        outcome = %id,
                        error = %e,
                        "follow-up measurement not recorded"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(outcome = %id, error = %e, "follow-up measurement failed");
            }
        }
    }

    /// Record the achieved metrics and score the outcome
    ///
    /// # Errors
    /// - `OutcomeError::NotFound` for unknown ids
    /// - `OutcomeError::AlreadyFinalized` if a measurement was already recorded
    pub fn update_outcome(
        &self,
        id: OutcomeId,
        achieved: Vec<MetricValue>,
    ) -> Result<Outcome, OutcomeError> {
        let snapshot = {
            let mut outcome = self
                .inner
                .outcomes
                .get_mut(&id)
                .ok_or(OutcomeError::NotFound(id))?;
            if outcome.is_finalized() {
                return Err(OutcomeError::AlreadyFinalized(id));
            }

            let now = Utc::now();
            let score = accuracy(&outcome.promised.metrics, &achieved).unwrap_or(0.0);
            let elapsed = (now - outcome.executed_at).num_minutes().max(0);

            outcome.achieved = AchievedImpact {
                metrics: achieved,
                actual_timeframe_minutes: u32::try_from(elapsed).unwrap_or(u32::MAX),
            };
            outcome.accuracy = score;
            outcome.status = if score >= self.inner.config.success_threshold {
                OutcomeStatus::Completed
            } else {
                OutcomeStatus::Failed
            };
            outcome.completed_at = Some(now);
            outcome.clone()
        };

        if let Some((_, follow_up)) = self.inner.follow_ups.remove(&id) {
            follow_up.abort();
        }
        tracing::info!(
            outcome = %id,
            accuracy = snapshot.accuracy,
            status = ?snapshot.status,
            "outcome measured"
        );
        Ok(snapshot)
    }

    /// Get an outcome by id
    #[must_use]
    pub fn get(&self, id: OutcomeId) -> Option<Outcome> {
        self.inner.outcomes.get(&id).map(|o| o.clone())
    }

    /// Outcome of an executed action
    #[must_use]
    pub fn for_action(&self, action: ActionId) -> Option<Outcome> {
        let id = *self.inner.by_action.get(&action)?;
        self.get(id)
    }

    /// Outcomes matching `filter`, oldest execution first
    #[must_use]
    pub fn outcomes(&self, filter: &OutcomeFilter) -> Vec<Outcome> {
        let mut outcomes: Vec<Outcome> = self
            .inner
            .outcomes
            .iter()
            .filter(|o| filter.matches(o))
            .map(|o| o.clone())
            .collect();
        outcomes.sort_by_key(|o| (o.executed_at, o.id));
        outcomes
    }

    /// Aggregate statistics over outcomes matching `filter`
    #[must_use]
    pub fn stats(&self, filter: &OutcomeFilter) -> OutcomeStats {
        OutcomeStats::from_outcomes(&self.outcomes(filter))
    }

    /// Drop measured outcomes completed before `cutoff`
    ///
    /// Outcomes still in progress are kept. Returns how many were dropped.
    pub fn purge_finalized_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut purged = Vec::new();
        self.inner.outcomes.retain(|_, outcome| {
            let expired = outcome.completed_at.is_some_and(|at| at < cutoff);
            if expired {
                purged.push(outcome.action_id);
            }
            !expired
        });
        for action in &purged {
            self.inner.by_action.remove(action);
        }
        if !purged.is_empty() {
            tracing::debug!(purged = purged.len(), "measured outcomes purged");
        }
        purged.len()
    }

    /// Number of tracked outcomes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.outcomes.len()
    }

    /// Check if nothing is tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.outcomes.is_empty()
    }

    /// Cancel every follow-up and drop all outcomes
    pub fn clear(&self) {
        self.inner.follow_ups.retain(|_, follow_up| {
            follow_up.abort();
            false
        });
        self.inner.by_action.clear();
        self.inner.outcomes.clear();
    }
}
