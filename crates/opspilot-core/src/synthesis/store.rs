//! Recommendation store

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use opspilot_model::{AlertId, Recommendation, RecommendationId};

/// In-memory recommendation store indexed by alert
#[derive(Debug, Default)]
pub struct RecommendationStore {
    recommendations: DashMap<RecommendationId, Recommendation>,
    by_alert: DashMap<AlertId, Vec<RecommendationId>>,
}

impl RecommendationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store recommendations, keeping their order under each alert
    pub fn insert_all(&self, recommendations: &[Recommendation]) {
        for rec in recommendations {
            self.recommendations.insert(rec.id, rec.clone());
            self.by_alert.entry(rec.alert_id).or_default().push(rec.id);
        }
    }

    /// Get a recommendation by id
    #[must_use]
    pub fn get(&self, id: RecommendationId) -> Option<Recommendation> {
        self.recommendations.get(&id).map(|r| r.clone())
    }

    /// Recommendations answering an alert, in generation order
    #[must_use]
    pub fn for_alert(&self, alert: AlertId) -> Vec<Recommendation> {
        let ids = self
            .by_alert
            .get(&alert)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Remove recommendations expired at `now`; returns how many
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<(RecommendationId, AlertId)> = self
            .recommendations
            .iter()
            .filter(|r| r.is_expired_at(now))
            .map(|r| (r.id, r.alert_id))
            .collect();

        for (id, alert) in &expired {
            self.recommendations.remove(id);
            if let Some(mut ids) = self.by_alert.get_mut(alert) {
                ids.retain(|kept| kept != id);
            }
            self.by_alert.remove_if(alert, |_, ids| ids.is_empty());
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "expired recommendations purged");
        }
        expired.len()
    }

    /// Number of stored recommendations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    /// Drop every recommendation
    pub fn clear(&self) {
        self.by_alert.clear();
        self.recommendations.clear();
    }
}
