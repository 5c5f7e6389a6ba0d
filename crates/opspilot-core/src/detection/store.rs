//! Active alert store

use crate::error::AlertError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use opspilot_model::{Alert, AlertId, AlertStatus, Category, IssueSignature, Severity};

/// Query over stored alerts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    /// Only this severity
    pub severity: Option<Severity>,
    /// Only this category
    pub category: Option<Category>,
    /// Only alerts at or above this confidence
    pub min_confidence: Option<f64>,
    /// Include resolved and dismissed alerts
    pub include_closed: bool,
}

impl AlertFilter {
    /// Match every open alert
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// With category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// With minimum confidence
    #[inline]
    #[must_use]
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    /// Include closed alerts
    #[inline]
    #[must_use]
    pub fn including_closed(mut self) -> Self {
        self.include_closed = true;
        self
    }

    fn matches(&self, alert: &Alert) -> bool {
        (self.include_closed || alert.is_open())
            && self.severity.map_or(true, |s| alert.severity == s)
            && self.category.map_or(true, |c| alert.category == c)
            && self.min_confidence.map_or(true, |m| alert.confidence >= m)
    }
}

/// Where an upserted alert landed
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// No open alert had this signature
    Raised(Alert),
    /// An open alert was updated in place
    Refreshed(Alert),
}

impl Upsert {
    /// The stored alert
    #[inline]
    #[must_use]
    pub fn alert(&self) -> &Alert {
        match self {
            Upsert::Raised(alert) | Upsert::Refreshed(alert) => alert,
        }
    }

    /// Take the stored alert
    #[inline]
    #[must_use]
    pub fn into_alert(self) -> Alert {
        match self {
            Upsert::Raised(alert) | Upsert::Refreshed(alert) => alert,
        }
    }

    /// Check whether a new alert was opened
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Upsert::Raised(_))
    }
}

/// In-memory alert store with a signature index
///
/// At most one open alert exists per issue signature. Resolving or
/// dismissing an alert releases its signature.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: DashMap<AlertId, Alert>,
    open_signatures: DashMap<IssueSignature, AlertId>,
}

impl AlertStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new alert, or refresh the open alert with the same signature
    ///
    /// On refresh, `refresh` receives the stored alert and returns its
    /// replacement. The stored id, first detection time and status are kept
    /// whatever the replacement says.
    pub fn upsert_with<F>(&self, alert: Alert, refresh: F) -> Upsert
    where
        F: FnOnce(&Alert) -> Alert,
    {
        match self.open_signatures.entry(alert.signature.clone()) {
            Entry::Occupied(mut open) => {
                let id = *open.get();
                if let Some(mut existing) = self.alerts.get_mut(&id) {
                    let mut refreshed = refresh(existing.value());
                    refreshed.id = existing.id;
                    refreshed.detected_at = existing.detected_at;
                    refreshed.status = existing.status;
                    refreshed.signature = existing.signature.clone();
                    *existing = refreshed;
                    tracing::debug!(
                        alert = %id,
                        severity = %existing.severity,
                        confidence = existing.confidence,
                        "open alert refreshed"
                    );
                    return Upsert::Refreshed(existing.clone());
                }
                // Index pointed at a cleared alert; replace it
                open.insert(alert.id);
                self.alerts.insert(alert.id, alert.clone());
                Upsert::Raised(alert)
            }
            Entry::Vacant(slot) => {
                slot.insert(alert.id);
                self.alerts.insert(alert.id, alert.clone());
                tracing::info!(
                    alert = %alert.id,
                    severity = %alert.severity,
                    category = %alert.category,
                    "alert raised"
                );
                Upsert::Raised(alert)
            }
        }
    }

    /// Get an alert by id
    #[must_use]
    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.alerts.get(&id).map(|a| a.clone())
    }

    /// Alerts matching `filter`, most severe then most confident first
    #[must_use]
    pub fn query(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| filter.matches(a))
            .map(|a| a.clone())
            .collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.detected_at.cmp(&b.detected_at))
        });
        alerts
    }

    /// Operator has seen the alert
    pub fn acknowledge(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.transition(id, AlertStatus::Acknowledged)
    }

    /// Underlying problem is fixed
    pub fn resolve(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.transition(id, AlertStatus::Resolved)
    }

    /// Alert was not actionable
    pub fn dismiss(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.transition(id, AlertStatus::Dismissed)
    }

    fn transition(&self, id: AlertId, to: AlertStatus) -> Result<Alert, AlertError> {
        let updated = {
            let mut alert = self.alerts.get_mut(&id).ok_or(AlertError::NotFound(id))?;
            if !alert.status.can_transition_to(to) {
                return Err(AlertError::InvalidTransition {
                    id,
                    from: alert.status,
                    to,
                });
            }
            alert.status = to;
            alert.clone()
        };

        if !updated.is_open() {
            self.open_signatures
                .remove_if(&updated.signature, |_, open| *open == id);
        }
        tracing::info!(alert = %id, status = ?to, "alert status changed");
        Ok(updated)
    }

    /// Number of stored alerts, open or closed
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Drop every alert
    pub fn clear(&self) {
        self.open_signatures.clear();
        self.alerts.clear();
    }
}
