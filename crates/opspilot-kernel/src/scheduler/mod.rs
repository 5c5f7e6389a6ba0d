//! Gestation Scheduler
//!
//! Every queued action gets its own countdown task. When the countdown fires
//! the action is re-validated and handed to an executor; until then an
//! operator may object, which cancels the countdown.
//!
//! # Race freedom
//!
//! Each item lives in a [`DashMap`] slot. Both the countdown and an objection
//! move the item out of `Pending` while holding that slot's lock, so exactly
//! one of them wins. The countdown re-reads the status under the lock, which
//! makes aborting its task an optimization rather than a correctness
//! requirement.

use crate::config::GestationConfig;
use crate::error::SchedulerError;
use crate::executor::{ActionExecutor, DefaultDispatcher};
use crate::state_machine::validate_transition;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use opspilot_model::{ActionId, ActionStatus, ClassifiedAction, ExecutionResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback invoked with every item that reaches a terminal status
pub type CompletionCallback = Arc<dyn Fn(&GestationItem) + Send + Sync>;

/// Operator objection recorded on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objection {
    /// Operator-supplied reason
    pub reason: String,
    /// When the objection was received
    pub objected_at: DateTime<Utc>,
}

/// A classified action waiting out its objection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestationItem {
    /// The action, including its current status
    pub action: ClassifiedAction,
    /// When the countdown fires
    pub execute_at: DateTime<Utc>,
    /// Length of the objection window
    pub gestation_period_ms: u64,
    /// Objection, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objection: Option<Objection>,
    /// When the item reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl GestationItem {
    /// Action id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.action.id
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> ActionStatus {
        self.action.status
    }

    fn transition(&mut self, to: ActionStatus) -> Result<(), SchedulerError> {
        validate_transition(self.action.status, to)
            .map_err(|e| SchedulerError::from_state(self.action.id, e))?;
        self.action.status = to;
        if to.is_terminal() {
            self.finalized_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Decides at firing time whether an action may still run
///
/// Returning `false` expires the item without executing it.
pub trait ValidityCheck: Send + Sync {
    /// Check the action against current conditions
    fn is_valid(&self, action: &ClassifiedAction, now: DateTime<Utc>) -> bool;
}

/// Rejects actions whose recommendation has expired
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryCheck;

impl ValidityCheck for ExpiryCheck {
    fn is_valid(&self, action: &ClassifiedAction, now: DateTime<Utc>) -> bool {
        !action.recommendation.is_expired_at(now)
    }
}

struct Slot {
    item: GestationItem,
    countdown: Option<JoinHandle<()>>,
}

struct Shared {
    config: GestationConfig,
    slots: DashMap<ActionId, Slot>,
    executors: DashMap<ActionId, Arc<dyn ActionExecutor>>,
    fallback: Arc<dyn ActionExecutor>,
    validity: Arc<dyn ValidityCheck>,
    callbacks: RwLock<Vec<CompletionCallback>>,
}

/// Queue of gestating actions with per-item countdowns
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct GestationScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for GestationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestationScheduler")
            .field("config", &self.shared.config)
            .field("items", &self.shared.slots.len())
            .finish_non_exhaustive()
    }
}

impl GestationScheduler {
    /// Create a scheduler using [`DefaultDispatcher`] and [`ExpiryCheck`]
    #[must_use]
    pub fn new(config: GestationConfig) -> Self {
        Self::with_parts(config, Arc::new(DefaultDispatcher), Arc::new(ExpiryCheck))
    }

    /// Create with a custom fallback executor and validity check
    #[must_use]
    pub fn with_parts(
        config: GestationConfig,
        fallback: Arc<dyn ActionExecutor>,
        validity: Arc<dyn ValidityCheck>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                slots: DashMap::new(),
                executors: DashMap::new(),
                fallback,
                validity,
                callbacks: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Queue an action and arm its countdown
    ///
    /// Returns immediately; the action executes after `period` unless an
    /// operator objects first.
    ///
    /// # Errors
    /// - `SchedulerError::ApprovalRequired` for assisted actions
    /// - `SchedulerError::AlreadyQueued` if the id is already in the queue
    /// - `SchedulerError::InvalidTransition` if the action is not pending
    pub fn queue(
        &self,
        action: ClassifiedAction,
        period: Duration,
    ) -> Result<GestationItem, SchedulerError> {
        if !action.tier.allows_gestation() {
            return Err(SchedulerError::ApprovalRequired(action.id));
        }
        self.arm(action, period)
    }

    /// Queue an operator-approved action for immediate execution
    ///
    /// This is the only way an assisted action reaches execution.
    pub fn approve(&self, mut action: ClassifiedAction) -> Result<GestationItem, SchedulerError> {
        action.gestation_period_ms = Some(0);
        tracing::info!(action = %action.id, tier = %action.tier, "action approved by operator");
        self.arm(action, Duration::ZERO)
    }

    fn arm(
        &self,
        mut action: ClassifiedAction,
        period: Duration,
    ) -> Result<GestationItem, SchedulerError> {
        let id = action.id;
        if action.status != ActionStatus::Pending {
            return Err(SchedulerError::InvalidTransition {
                id,
                from: action.status,
                to: ActionStatus::Pending,
            });
        }

        let now = Utc::now();
        action.queued_at = now;
        let item = GestationItem {
            execute_at: chrono::Duration::from_std(period)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            gestation_period_ms: u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            action,
            objection: None,
            finalized_at: None,
        };

        match self.shared.slots.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(SchedulerError::AlreadyQueued(id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Slot {
                    item: item.clone(),
                    countdown: None,
                });
            }
        }

        let shared = Arc::clone(&self.shared);
        let countdown = tokio::spawn(async move {
            tokio::time::sleep(period).await;
            Shared::fire(&shared, id).await;
        });

        // The countdown may already have finalized the item; storing a
        // finished handle is harmless.
        if let Some(mut slot) = self.shared.slots.get_mut(&id) {
            slot.countdown = Some(countdown);
        }

        tracing::info!(
            action = %id,
            tier = %item.action.tier,
            gestation_ms = item.gestation_period_ms,
            execute_at = %item.execute_at,
            "action queued"
        );
        Ok(item)
    }

    /// Cancel a pending action
    ///
    /// # Errors
    /// Returns an invalid-transition error for unknown items and for items
    /// that are no longer pending (including double objections).
    pub fn object_to_action(
        &self,
        id: ActionId,
        reason: impl Into<String>,
    ) -> Result<GestationItem, SchedulerError> {
        let reason = reason.into();
        let snapshot = {
            let mut slot = self
                .shared
                .slots
                .get_mut(&id)
                .ok_or(SchedulerError::UnknownItem(id))?;
            slot.item.transition(ActionStatus::Objected)?;
            if let Some(countdown) = slot.countdown.take() {
                countdown.abort();
            }
            slot.item.objection = Some(Objection {
                reason: reason.clone(),
                objected_at: Utc::now(),
            });
            slot.item.clone()
        };

        tracing::info!(action = %id, %reason, "operator objected; execution cancelled");
        self.shared.finalize(&snapshot);
        Ok(snapshot)
    }

    /// Register an executor for one action id
    pub fn register_executor(&self, id: ActionId, executor: Arc<dyn ActionExecutor>) {
        self.shared.executors.insert(id, executor);
    }

    /// Register a callback invoked on every terminal transition
    pub fn on_completion(&self, callback: CompletionCallback) {
        self.shared.callbacks.write().push(callback);
    }

    /// Snapshot of one item
    #[must_use]
    pub fn get_item(&self, id: ActionId) -> Option<GestationItem> {
        self.shared.slots.get(&id).map(|slot| slot.item.clone())
    }

    /// Items still pending or executing, soonest first
    #[must_use]
    pub fn pending_items(&self) -> Vec<GestationItem> {
        let mut items: Vec<GestationItem> = self
            .shared
            .slots
            .iter()
            .filter(|slot| !slot.item.status().is_terminal())
            .map(|slot| slot.item.clone())
            .collect();
        items.sort_by_key(|item| (item.execute_at, item.id()));
        items
    }

    /// Every retained item, including finalized ones
    #[must_use]
    pub fn items(&self) -> Vec<GestationItem> {
        let mut items: Vec<GestationItem> =
            self.shared.slots.iter().map(|slot| slot.item.clone()).collect();
        items.sort_by_key(GestationItem::id);
        items
    }

    /// Number of retained items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.slots.len()
    }

    /// Check if the queue is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.slots.is_empty()
    }

    /// Cancel every countdown and drop all items
    pub fn clear(&self) {
        for mut slot in self.shared.slots.iter_mut() {
            if let Some(countdown) = slot.countdown.take() {
                countdown.abort();
            }
        }
        self.shared.slots.clear();
        self.shared.executors.clear();
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestationConfig {
        &self.shared.config
    }
}

impl Shared {
    async fn fire(shared: &Arc<Shared>, id: ActionId) {
        let action = {
            let Some(mut slot) = shared.slots.get_mut(&id) else {
                return;
            };
            slot.countdown = None;

            if slot.item.status() != ActionStatus::Pending {
                tracing::debug!(
                    action = %id,
                    status = %slot.item.status(),
                    "countdown fired on settled item; skipping"
                );
                return;
            }

            if !shared.validity.is_valid(&slot.item.action, Utc::now()) {
                if slot.item.transition(ActionStatus::Expired).is_err() {
                    return;
                }
                let snapshot = slot.item.clone();
                drop(slot);
                tracing::warn!(action = %id, "action no longer valid at execution time; expired");
                shared.finalize(&snapshot);
                return;
            }

            if slot.item.transition(ActionStatus::Executing).is_err() {
                return;
            }
            slot.item.action.clone()
        };

        let executor = shared
            .executors
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .unwrap_or_else(|| Arc::clone(&shared.fallback));

        let result = Self::run_executor(executor, action).await;
        if result.success {
            tracing::info!(action = %id, message = %result.message, "action executed");
        } else {
            tracing::warn!(action = %id, error = ?result.error, "action execution failed");
        }

        let snapshot = {
            let Some(mut slot) = shared.slots.get_mut(&id) else {
                // Cleared while executing
                return;
            };
            slot.item.action.execution_result = Some(result);
            if slot.item.transition(ActionStatus::Completed).is_err() {
                return;
            }
            slot.item.clone()
        };
        shared.finalize(&snapshot);
    }

    /// Run the executor on its own task so a panic is contained
    async fn run_executor(
        executor: Arc<dyn ActionExecutor>,
        action: ClassifiedAction,
    ) -> ExecutionResult {
        let task = tokio::spawn(async move { executor.execute(&action).await });
        match task.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ExecutionResult::failure("Action execution failed", e.to_string()),
            Err(join_error) => {
                tracing::error!(error = %join_error, "action executor aborted");
                ExecutionResult::failure("Action executor aborted", join_error.to_string())
            }
        }
    }

    fn finalize(self: &Arc<Self>, item: &GestationItem) {
        let id = item.id();
        self.executors.remove(&id);

        let callbacks: Vec<CompletionCallback> = self.callbacks.read().clone();
        for callback in callbacks {
            callback(item);
        }

        let shared = Arc::clone(self);
        let retention = self.config.retention();
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if shared
                .slots
                .remove_if(&id, |_, slot| slot.item.status().is_terminal())
                .is_some()
            {
                tracing::debug!(action = %id, "finalized item purged");
            }
        });
    }
}
