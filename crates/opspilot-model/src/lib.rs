//! OpsPilot Model - typed records for the operations decision pipeline
//!
//! Every stage of the pipeline exchanges the records defined here:
//! - [`Issue`] produced by specialist analyzers
//! - [`Alert`] produced by detection
//! - [`Recommendation`] and its typed [`Action`]s produced by synthesis
//! - [`ClassifiedAction`] produced by autonomy classification and owned by
//!   the gestation scheduler
//! - [`Outcome`] produced by outcome tracking
//!
//! Identifiers are ULIDs wrapped in per-record newtypes so that an alert id
//! can never be passed where an action id is expected.

#![warn(unreachable_pub)]

pub mod action;
pub mod alert;
pub mod context;
pub mod error;
pub mod ids;
pub mod issue;
pub mod outcome;
pub mod recommendation;

pub use action::{ActionStatus, Classification, ClassifiedAction, ExecutionResult, Tier};
pub use alert::{Alert, AlertImpact, AlertStatus, Explainability, FactorContribution, ImpactScope};
pub use context::OperationalContext;
pub use error::ModelError;
pub use ids::{ActionId, AlertId, IssueId, OutcomeId, RecommendationId};
pub use issue::{Category, DataFactor, Issue, IssueSignature, Severity};
pub use outcome::{AchievedImpact, MetricValue, Outcome, OutcomeStatus, PromisedImpact};
pub use recommendation::{
    Action, ActionKind, CameraParams, DispatchParams, ImpactMetric, NotifyParams, Priority,
    ReallocateParams, Recommendation, RecommendationImpact,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with pipeline records
    pub use crate::{
        Action, ActionId, ActionKind, Alert, AlertId, Category, ClassifiedAction, Issue,
        OperationalContext, Outcome, Priority, Recommendation, RecommendationId, Severity, Tier,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
