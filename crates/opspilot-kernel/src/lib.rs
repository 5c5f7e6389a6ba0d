//! OpsPilot Kernel - autonomy decisions and deferred execution
//!
//! Two stages of the pipeline live here:
//! 1. **Classification**: [`AutonomyClassifier`] scores a recommendation and
//!    assigns an autonomy [`Tier`](opspilot_model::Tier) plus a gestation period
//! 2. **Gestation**: [`GestationScheduler`] holds each classified action for
//!    its objection window, then executes it through an [`ActionExecutor`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use opspilot_kernel::prelude::*;
//!
//! let classifier = AutonomyClassifier::new(AutonomyConfig::default());
//! let action = classifier.classify(&recommendation);
//!
//! let scheduler = GestationScheduler::new(GestationConfig::default());
//! if let Some(period) = action.gestation_period() {
//!     scheduler.queue(action, period)?;
//! }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod autonomy;
pub mod config;
pub mod error;
pub mod executor;
pub mod scheduler;
pub mod state_machine;

// Re-exports
pub use autonomy::{AutonomyClassifier, ImpactBreakdown};
pub use config::{AutonomyConfig, GestationConfig, GestationTable, ImpactWeights};
pub use error::{ConfigError, ExecutorError, SchedulerError, StateMachineError};
pub use executor::{ActionExecutor, DefaultDispatcher};
pub use scheduler::{
    CompletionCallback, ExpiryCheck, GestationItem, GestationScheduler, Objection, ValidityCheck,
};

/// Common imports for classification and scheduling
pub mod prelude {
    pub use crate::autonomy::AutonomyClassifier;
    pub use crate::config::{AutonomyConfig, GestationConfig};
    pub use crate::error::{ExecutorError, SchedulerError};
    pub use crate::executor::ActionExecutor;
    pub use crate::scheduler::{GestationItem, GestationScheduler};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
