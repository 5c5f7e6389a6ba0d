//! OpsPilot Core - the warehouse operations decision pipeline
//!
//! Turns specialist analyzer output into executed, measured interventions:
//! 1. **Analysis**: every [`AnalysisContract`] runs concurrently per cycle
//! 2. **Detection**: [`AlertDetector`] deduplicates and scores issues
//! 3. **Synthesis**: [`RecommendationSynthesizer`] proposes interventions
//! 4. **Classification and gestation**: provided by `opspilot-kernel`
//! 5. **Outcomes**: [`OutcomeTracker`] scores promised against achieved impact
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use opspilot_core::prelude::*;
//!
//! let pipeline = OpsPipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run_cycle(&context, &analyzers).await;
//! for id in &report.awaiting_approval {
//!     println!("needs approval: {id}");
//! }
//! ```

#![warn(unreachable_pub)]

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod synthesis;

// Re-exports
pub use analysis::{
    run_analyses, AnalysisContract, AnalysisResult, AnalyzerReport, RecordedAnalyzer,
};
pub use config::{DetectionConfig, OutcomeConfig, PerCategory, PipelineConfig, SynthesisConfig};
pub use detection::{AlertDetector, AlertFilter, AlertStore, Upsert};
pub use error::{AlertError, AnalysisError, ConfigError, OutcomeError, PipelineError, Result};
pub use outcome::{accuracy, MetricSource, OutcomeFilter, OutcomeStats, OutcomeTracker};
pub use pipeline::{CycleReport, OpsPipeline};
pub use synthesis::{RecommendationStore, RecommendationSynthesizer};

/// Common imports for running the pipeline
pub mod prelude {
    pub use crate::analysis::{AnalysisContract, AnalysisResult};
    pub use crate::config::PipelineConfig;
    pub use crate::detection::AlertFilter;
    pub use crate::error::{PipelineError, Result};
    pub use crate::outcome::{MetricSource, OutcomeFilter};
    pub use crate::pipeline::{CycleReport, OpsPipeline};
    pub use opspilot_model::{Category, Issue, OperationalContext, Severity};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
