//! Pipeline configuration
//!
//! One TOML document configures every stage. Missing sections and fields
//! fall back to the defaults below.
//!
//! ```toml
//! max_issues_per_analyzer = 50
//!
//! [synthesis]
//! alternative_confidence_factor = 0.8
//!
//! [autonomy]
//! confidence_high = 0.85
//!
//! [gestation]
//! retention_ms = 600000
//! ```

use crate::error::ConfigError;
use opspilot_kernel::{AutonomyConfig, GestationConfig};
use opspilot_model::{Category, ImpactMetric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One value per category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    /// Safety
    pub safety: T,
    /// Maintenance
    pub maintenance: T,
    /// Inventory
    pub inventory: T,
    /// Slotting
    pub slotting: T,
    /// Labor
    pub labor: T,
    /// Anything else
    pub general: T,
}

impl<T: Copy> PerCategory<T> {
    /// Value for a category
    #[inline]
    #[must_use]
    pub fn get(&self, category: Category) -> T {
        match category {
            Category::Safety => self.safety,
            Category::Maintenance => self.maintenance,
            Category::Inventory => self.inventory,
            Category::Slotting => self.slotting,
            Category::Labor => self.labor,
            Category::General => self.general,
        }
    }

    /// Iterate category/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (Category, T)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

/// Alert detection configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Impact magnitude multiplier per category
    pub category_weights: PerCategory<f64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            category_weights: PerCategory {
                safety: 1.5,
                maintenance: 1.2,
                inventory: 1.0,
                slotting: 0.8,
                labor: 1.1,
                general: 1.0,
            },
        }
    }
}

/// Recommendation synthesis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Confidence multiplier applied to each successive alternative
    pub alternative_confidence_factor: f64,
    /// Alternatives generated per primary recommendation (0 to 2)
    pub max_alternatives: usize,
    /// Minutes until a safety recommendation expires
    pub safety_expiry_minutes: u32,
    /// Where low-battery robots are sent
    pub charging_destination: String,
    /// Where faulty equipment is sent
    pub maintenance_destination: String,
    /// Confidence multiplier per category
    pub dampening: PerCategory<f64>,
    /// Replacement metric tables keyed by template, e.g. `maintenance.battery`
    pub metric_overrides: BTreeMap<String, Vec<ImpactMetric>>,
}

impl SynthesisConfig {
    /// With replacement metrics for one template
    #[must_use]
    pub fn with_metrics(mut self, template: impl Into<String>, metrics: Vec<ImpactMetric>) -> Self {
        self.metric_overrides.insert(template.into(), metrics);
        self
    }

    /// With number of alternatives per primary
    #[inline]
    #[must_use]
    pub fn with_max_alternatives(mut self, count: usize) -> Self {
        self.max_alternatives = count;
        self
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            alternative_confidence_factor: 0.8,
            max_alternatives: 1,
            safety_expiry_minutes: 5,
            charging_destination: "charging-station".into(),
            maintenance_destination: "maintenance-bay".into(),
            dampening: PerCategory {
                safety: 1.0,
                maintenance: 0.9,
                inventory: 0.85,
                slotting: 0.8,
                labor: 0.85,
                general: 0.7,
            },
            metric_overrides: BTreeMap::new(),
        }
    }
}

/// Outcome tracking configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Accuracy at or above which an outcome counts as a success
    pub success_threshold: f64,
    /// Shortest follow-up delay in minutes
    pub min_timeframe_minutes: u32,
    /// Follow-up delay per category, in minutes
    pub timeframes: PerCategory<u32>,
    /// How long measured outcomes stay in the statistics, in minutes
    ///
    /// `None` keeps every outcome until [`crate::OutcomeTracker::clear`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_minutes: Option<u32>,
}

impl OutcomeConfig {
    /// With retention window for measured outcomes
    #[inline]
    #[must_use]
    pub fn with_retention_minutes(mut self, minutes: u32) -> Self {
        self.retention_minutes = Some(minutes);
        self
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            success_threshold: 0.7,
            min_timeframe_minutes: 5,
            timeframes: PerCategory {
                safety: 5,
                maintenance: 30,
                inventory: 60,
                slotting: 120,
                labor: 45,
                general: 30,
            },
            retention_minutes: None,
        }
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Issues kept per analyzer result, highest confidence first
    pub max_issues_per_analyzer: usize,
    /// Alert detection
    pub detection: DetectionConfig,
    /// Recommendation synthesis
    pub synthesis: SynthesisConfig,
    /// Autonomy classification
    pub autonomy: AutonomyConfig,
    /// Gestation scheduling
    pub gestation: GestationConfig,
    /// Outcome tracking
    pub outcome: OutcomeConfig,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With autonomy configuration
    #[inline]
    #[must_use]
    pub fn with_autonomy(mut self, autonomy: AutonomyConfig) -> Self {
        self.autonomy = autonomy;
        self
    }

    /// With gestation configuration
    #[inline]
    #[must_use]
    pub fn with_gestation(mut self, gestation: GestationConfig) -> Self {
        self.gestation = gestation;
        self
    }

    /// With synthesis configuration
    #[inline]
    #[must_use]
    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// With outcome configuration
    #[inline]
    #[must_use]
    pub fn with_outcome(mut self, outcome: OutcomeConfig) -> Self {
        self.outcome = outcome;
        self
    }

    /// With per-analyzer issue cap
    #[inline]
    #[must_use]
    pub fn with_max_issues(mut self, max: usize) -> Self {
        self.max_issues_per_analyzer = max;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.autonomy.validate()?;

        if self.max_issues_per_analyzer == 0 {
            return invalid("max_issues_per_analyzer", "must be at least 1".into());
        }
        if self.synthesis.max_alternatives > 2 {
            return invalid(
                "synthesis.max_alternatives",
                format!("at most 2 alternatives, got {}", self.synthesis.max_alternatives),
            );
        }
        if !unit_interval(self.synthesis.alternative_confidence_factor) {
            return invalid(
                "synthesis.alternative_confidence_factor",
                format!("must lie in [0, 1], got {}", self.synthesis.alternative_confidence_factor),
            );
        }
        if let Some((category, value)) = self
            .synthesis
            .dampening
            .iter()
            .find(|(_, v)| !unit_interval(*v))
        {
            return invalid(
                "synthesis.dampening",
                format!("{category} dampening must lie in [0, 1], got {value}"),
            );
        }
        if let Some((category, value)) = self
            .detection
            .category_weights
            .iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return invalid(
                "detection.category_weights",
                format!("{category} weight must be non-negative, got {value}"),
            );
        }
        if !unit_interval(self.outcome.success_threshold) {
            return invalid(
                "outcome.success_threshold",
                format!("must lie in [0, 1], got {}", self.outcome.success_threshold),
            );
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_issues_per_analyzer: 50,
            detection: DetectionConfig::default(),
            synthesis: SynthesisConfig::default(),
            autonomy: AutonomyConfig::default(),
            gestation: GestationConfig::default(),
            outcome: OutcomeConfig::default(),
        }
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn invalid(field: &'static str, reason: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid { field, reason })
}
