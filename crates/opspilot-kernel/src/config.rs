//! Classifier and scheduler configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weights of the four impact sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactWeights {
    /// Number of affected entities
    pub entity: f64,
    /// Priority-derived criticality
    pub criticality: f64,
    /// Difficulty of undoing the actions
    pub reversibility: f64,
    /// Financial effect
    pub cost: f64,
}

impl ImpactWeights {
    /// Sum of all weights
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entity + self.criticality + self.reversibility + self.cost
    }
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            entity: 0.3,
            criticality: 0.3,
            reversibility: 0.2,
            cost: 0.2,
        }
    }
}

/// Base objection windows per tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestationTable {
    /// Automated tier window in milliseconds
    pub automated_ms: u64,
    /// Semi-automated tier window in milliseconds
    pub semi_automated_ms: u64,
}

impl Default for GestationTable {
    fn default() -> Self {
        Self {
            automated_ms: 10_000,
            semi_automated_ms: 45_000,
        }
    }
}

/// Autonomy classifier configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Confidence at or above which a recommendation is highly trusted
    pub confidence_high: f64,
    /// Confidence at or above which a recommendation is moderately trusted
    pub confidence_medium: f64,
    /// Impact at or above which an action is high impact
    pub impact_high: f64,
    /// Impact at or above which an action is medium impact
    pub impact_medium: f64,
    /// Criticality multiplier for safety recommendations
    pub safety_criticality_boost: f64,
    /// Cost sub-score when no cost metric is projected
    pub default_cost_score: f64,
    /// Semi-automated actions above this impact get a longer window
    pub extended_gestation_impact: f64,
    /// Multiplier applied to the extended window
    pub extended_gestation_factor: f64,
    /// Sub-score weights
    pub weights: ImpactWeights,
    /// Base objection windows
    pub gestation: GestationTable,
}

impl AutonomyConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With confidence thresholds
    #[inline]
    #[must_use]
    pub fn with_confidence_thresholds(mut self, medium: f64, high: f64) -> Self {
        self.confidence_medium = medium;
        self.confidence_high = high;
        self
    }

    /// With impact thresholds
    #[inline]
    #[must_use]
    pub fn with_impact_thresholds(mut self, medium: f64, high: f64) -> Self {
        self.impact_medium = medium;
        self.impact_high = high;
        self
    }

    /// With base gestation windows
    #[inline]
    #[must_use]
    pub fn with_gestation(mut self, gestation: GestationTable) -> Self {
        self.gestation = gestation;
        self
    }

    /// Check thresholds are ordered and weights sum to one
    ///
    /// Every numeric field must be finite; NaN never passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pair("confidence", self.confidence_medium, self.confidence_high)?;
        check_pair("impact", self.impact_medium, self.impact_high)?;

        for (field, weight) in [
            ("weights.entity", self.weights.entity),
            ("weights.criticality", self.weights.criticality),
            ("weights.reversibility", self.weights.reversibility),
            ("weights.cost", self.weights.cost),
        ] {
            check_range(field, weight, 0.0, Some(1.0))?;
        }
        let total = self.weights.total();
        if !((total - 1.0).abs() <= 1e-6) {
            return Err(ConfigError::WeightSum(total));
        }

        check_range(
            "default_cost_score",
            self.default_cost_score,
            0.0,
            Some(1.0),
        )?;
        check_range(
            "extended_gestation_impact",
            self.extended_gestation_impact,
            0.0,
            Some(1.0),
        )?;
        check_range(
            "safety_criticality_boost",
            self.safety_criticality_boost,
            0.0,
            None,
        )?;
        check_range(
            "extended_gestation_factor",
            self.extended_gestation_factor,
            1.0,
            None,
        )
    }
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            confidence_high: 0.8,
            confidence_medium: 0.5,
            impact_high: 0.7,
            impact_medium: 0.4,
            safety_criticality_boost: 1.5,
            default_cost_score: 0.3,
            extended_gestation_impact: 0.6,
            extended_gestation_factor: 1.5,
            weights: ImpactWeights::default(),
            gestation: GestationTable::default(),
        }
    }
}

fn check_pair(name: &'static str, medium: f64, high: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&medium) && (0.0..=1.0).contains(&high) && medium < high {
        Ok(())
    } else {
        Err(ConfigError::Thresholds { name, medium, high })
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: Option<f64>,
) -> Result<(), ConfigError> {
    let within = value.is_finite() && value >= min && max.map_or(true, |max| value <= max);
    if within {
        return Ok(());
    }
    let reason = match max {
        Some(max) => format!("must lie within [{min}, {max}], got {value}"),
        None => format!("must be a finite number of at least {min}, got {value}"),
    };
    Err(ConfigError::Invalid { field, reason })
}

/// Gestation scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestationConfig {
    /// How long finalized items stay queryable, in milliseconds
    pub retention_ms: u64,
}

impl GestationConfig {
    /// Retention window as a duration
    #[inline]
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// With retention window
    #[inline]
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention_ms = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for GestationConfig {
    fn default() -> Self {
        Self {
            retention_ms: 60 * 60 * 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AutonomyConfig::default().validate().is_ok());
        assert_eq!(GestationConfig::default().retention(), Duration::from_secs(3600));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = AutonomyConfig::new().with_confidence_thresholds(0.9, 0.6);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Thresholds { name: "confidence", .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = AutonomyConfig::new();
        config.extended_gestation_factor = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "extended_gestation_factor", .. })
        ));

        config.extended_gestation_factor = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = AutonomyConfig::new();
        config.weights.entity = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "weights.entity", .. })
        ));

        let mut config = AutonomyConfig::new();
        config.safety_criticality_boost = f64::NAN;
        assert!(config.validate().is_err());

        let config = AutonomyConfig::new().with_confidence_thresholds(f64::NAN, 0.8);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Thresholds { name: "confidence", .. })
        ));
    }

    #[test]
    fn shrinking_factor_is_rejected() {
        let mut config = AutonomyConfig::new();
        config.extended_gestation_factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = AutonomyConfig::new();
        config.weights.cost = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::WeightSum(_))));
    }
}
