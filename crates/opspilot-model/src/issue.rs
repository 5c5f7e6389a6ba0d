//! Issues emitted by specialist analyzers

use crate::error::ModelError;
use crate::ids::IssueId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational domain an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Worker or equipment safety hazards
    Safety,
    /// Equipment health: batteries, faults, servicing
    Maintenance,
    /// Stock levels and replenishment
    Inventory,
    /// Product placement in pick locations
    Slotting,
    /// Staffing and workload balance
    Labor,
    /// Anything without a dedicated handler
    General,
}

impl Category {
    /// All categories, in declaration order
    pub const ALL: [Category; 6] = [
        Category::Safety,
        Category::Maintenance,
        Category::Inventory,
        Category::Slotting,
        Category::Labor,
        Category::General,
    ];

    /// Lowercase label used on the wire and in configuration keys
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safety => "safety",
            Category::Maintenance => "maintenance",
            Category::Inventory => "inventory",
            Category::Slotting => "slotting",
            Category::Labor => "labor",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::unknown("category", s))
    }
}

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Needs attention this shift
    Medium,
    /// Needs attention soon
    High,
    /// Needs attention now
    Critical,
}

impl Severity {
    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(ModelError::unknown("severity", s)),
        }
    }
}

/// A measured signal supporting an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFactor {
    /// Signal name, e.g. "battery_level"
    pub name: String,
    /// Observed value
    pub value: f64,
    /// Optional unit of the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl DataFactor {
    /// Create a unitless factor
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: None,
        }
    }

    /// With unit
    #[inline]
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl fmt::Display for DataFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}={}{}", self.name, self.value, unit),
            None => write!(f, "{}={}", self.name, self.value),
        }
    }
}

/// A single operational problem emitted by an analyzer
///
/// Issues are immutable once emitted; detection works on copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Issue identifier
    #[serde(default)]
    pub id: IssueId,
    /// Operational domain
    pub category: Category,
    /// Short title
    pub title: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Severity asserted by the analyzer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Analyzer confidence in [0, 1]
    pub confidence: f64,
    /// Robots, workers, SKUs or equipment involved
    #[serde(default)]
    pub affected_entities: Vec<String>,
    /// Warehouse zones involved
    #[serde(default)]
    pub affected_zones: Vec<String>,
    /// Supporting measurements
    #[serde(default)]
    pub data_factors: Vec<DataFactor>,
}

impl Issue {
    /// Create a new issue with no affected entities or zones
    #[must_use]
    pub fn new(category: Category, title: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: IssueId::new(),
            category,
            title: title.into(),
            description: String::new(),
            severity: None,
            confidence: confidence.clamp(0.0, 1.0),
            affected_entities: Vec::new(),
            affected_zones: Vec::new(),
            data_factors: Vec::new(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With analyzer-asserted severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// With affected entities
    #[must_use]
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_entities = entities.into_iter().map(Into::into).collect();
        self
    }

    /// With affected zones
    #[must_use]
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_zones = zones.into_iter().map(Into::into).collect();
        self
    }

    /// With a supporting data factor
    #[inline]
    #[must_use]
    pub fn with_factor(mut self, factor: DataFactor) -> Self {
        self.data_factors.push(factor);
        self
    }

    /// Deduplication identity of this issue
    #[must_use]
    pub fn signature(&self) -> IssueSignature {
        IssueSignature::of(self)
    }

    /// Check that the confidence lies in the unit interval
    pub fn validate(&self) -> Result<(), ModelError> {
        if (0.0..=1.0).contains(&self.confidence) {
            Ok(())
        } else {
            Err(ModelError::OutOfRange {
                field: "confidence",
                value: self.confidence.to_string(),
            })
        }
    }
}

/// Deduplication identity: category, sorted entity list and title
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueSignature {
    category: Category,
    entities: Vec<String>,
    title: String,
}

impl IssueSignature {
    /// Compute the signature of an issue
    #[must_use]
    pub fn of(issue: &Issue) -> Self {
        let mut entities = issue.affected_entities.clone();
        entities.sort();
        Self {
            category: issue.category,
            entities,
            title: issue.title.clone(),
        }
    }

    /// Category component
    #[inline]
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }
}

impl fmt::Display for IssueSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[{}]:{}", self.category, self.entities.join(","), self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_ignores_entity_order() {
        let a = Issue::new(Category::Maintenance, "Low battery", 0.7).with_entities(["R-2", "R-1"]);
        let b = Issue::new(Category::Maintenance, "Low battery", 0.9).with_entities(["R-1", "R-2"]);
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn signature_distinguishes_title_and_category() {
        let a = Issue::new(Category::Maintenance, "Low battery", 0.7);
        let b = Issue::new(Category::Maintenance, "Motor fault", 0.7);
        let c = Issue::new(Category::Safety, "Low battery", 0.7);
        assert_ne!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Safety".parse::<Category>().unwrap(), Category::Safety);
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn issue_deserializes_with_defaults() {
        let json = r#"{"category":"inventory","title":"Low stock","confidence":0.6}"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.category, Category::Inventory);
        assert!(issue.affected_entities.is_empty());
        assert!(issue.severity.is_none());
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let issue = Issue::new(Category::General, "x", 1.7);
        assert_eq!(issue.confidence, 1.0);
        assert!(issue.validate().is_ok());
    }
}
