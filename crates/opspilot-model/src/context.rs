//! Snapshot of operational state handed to analyzers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operational state for one evaluation cycle
///
/// The pipeline treats the contents as opaque; analyzers read whatever
/// readings they need by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalContext {
    /// Site identifier
    pub warehouse_id: String,
    /// Snapshot time
    pub captured_at: DateTime<Utc>,
    /// Zones known to the site
    #[serde(default)]
    pub zones: Vec<String>,
    /// Named readings, e.g. "R-1.battery" → 12.0
    #[serde(default)]
    pub readings: BTreeMap<String, f64>,
}

impl OperationalContext {
    /// Create an empty snapshot taken now
    #[must_use]
    pub fn new(warehouse_id: impl Into<String>) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            captured_at: Utc::now(),
            zones: Vec::new(),
            readings: BTreeMap::new(),
        }
    }

    /// With zones
    #[must_use]
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    /// With a reading
    #[inline]
    #[must_use]
    pub fn with_reading(mut self, name: impl Into<String>, value: f64) -> Self {
        self.readings.insert(name.into(), value);
        self
    }

    /// Look up a reading
    #[inline]
    #[must_use]
    pub fn reading(&self, name: &str) -> Option<f64> {
        self.readings.get(name).copied()
    }
}

impl Default for OperationalContext {
    fn default() -> Self {
        Self::new("default")
    }
}
