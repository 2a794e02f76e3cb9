//! MetricRecord - the data unit of the pipeline
//!
//! Created by a collector invocation, consumed once by the dispatcher and
//! once by every handler that has an endpoint for the record's source.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimension stamped with the physical collector name
pub const SOURCE_DIMENSION: &str = "collector";

/// Dimension a multiplexing collector uses to name the logical source
pub const CANONICAL_OVERRIDE_DIMENSION: &str = "collectorCanonicalName";

/// Reserved name of the begin-of-cycle marker
pub const BEGIN_COLLECTION: &str = "hostwatch.begin_collection";

/// Reserved name of the end-of-cycle marker
pub const END_COLLECTION: &str = "hostwatch.end_collection";

/// Reserved name of the force-flush sentinel
pub const EMIT_NOW: &str = "hostwatch.emit_now";

/// Reserved name of the watchdog overrun counter
pub const COLLECTION_TIME_EXCEEDED: &str = "hostwatch.collection_time_exceeded";

/// Metric kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[default]
    #[serde(rename = "gauge")]
    Gauge,
    #[serde(rename = "counter")]
    Counter,
    #[serde(rename = "cumcounter")]
    CumulativeCounter,
}

impl MetricKind {
    /// Whether the exposition format should declare this kind as a counter
    pub fn is_counter(self) -> bool {
        !matches!(self, Self::Gauge)
    }

    /// Exposition type keyword
    pub fn exposition_type(self) -> &'static str {
        if self.is_counter() {
            "counter"
        } else {
            "gauge"
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gauge" => Ok(Self::Gauge),
            "counter" => Ok(Self::Counter),
            "cumcounter" | "cumulative_counter" => Ok(Self::CumulativeCounter),
            other => Err(format!("unknown metric kind '{other}'")),
        }
    }
}

/// A single metric data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: MetricKind,

    pub value: f64,

    /// Label set, ordered by key
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl MetricRecord {
    /// Create a gauge with value 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Gauge,
            value: 0.0,
            dimensions: BTreeMap::new(),
        }
    }

    /// Create a gauge with the given value
    pub fn with_value(name: impl Into<String>, value: f64) -> Self {
        Self {
            value,
            ..Self::new(name)
        }
    }

    /// Builder-style kind setter
    pub fn kind(mut self, kind: MetricKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder-style dimension setter
    pub fn dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_dimension(name, value);
        self
    }

    /// The overrun counter the watchdog emits for a collector
    pub fn collection_time_exceeded(interval_secs: u64) -> Self {
        Self::with_value(COLLECTION_TIME_EXCEEDED, 1.0)
            .kind(MetricKind::Counter)
            .dimension("interval", interval_secs.to_string())
    }

    pub fn add_dimension(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.dimensions.insert(name.into(), value.into());
    }

    pub fn remove_dimension(&mut self, name: &str) -> Option<String> {
        self.dimensions.remove(name)
    }

    pub fn add_dimensions<I, K, V>(&mut self, dimensions: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in dimensions {
            self.add_dimension(k, v);
        }
    }

    pub fn dimension_value(&self, name: &str) -> Option<&str> {
        self.dimensions.get(name).map(String::as_str)
    }

    /// True if the name collides with one of the control marker names
    pub fn has_reserved_control_name(&self) -> bool {
        matches!(
            self.name.as_str(),
            BEGIN_COLLECTION | END_COLLECTION | EMIT_NOW
        )
    }
}
