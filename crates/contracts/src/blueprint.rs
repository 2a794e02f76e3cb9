//! AgentBlueprint - Config Loader output
//!
//! Describes the complete agent configuration: collectors, handlers, and
//! the scrape endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Collector kinds the agent can build
pub const COLLECTOR_KINDS: &[&str] = &["loadavg", "static"];

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete agent configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AgentBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Global agent settings
    #[serde(default)]
    #[validate(nested)]
    pub agent: AgentConfig,

    /// Scrape endpoint settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Configured collectors
    #[serde(default)]
    #[validate(nested)]
    pub collectors: Vec<CollectorConfig>,

    /// Configured handlers
    #[serde(default)]
    #[validate(nested)]
    pub handlers: Vec<HandlerConfig>,
}

/// Global agent settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AgentConfig {
    /// Default collection interval in seconds
    #[serde(default = "default_interval")]
    #[validate(range(min = 1))]
    pub interval: u64,

    /// Capacity of every internal channel
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_interval() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    100
}

/// Scrape endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address of the HTTP endpoint
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Serve the agent's own metrics on /internal/metrics
    #[serde(default = "default_true")]
    pub internal_metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            internal_metrics: true,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:19090".to_string()
}

fn default_true() -> bool {
    true
}

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CollectorConfig {
    /// Unique physical collector name
    #[validate(length(min = 1))]
    pub name: String,

    /// Implementation kind (e.g. "loadavg")
    #[validate(length(min = 1))]
    pub kind: String,

    /// Logical name used for routing; defaults to `name`
    #[serde(default)]
    pub canonical_name: Option<String>,

    /// Interval override in seconds
    #[serde(default)]
    #[validate(range(min = 1))]
    pub interval: Option<u64>,

    /// Prefix prepended to every metric name
    #[serde(default)]
    pub prefix: String,

    /// Partial-match regular expressions of metric names to drop
    #[serde(default)]
    pub metrics_blacklist: Vec<String>,

    /// Extra logical sources this collector may emit for
    #[serde(default)]
    pub canonical_sources: Vec<String>,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl CollectorConfig {
    /// Routing name when records carry no override
    pub fn canonical_name(&self) -> &str {
        self.canonical_name.as_deref().unwrap_or(&self.name)
    }
}

/// Handler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HandlerConfig {
    /// Unique handler name
    #[validate(length(min = 1))]
    pub name: String,

    /// Handler type
    pub kind: HandlerKind,

    /// Flush interval override in seconds
    #[serde(default)]
    #[validate(range(min = 1))]
    pub interval: Option<u64>,

    /// Buffered handlers flush once this many records are pending
    #[serde(default = "default_max_buffer_size")]
    #[validate(range(min = 1))]
    pub max_buffer_size: usize,

    /// Sources to subscribe to; `None` subscribes to every known source
    #[serde(default)]
    pub collectors: Option<Vec<String>>,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_max_buffer_size() -> usize {
    300
}

/// Handler type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Generation-consistent scrape cache
    Prometheus,
    /// node-exporter textfile output
    Textfile,
    /// Log output
    Log,
}

impl AgentBlueprint {
    /// Effective interval of a collector
    pub fn collector_interval(&self, collector: &CollectorConfig) -> u64 {
        collector.interval.unwrap_or(self.agent.interval)
    }

    /// Effective flush interval of a handler
    pub fn handler_interval(&self, handler: &HandlerConfig) -> u64 {
        handler.interval.unwrap_or(self.agent.interval)
    }

    /// Every logical source, with the interval of the collector owning it
    ///
    /// Order follows the configuration. Validation guarantees one owner per
    /// source; a collector naming itself twice is listed once.
    pub fn known_sources(&self) -> Vec<(String, u64)> {
        let mut sources: Vec<(String, u64)> = Vec::new();
        for collector in &self.collectors {
            let interval = self.collector_interval(collector);
            let names = std::iter::once(collector.canonical_name())
                .chain(collector.canonical_sources.iter().map(String::as_str));
            for name in names {
                if !sources.iter().any(|(known, _)| known == name) {
                    sources.push((name.to_string(), interval));
                }
            }
        }
        sources
    }

    /// Sources a handler subscribes to, with their intervals
    pub fn handler_sources(&self, handler: &HandlerConfig) -> Vec<(String, u64)> {
        let known = self.known_sources();
        match &handler.collectors {
            None => known,
            Some(wanted) => known
                .into_iter()
                .filter(|(name, _)| wanted.iter().any(|w| w == name))
                .collect(),
        }
    }
}
