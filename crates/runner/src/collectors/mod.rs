//! Built-in collectors and the collector factory

mod loadavg;
mod macros;
mod static_metric;

use std::sync::Arc;

use contracts::{Collector, CollectorConfig, ContractError, MetricSender, COLLECTOR_KINDS};
use tracing::debug;

pub use loadavg::{parse_loadavg, LoadAvgCollector, DEFAULT_LOADAVG_PATH};
pub use static_metric::StaticCollector;

/// Settings shared by every built-in collector
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub name: String,
    pub canonical_name: String,
    pub interval: u64,
    pub prefix: String,
    pub blacklist: Vec<String>,
    pub canonical_sources: Vec<String>,
    pub channel: MetricSender,
}

impl CollectorSettings {
    /// Minimal settings: canonical name equals `name`, no prefix or blacklist
    pub fn new(name: impl Into<String>, interval: u64, channel: MetricSender) -> Self {
        let name = name.into();
        Self {
            canonical_name: name.clone(),
            name,
            interval,
            prefix: String::new(),
            blacklist: Vec::new(),
            canonical_sources: Vec::new(),
            channel,
        }
    }

    pub fn from_config(config: &CollectorConfig, default_interval: u64, channel: MetricSender) -> Self {
        Self {
            name: config.name.clone(),
            canonical_name: config.canonical_name().to_string(),
            interval: config.interval.unwrap_or(default_interval),
            prefix: config.prefix.clone(),
            blacklist: config.metrics_blacklist.clone(),
            canonical_sources: config.canonical_sources.clone(),
            channel,
        }
    }
}

/// Whether `kind` names a built-in collector
pub fn is_known_kind(kind: &str) -> bool {
    COLLECTOR_KINDS.contains(&kind)
}

/// Build a collector from its configuration
///
/// `default_interval` applies when the config carries no interval override.
pub fn build_collector(
    config: &CollectorConfig,
    default_interval: u64,
    channel: MetricSender,
) -> Result<Arc<dyn Collector>, ContractError> {
    let settings = CollectorSettings::from_config(config, default_interval, channel);

    let collector: Arc<dyn Collector> = match config.kind.as_str() {
        "loadavg" => {
            let path = config
                .params
                .get("path")
                .map(String::as_str)
                .unwrap_or(DEFAULT_LOADAVG_PATH);
            Arc::new(LoadAvgCollector::new(settings, path))
        }
        "static" => Arc::new(StaticCollector::from_params(settings, &config.params)?),
        other => {
            return Err(ContractError::UnknownCollector {
                name: config.name.clone(),
                kind: other.to_string(),
            })
        }
    };

    debug!(
        collector = %config.name,
        kind = %config.kind,
        interval = collector.interval(),
        "Collector built"
    );
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::metric_channel;
    use std::collections::HashMap;

    fn config(name: &str, kind: &str) -> CollectorConfig {
        CollectorConfig {
            name: name.to_string(),
            kind: kind.to_string(),
            canonical_name: None,
            interval: None,
            prefix: String::new(),
            metrics_blacklist: vec![],
            canonical_sources: vec![],
            params: HashMap::new(),
        }
    }

    #[test]
    fn test_build_applies_settings() {
        let mut cfg = config("Diamond", "static");
        cfg.canonical_name = Some("DiamondProxy".into());
        cfg.prefix = "px.".into();
        cfg.metrics_blacklist = vec!["m[0-9]+$".into()];
        cfg.canonical_sources = vec!["CPUCollector".into()];

        let (sender, _rx) = metric_channel(4);
        let collector = build_collector(&cfg, 10, sender).unwrap();
        assert_eq!(collector.name(), "Diamond");
        assert_eq!(collector.canonical_name(), "DiamondProxy");
        assert_eq!(collector.interval(), 10);
        assert_eq!(collector.prefix(), "px.");
        assert_eq!(collector.blacklist(), &["m[0-9]+$".to_string()]);
        assert_eq!(collector.canonical_sources(), &["CPUCollector".to_string()]);
    }

    #[test]
    fn test_interval_override() {
        let mut cfg = config("LoadAvg", "loadavg");
        cfg.interval = Some(3);
        let (sender, _rx) = metric_channel(4);
        let collector = build_collector(&cfg, 10, sender).unwrap();
        assert_eq!(collector.interval(), 3);
    }

    #[test]
    fn test_unknown_kind() {
        let (sender, _rx) = metric_channel(4);
        let err = build_collector(&config("Nope", "snmp"), 10, sender);
        assert!(matches!(err, Err(ContractError::UnknownCollector { .. })));
        assert!(!is_known_kind("snmp"));
        assert!(is_known_kind("loadavg"));
    }
}
