//! Configuration parsing
//!
//! TOML (primary) and JSON formats.

use contracts::{AgentBlueprint, ContractError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<AgentBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<AgentBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<AgentBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::HandlerKind;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[collectors]]
name = "LoadAvg"
kind = "loadavg"

[[handlers]]
name = "prometheus"
kind = "prometheus"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.agent.interval, 10);
        assert_eq!(bp.agent.channel_capacity, 100);
        assert_eq!(bp.server.listen, "127.0.0.1:19090");
        assert_eq!(bp.collectors.len(), 1);
        assert_eq!(bp.collectors[0].canonical_name(), "LoadAvg");
        assert_eq!(bp.handlers[0].kind, HandlerKind::Prometheus);
        assert_eq!(bp.handlers[0].max_buffer_size, 300);
    }

    #[test]
    fn test_parse_toml_full_collector() {
        let content = r#"
[agent]
interval = 5

[[collectors]]
name = "Diamond"
kind = "static"
canonical_name = "DiamondProxy"
interval = 30
prefix = "px."
metrics_blacklist = ["m[0-9]+$"]
canonical_sources = ["CPUCollector"]
[collectors.params]
metric_name = "up"
"#;
        let bp = parse_toml(content).unwrap();
        let collector = &bp.collectors[0];
        assert_eq!(collector.canonical_name(), "DiamondProxy");
        assert_eq!(bp.collector_interval(collector), 30);
        assert_eq!(collector.metrics_blacklist, vec!["m[0-9]+$".to_string()]);
        assert_eq!(collector.params.get("metric_name").map(String::as_str), Some("up"));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "agent": { "interval": 15 },
            "collectors": [{ "name": "LoadAvg", "kind": "loadavg" }],
            "handlers": [{
                "name": "textfile",
                "kind": "textfile",
                "params": { "filename": "/tmp/hostwatch.prom" }
            }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().handlers[0].kind, HandlerKind::Textfile);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_handler_kind_is_parse_error() {
        let content = r#"
[[handlers]]
name = "graphite"
kind = "graphite"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
