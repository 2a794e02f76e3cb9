//! Reads a hostwatch configuration into an `AgentBlueprint`.
//!
//! A file has an `[agent]` section with defaults, a `[server]` section, and
//! `[[collectors]]` / `[[handlers]]` arrays. Parsing is serde only. The
//! cross-field rules (unique names, one owning collector per source,
//! subscriptions that resolve) live in `validator` and run on every load,
//! so a blueprint handed out here is ready for the runner and the handler
//! factory.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), contracts::ContractError> {
//! let blueprint = ConfigLoader::load_from_path(Path::new("hostwatch.toml"))?;
//! for (source, interval) in blueprint.known_sources() {
//!     println!("{source}: every {interval}s");
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod validator;

pub use contracts::AgentBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a `.toml` or `.json` file
    pub fn load_from_path(path: &Path) -> Result<AgentBlueprint, ContractError> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse, then validate
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<AgentBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &AgentBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &AgentBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

/// Format from the file extension; there is no content sniffing
fn format_of(path: &Path) -> Result<ConfigFormat, ContractError> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Err(ContractError::config_parse(format!(
            "no extension on {}, expected .toml or .json",
            path.display()
        )));
    };
    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const AGENT_TOML: &str = r#"
[agent]
interval = 5

[server]
listen = "127.0.0.1:19091"

[[collectors]]
name = "LoadAvg"
kind = "loadavg"
metrics_blacklist = ["processes\\..*"]

[[collectors]]
name = "Diamond"
kind = "static"
canonical_sources = ["CPUCollector"]
[collectors.params]
metric_name = "cpu.total"
value = "42"

[[handlers]]
name = "prometheus"
kind = "prometheus"

[[handlers]]
name = "textfile"
kind = "textfile"
interval = 30
collectors = ["LoadAvg"]
[handlers.params]
filename = "/tmp/hostwatch.prom"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.agent.interval, 5);
        assert_eq!(bp.collectors.len(), 2);
        assert_eq!(bp.handlers.len(), 2);
        assert_eq!(bp.handler_interval(&bp.handlers[1]), 30);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.server.listen, bp2.server.listen);
        assert_eq!(bp.collectors.len(), bp2.collectors.len());
        assert_eq!(bp.collectors[1].params, bp2.collectors[1].params);
        assert_eq!(bp.handlers[1].collectors, bp2.handlers[1].collectors);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.collectors[0].metrics_blacklist, bp2.collectors[0].metrics_blacklist);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(AGENT_TOML.as_bytes()).unwrap();

        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.collectors[0].name, "LoadAvg");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_extension() {
        let file = tempfile::Builder::new().tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("expected .toml or .json"), "got: {err}");
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Parses fine, but the collector name appears twice
        let content = r#"
[[collectors]]
name = "LoadAvg"
kind = "loadavg"

[[collectors]]
name = "LoadAvg"
kind = "static"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_shared_canonical_name_rejected() {
        let content = r#"
[[collectors]]
name = "A"
kind = "static"
canonical_name = "X"

[[collectors]]
name = "B"
kind = "static"
canonical_name = "X"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("source 'X' already owned by collector 'A'"));
    }
}
