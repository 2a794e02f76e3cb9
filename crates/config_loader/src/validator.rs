//! Configuration validation
//!
//! Rules:
//! - field rules declared on the blueprint (`validator` derive)
//! - collector names unique, handler names unique
//! - every logical source owned by exactly one collector
//! - collector kinds known
//! - blacklist patterns compile
//! - handler `collectors` name known sources
//! - textfile handlers carry a `filename` param
//! - `server.listen` is a socket address

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use contracts::{AgentBlueprint, ContractError, HandlerKind, COLLECTOR_KINDS};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate an AgentBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_collector_names(blueprint)?;
    validate_collector_kinds(blueprint)?;
    validate_source_owners(blueprint)?;
    validate_blacklists(blueprint)?;
    validate_handler_names(blueprint)?;
    validate_handler_sources(blueprint)?;
    validate_handler_params(blueprint)?;
    validate_server(blueprint)?;
    Ok(())
}

/// Derived field rules
fn validate_fields(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_error("", &errors);
        ContractError::config_validation(field, message)
    })
}

/// Path and message of the first leaf error
fn first_error(prefix: &str, errors: &ValidationErrors) -> (String, String) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| name.to_string());

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' rule", error.code),
                    };
                    return (path, message);
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_error(&path, inner),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_error(&format!("{path}[{idx}]"), inner);
                }
            }
        }
    }
    (prefix.to_string(), "invalid value".to_string())
}

/// Collector names must be unique
fn validate_collector_names(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for collector in &blueprint.collectors {
        if !seen.insert(&collector.name) {
            return Err(ContractError::config_validation(
                format!("collectors[name={}]", collector.name),
                "duplicate collector name",
            ));
        }
    }
    Ok(())
}

fn validate_collector_kinds(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    for collector in &blueprint.collectors {
        if !COLLECTOR_KINDS.contains(&collector.kind.as_str()) {
            return Err(ContractError::config_validation(
                format!("collectors[{}].kind", collector.name),
                format!(
                    "unknown collector kind '{}' (expected one of: {})",
                    collector.kind,
                    COLLECTOR_KINDS.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

/// A source shared by two collectors would interleave their generations
fn validate_source_owners(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for collector in &blueprint.collectors {
        let names = std::iter::once(collector.canonical_name())
            .chain(collector.canonical_sources.iter().map(String::as_str));
        for name in names {
            match owners.get(name) {
                Some(owner) if *owner != collector.name => {
                    return Err(ContractError::config_validation(
                        format!("collectors[{}]", collector.name),
                        format!("source '{name}' already owned by collector '{owner}'"),
                    ));
                }
                Some(_) => {}
                None => {
                    owners.insert(name, &collector.name);
                }
            }
        }
    }
    Ok(())
}

/// Every blacklist entry must be a valid regular expression
fn validate_blacklists(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    for collector in &blueprint.collectors {
        for (idx, pattern) in collector.metrics_blacklist.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ContractError::config_validation(
                    format!("collectors[{}].metrics_blacklist[{}]", collector.name, idx),
                    format!("invalid pattern '{pattern}': {e}"),
                ));
            }
        }
    }
    Ok(())
}

/// Handler names must be unique
fn validate_handler_names(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for handler in &blueprint.handlers {
        if !seen.insert(&handler.name) {
            return Err(ContractError::config_validation(
                format!("handlers[name={}]", handler.name),
                "duplicate handler name",
            ));
        }
    }
    Ok(())
}

/// Subscriptions must name known sources
fn validate_handler_sources(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    let known: HashSet<String> = blueprint
        .known_sources()
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    for handler in &blueprint.handlers {
        let Some(wanted) = &handler.collectors else {
            continue;
        };
        for source in wanted {
            if !known.contains(source) {
                return Err(ContractError::config_validation(
                    format!("handlers[{}].collectors", handler.name),
                    format!("source '{source}' not found in any collector"),
                ));
            }
        }
    }
    Ok(())
}

/// Kind-specific handler params
fn validate_handler_params(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    for handler in &blueprint.handlers {
        if handler.kind == HandlerKind::Textfile
            && handler.params.get("filename").is_none_or(|f| f.is_empty())
        {
            return Err(ContractError::config_validation(
                format!("handlers[{}].params.filename", handler.name),
                "textfile handler requires a filename",
            ));
        }
    }
    Ok(())
}

fn validate_server(blueprint: &AgentBlueprint) -> Result<(), ContractError> {
    blueprint
        .server
        .listen
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| {
            ContractError::config_validation(
                "server.listen",
                format!("invalid listen address '{}': {e}", blueprint.server.listen),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        AgentConfig, CollectorConfig, ConfigVersion, HandlerConfig, ServerConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> AgentBlueprint {
        AgentBlueprint {
            version: ConfigVersion::V1,
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
            collectors: vec![CollectorConfig {
                name: "LoadAvg".into(),
                kind: "loadavg".into(),
                canonical_name: None,
                interval: None,
                prefix: String::new(),
                metrics_blacklist: vec!["m[0-9]+$".into()],
                canonical_sources: vec!["CPUCollector".into()],
                params: HashMap::new(),
            }],
            handlers: vec![HandlerConfig {
                name: "prometheus".into(),
                kind: HandlerKind::Prometheus,
                interval: None,
                max_buffer_size: 300,
                collectors: Some(vec!["LoadAvg".into(), "CPUCollector".into()]),
                params: HashMap::new(),
            }],
        }
    }

    fn error_of(bp: &AgentBlueprint) -> String {
        let result = validate(bp);
        assert!(result.is_err());
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut bp = minimal_blueprint();
        bp.collectors[0].interval = Some(0);
        let err = error_of(&bp);
        assert!(err.contains("collectors[0].interval"), "got: {err}");
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let mut bp = minimal_blueprint();
        bp.agent.channel_capacity = 0;
        let err = error_of(&bp);
        assert!(err.contains("agent.channel_capacity"), "got: {err}");
    }

    #[test]
    fn test_duplicate_collector_name() {
        let mut bp = minimal_blueprint();
        bp.collectors.push(bp.collectors[0].clone());
        let err = error_of(&bp);
        assert!(err.contains("duplicate collector name"), "got: {err}");
    }

    #[test]
    fn test_unknown_collector_kind() {
        let mut bp = minimal_blueprint();
        bp.collectors[0].kind = "snmp".into();
        let err = error_of(&bp);
        assert!(err.contains("unknown collector kind 'snmp'"), "got: {err}");
    }

    #[test]
    fn test_shared_canonical_name_rejected() {
        let mut bp = minimal_blueprint();
        let mut other = bp.collectors[0].clone();
        other.name = "Other".into();
        other.canonical_sources.clear();
        other.canonical_name = Some("LoadAvg".into());
        bp.collectors.push(other);
        let err = error_of(&bp);
        assert!(
            err.contains("source 'LoadAvg' already owned by collector 'LoadAvg'"),
            "got: {err}"
        );
    }

    #[test]
    fn test_shared_declared_source_rejected() {
        let mut bp = minimal_blueprint();
        let mut other = bp.collectors[0].clone();
        other.name = "Diamond".into();
        bp.collectors.push(other);
        let err = error_of(&bp);
        assert!(err.contains("source 'CPUCollector' already owned"), "got: {err}");
    }

    #[test]
    fn test_own_name_in_declared_sources_allowed() {
        let mut bp = minimal_blueprint();
        bp.collectors[0].canonical_sources.push("LoadAvg".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_invalid_blacklist() {
        let mut bp = minimal_blueprint();
        bp.collectors[0].metrics_blacklist.push("(".into());
        let err = error_of(&bp);
        assert!(err.contains("metrics_blacklist[1]"), "got: {err}");
    }

    #[test]
    fn test_duplicate_handler_name() {
        let mut bp = minimal_blueprint();
        bp.handlers.push(bp.handlers[0].clone());
        let err = error_of(&bp);
        assert!(err.contains("duplicate handler name"), "got: {err}");
    }

    #[test]
    fn test_unknown_subscription() {
        let mut bp = minimal_blueprint();
        bp.handlers[0].collectors = Some(vec!["Nope".into()]);
        let err = error_of(&bp);
        assert!(err.contains("'Nope' not found"), "got: {err}");
    }

    #[test]
    fn test_textfile_needs_filename() {
        let mut bp = minimal_blueprint();
        bp.handlers[0].kind = HandlerKind::Textfile;
        let err = error_of(&bp);
        assert!(err.contains("requires a filename"), "got: {err}");

        bp.handlers[0]
            .params
            .insert("filename".into(), "/tmp/hostwatch.prom".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_bad_listen_address() {
        let mut bp = minimal_blueprint();
        bp.server.listen = "localhost".into();
        let err = error_of(&bp);
        assert!(err.contains("server.listen"), "got: {err}");
    }
}
