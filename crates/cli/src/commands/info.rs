//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::AgentBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    listen: String,
    internal_metrics: bool,
    collectors: Vec<CollectorInfo>,
    handlers: Vec<HandlerInfo>,
}

#[derive(Serialize)]
struct CollectorInfo {
    name: String,
    kind: String,
    canonical_name: String,
    interval: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    prefix: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metrics_blacklist: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    canonical_sources: Vec<String>,
}

#[derive(Serialize)]
struct HandlerInfo {
    name: String,
    kind: String,
    interval: u64,
    /// Sources routed to this handler
    sources: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &AgentBlueprint) -> ConfigInfo {
    let collectors = blueprint
        .collectors
        .iter()
        .map(|c| CollectorInfo {
            name: c.name.clone(),
            kind: c.kind.clone(),
            canonical_name: c.canonical_name().to_string(),
            interval: blueprint.collector_interval(c),
            prefix: c.prefix.clone(),
            metrics_blacklist: c.metrics_blacklist.clone(),
            canonical_sources: c.canonical_sources.clone(),
        })
        .collect();

    let handlers = blueprint
        .handlers
        .iter()
        .map(|h| HandlerInfo {
            name: h.name.clone(),
            kind: format!("{:?}", h.kind).to_lowercase(),
            interval: blueprint.handler_interval(h),
            sources: blueprint
                .handler_sources(h)
                .into_iter()
                .map(|(source, _)| source)
                .collect(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        listen: blueprint.server.listen.clone(),
        internal_metrics: blueprint.server.internal_metrics,
        collectors,
        handlers,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  hostwatch Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Server");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Listen: {}", info.listen);
    println!("   └─ Internal metrics: {}", info.internal_metrics);

    println!("\n📥 Collectors ({})", info.collectors.len());
    for (i, collector) in info.collectors.iter().enumerate() {
        let is_last = i == info.collectors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({}, every {}s)",
            prefix, collector.name, collector.kind, collector.interval
        );
        if collector.canonical_name != collector.name {
            println!("   {}  ├─ Canonical: {}", child_prefix, collector.canonical_name);
        }
        if !collector.prefix.is_empty() {
            println!("   {}  ├─ Prefix: {}", child_prefix, collector.prefix);
        }
        if !collector.canonical_sources.is_empty() {
            println!("   {}  ├─ Also emits for: {:?}", child_prefix, collector.canonical_sources);
        }
        println!(
            "   {}  └─ Blacklist: {} patterns",
            child_prefix,
            collector.metrics_blacklist.len()
        );
    }

    if !info.handlers.is_empty() {
        println!("\n📤 Handlers ({})", info.handlers.len());
        for (i, handler) in info.handlers.iter().enumerate() {
            let is_last = i == info.handlers.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, every {}s) <- {:?}",
                prefix, handler.name, handler.kind, handler.interval, handler.sources
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_table() {
        let content = r#"
[[collectors]]
name = "Diamond"
kind = "static"
canonical_sources = ["CPUCollector"]

[[handlers]]
name = "prometheus"
kind = "prometheus"

[[handlers]]
name = "cpu-log"
kind = "log"
interval = 30
collectors = ["CPUCollector"]
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();
        let info = build_config_info(&blueprint);

        assert_eq!(info.collectors[0].interval, 10);
        assert_eq!(info.handlers[0].sources, vec!["Diamond", "CPUCollector"]);
        assert_eq!(info.handlers[1].kind, "log");
        assert_eq!(info.handlers[1].interval, 30);
        assert_eq!(info.handlers[1].sources, vec!["CPUCollector"]);
    }
}
