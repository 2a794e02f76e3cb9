//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::agent::{Agent, AgentConfig};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_agent(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut config = AgentConfig::new(blueprint);
    if let Some(ref listen) = args.listen {
        info!(listen = %listen, "Overriding listen address from CLI");
        config.listen = listen.clone();
    }
    config.max_cycles = (args.max_cycles > 0).then_some(args.max_cycles);
    config.timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    info!(
        listen = %config.listen,
        collectors = config.blueprint.collectors.len(),
        handlers = config.blueprint.handlers.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let stats = Agent::new(config)
        .run(shutdown_signal())
        .await
        .context("Agent execution failed")?;

    info!(
        cycles = stats.cycles,
        overruns = stats.overruns,
        forwarded = stats.dispatch.forwarded,
        duration_secs = stats.duration.as_secs_f64(),
        "Agent stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &AgentConfig) {
    let blueprint = &config.blueprint;
    println!("\n=== Configuration Summary ===\n");
    println!("Agent:");
    println!("  Listen: {}", config.listen);
    println!("  Default interval: {}s", blueprint.agent.interval);
    println!("  Channel capacity: {}", blueprint.agent.channel_capacity);

    println!("\nCollectors ({}):", blueprint.collectors.len());
    for collector in &blueprint.collectors {
        println!(
            "  - {} ({}) every {}s",
            collector.name,
            collector.kind,
            blueprint.collector_interval(collector)
        );
    }

    if !blueprint.handlers.is_empty() {
        println!("\nHandlers ({}):", blueprint.handlers.len());
        for handler in &blueprint.handlers {
            println!(
                "  - {} ({:?}) <- {} sources",
                handler.name,
                handler.kind,
                blueprint.handler_sources(handler).len()
            );
        }
    }

    println!();
}
