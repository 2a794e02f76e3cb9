//! Agent orchestrator - wires collectors, dispatchers, handlers and HTTP.
//!
//! Start order is handlers, dispatchers, runners; shutdown runs the other
//! way round. Aborting the runners drops the collector senders, which ends
//! the dispatchers, which releases the handler endpoints.

use std::future::Future;
use std::time::{Duration, Instant};

use contracts::{metric_channel, AgentBlueprint, CollectorEmission, EndpointTable};
use dispatcher::{CollectorProfile, DispatcherBuilder};
use handlers::HandlerHandle;
use runner::{CollectorRunner, RunSummary, RunnerConfig};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use super::server::{create_router, ServerState};
use super::AgentStats;
use crate::error::{CliError, Result};

/// How long a dispatcher or the HTTP server may take to drain on shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The validated agent blueprint
    pub blueprint: AgentBlueprint,

    /// HTTP listen address
    pub listen: String,

    /// Cycles per collector before the agent stops (None = unlimited)
    pub max_cycles: Option<u64>,

    /// Agent timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn new(blueprint: AgentBlueprint) -> Self {
        Self {
            listen: blueprint.server.listen.clone(),
            blueprint,
            max_cycles: None,
            timeout: None,
        }
    }
}

/// Main agent orchestrator
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout expires, or every runner
    /// finished its `max_cycles`
    #[instrument(
        name = "agent_run",
        skip(self, shutdown),
        fields(
            collectors = self.config.blueprint.collectors.len(),
            handlers = self.config.blueprint.handlers.len()
        )
    )]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<AgentStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let capacity = blueprint.agent.channel_capacity;

        let listener = TcpListener::bind(&self.config.listen)
            .await
            .map_err(|e| CliError::listen(&self.config.listen, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| CliError::listen(&self.config.listen, e))?;

        // Self-metrics recorder (optional)
        let internal = if blueprint.server.internal_metrics {
            match observability::init_metrics_only() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "Self-metrics unavailable");
                    None
                }
            }
        } else {
            None
        };

        // Handlers
        let mut handles: Vec<HandlerHandle> = Vec::new();
        let mut caches = Vec::new();
        for config in &blueprint.handlers {
            let sources = blueprint.handler_sources(config);
            let flush_interval = Duration::from_secs(blueprint.handler_interval(config));
            let spawned = handlers::spawn_handler(config, &sources, capacity, flush_interval)?;
            if let Some(cache) = spawned.cache {
                caches.push(cache);
            }
            handles.push(spawned.handle);
        }
        if handles.is_empty() {
            warn!("No handlers configured - metrics will be dropped");
        }
        let tables: Vec<EndpointTable> = handles.iter().map(HandlerHandle::endpoints).collect();

        // Emission counts feed the self-metrics gauge
        let (stats_tx, mut stats_rx) = mpsc::channel::<CollectorEmission>(capacity);
        let stats_task = tokio::spawn(async move {
            while let Some(emission) = stats_rx.recv().await {
                observability::record_collector_emission(&emission.source, emission.count);
            }
        });

        // One dispatcher and one runner per collector
        let runner_config = RunnerConfig {
            max_cycles: self.config.max_cycles,
            ..Default::default()
        };
        let mut dispatchers = Vec::new();
        let mut runners: JoinSet<RunSummary> = JoinSet::new();
        for config in &blueprint.collectors {
            let (sender, receiver) = metric_channel(capacity);
            let collector =
                match runner::build_collector(config, blueprint.agent.interval, sender) {
                    Ok(collector) => collector,
                    Err(e) => {
                        warn!(collector = %config.name, error = %e, "Skipping collector");
                        continue;
                    }
                };

            let profile = CollectorProfile::from_collector(collector.as_ref());
            let dispatcher = match DispatcherBuilder::new(profile, receiver)
                .handlers(tables.iter().cloned())
                .stats(stats_tx.clone())
                .build()
            {
                Ok(dispatcher) => dispatcher,
                Err(e) => {
                    warn!(collector = %config.name, error = %e, "Skipping collector");
                    continue;
                }
            };

            dispatchers.push(dispatcher.spawn());
            runners.spawn(CollectorRunner::with_config(collector, runner_config.clone()).run());
        }
        drop(stats_tx);
        drop(tables);

        let mut stats = AgentStats {
            collectors: runners.len(),
            handlers: handles.len(),
            ..Default::default()
        };

        // HTTP
        let (server_stop_tx, server_stop_rx) = oneshot::channel::<()>();
        let router = create_router(ServerState::new(caches, internal));
        let server_task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = server_stop_rx.await;
                })
                .await
        });

        info!(
            listen = %local_addr,
            collectors = stats.collectors,
            handlers = stats.handlers,
            max_cycles = ?self.config.max_cycles,
            "Agent running"
        );

        let bounded = self.config.max_cycles.is_some();
        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = sleep_or_forever(self.config.timeout) => {
                warn!(timeout_ms = ?self.config.timeout.map(|t| t.as_millis()), "Agent timed out");
            }
            _ = drain_runners(&mut runners, &mut stats), if bounded => {
                info!("All collectors finished their cycles");
            }
        }

        // Shutdown
        info!("Shutting down agent...");
        runners.abort_all();
        drain_runners(&mut runners, &mut stats).await;

        for mut dispatcher in dispatchers {
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut dispatcher).await {
                Ok(Ok(summary)) => stats.absorb_dispatch(&summary),
                Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
                Err(_) => {
                    warn!("Dispatcher did not drain in time, aborting");
                    dispatcher.abort();
                }
            }
        }

        for handle in handles {
            stats.absorb_handler(&handle.shutdown().await);
        }

        if let Err(e) = stats_task.await {
            warn!(error = %e, "Stats task failed");
        }

        let _ = server_stop_tx.send(());
        match tokio::time::timeout(DRAIN_TIMEOUT, server_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server error"),
            Ok(Err(e)) => warn!(error = %e, "HTTP server task failed"),
            Err(_) => warn!("HTTP server did not stop in time"),
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            forwarded = stats.dispatch.forwarded,
            "Agent shutdown complete"
        );

        Ok(stats)
    }
}

/// Join every runner still in the set, folding finished summaries into `stats`
async fn drain_runners(runners: &mut JoinSet<RunSummary>, stats: &mut AgentStats) {
    while let Some(joined) = runners.join_next().await {
        match joined {
            Ok(summary) => stats.absorb_run(&summary),
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "Collector runner failed"),
        }
    }
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
