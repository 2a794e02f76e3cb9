//! HandlerHandle - runs a handler behind per-source endpoint channels

use std::sync::Arc;
use std::time::Duration;

use contracts::{EndpointTable, HandlerEndpoint, Message, MetricHandler};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, error, info, instrument};

use crate::metrics::{HandlerMetrics, MetricsSnapshot};

/// Handle to a running handler worker
pub struct HandlerHandle {
    /// Handler name
    name: String,
    /// Endpoint senders, cloned into every dispatcher
    table: EndpointTable,
    /// Shared metrics
    metrics: Arc<HandlerMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl HandlerHandle {
    /// Create one endpoint per `(source, interval)` and spawn the worker
    pub fn spawn<H: MetricHandler + Send + 'static>(
        handler: H,
        sources: &[(String, u64)],
        queue_capacity: usize,
        flush_interval: Duration,
    ) -> Self {
        Self::spawn_with_metrics(
            handler,
            sources,
            queue_capacity,
            flush_interval,
            Arc::new(HandlerMetrics::new()),
        )
    }

    /// Like `spawn`, sharing metrics the handler itself also updates
    pub fn spawn_with_metrics<H: MetricHandler + Send + 'static>(
        handler: H,
        sources: &[(String, u64)],
        queue_capacity: usize,
        flush_interval: Duration,
        metrics: Arc<HandlerMetrics>,
    ) -> Self {
        let name = handler.name().to_string();
        let mut table = EndpointTable::new(&name);
        let mut streams = StreamMap::new();

        for (source, interval) in sources {
            let (tx, rx) = mpsc::channel(queue_capacity.max(1));
            table.endpoints.insert(
                source.clone(),
                HandlerEndpoint {
                    channel: tx,
                    interval: *interval,
                },
            );
            streams.insert(source.clone(), ReceiverStream::new(rx));
        }

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            handler_worker(handler, streams, flush_interval, worker_metrics, worker_name).await;
        });

        Self {
            name,
            table,
            metrics,
            worker_handle,
        }
    }

    /// Get handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint table to hand to dispatchers
    pub fn endpoints(&self) -> EndpointTable {
        self.table.clone()
    }

    /// Sources this handler has endpoints for
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.table.endpoints.keys().cloned().collect();
        sources.sort();
        sources
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<HandlerMetrics> {
        &self.metrics
    }

    /// Drop this handle's endpoint senders and wait for the worker
    ///
    /// The worker finishes once every dispatcher holding a clone of the
    /// endpoints has finished too. Returns the final counters.
    #[instrument(name = "handler_handle_shutdown", skip(self), fields(handler = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.table);
        if let Err(e) = self.worker_handle.await {
            error!(handler = %self.name, error = ?e, "Worker task panicked");
        }

        let snapshot = self.metrics.snapshot();
        info!(
            handler = %self.name,
            received = snapshot.received_count,
            emitted = snapshot.emitted_count,
            dropped = snapshot.dropped_count,
            failures = snapshot.failure_count,
            "HandlerHandle shutdown complete"
        );
        snapshot
    }
}

/// Worker task: merge endpoint streams, tick flushes, drain on close
#[instrument(
    name = "handler_worker_loop",
    skip(handler, streams, flush_interval, metrics),
    fields(handler = %name)
)]
async fn handler_worker<H: MetricHandler>(
    mut handler: H,
    mut streams: StreamMap<String, ReceiverStream<Message>>,
    flush_interval: Duration,
    metrics: Arc<HandlerMetrics>,
    name: String,
) {
    debug!(handler = %name, endpoints = streams.len(), "Handler worker started");

    let period = flush_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            next = streams.next() => {
                let Some((source, message)) = next else {
                    break;
                };
                metrics.inc_received_count();
                metrics.set_queue_len(
                    streams.values().map(|s| s.as_ref().len()).sum()
                );

                if let Err(e) = handler.handle(&source, message).await {
                    metrics.inc_failure_count();
                    error!(handler = %name, source = %source, error = %e, "Handle failed");
                }
            }
            _ = ticker.tick() => {
                flush(&mut handler, &metrics, &name).await;
            }
        }
    }

    // every endpoint closed
    flush(&mut handler, &metrics, &name).await;
    if let Err(e) = handler.close().await {
        error!(handler = %name, error = %e, "Close failed on shutdown");
    }

    debug!(handler = %name, "Handler worker stopped");
}

async fn flush<H: MetricHandler>(handler: &mut H, metrics: &HandlerMetrics, name: &str) {
    let result = handler.flush().await;
    observability::record_handler_flush(name, result.is_ok());
    if let Err(e) = result {
        metrics.inc_failure_count();
        error!(handler = %name, error = %e, "Flush failed");
    }
}
