//! Build and spawn handlers from configuration

use std::sync::Arc;
use std::time::Duration;

use contracts::{HandlerConfig, HandlerKind};
use tracing::instrument;

use crate::buffered::BufferedHandler;
use crate::error::HandlerError;
use crate::handle::HandlerHandle;
use crate::log::LogEmitter;
use crate::metrics::HandlerMetrics;
use crate::prometheus::PrometheusHandler;
use crate::snapshot::SnapshotCache;
use crate::textfile::{TextfileConfig, TextfileEmitter};

/// A running handler plus, for Prometheus handlers, its scrape reader
pub struct SpawnedHandler {
    pub kind: HandlerKind,
    pub handle: HandlerHandle,
    pub cache: Option<Arc<SnapshotCache>>,
}

/// Create a handler from configuration and spawn its worker
///
/// `sources` are the `(source, interval)` pairs the handler subscribes to.
/// Must be called from within a tokio runtime.
#[instrument(
    name = "handlers_spawn_handler",
    skip(config, sources),
    fields(handler = %config.name, kind = ?config.kind, sources = sources.len())
)]
pub fn spawn_handler(
    config: &HandlerConfig,
    sources: &[(String, u64)],
    queue_capacity: usize,
    flush_interval: Duration,
) -> Result<SpawnedHandler, HandlerError> {
    let metrics = Arc::new(HandlerMetrics::new());

    let (handle, cache) = match config.kind {
        HandlerKind::Prometheus => {
            let timestamps = config
                .params
                .get("timestamps")
                .is_none_or(|v| v != "false");
            let handler = PrometheusHandler::new(&config.name, timestamps)
                .with_metrics(Arc::clone(&metrics));
            let cache = handler.cache();
            let handle = HandlerHandle::spawn_with_metrics(
                handler,
                sources,
                queue_capacity,
                flush_interval,
                metrics,
            );
            (handle, Some(cache))
        }
        HandlerKind::Textfile => {
            let textfile = TextfileConfig::from_params(&config.params).ok_or_else(|| {
                HandlerError::creation(&config.name, "textfile handler requires a 'filename' param")
            })?;
            let emitter = TextfileEmitter::new(&config.name, textfile);
            let handler = BufferedHandler::new(&config.name, emitter, config.max_buffer_size)
                .with_metrics(Arc::clone(&metrics));
            let handle = HandlerHandle::spawn_with_metrics(
                handler,
                sources,
                queue_capacity,
                flush_interval,
                metrics,
            );
            (handle, None)
        }
        HandlerKind::Log => {
            let handler =
                BufferedHandler::new(&config.name, LogEmitter::new(), config.max_buffer_size)
                    .with_metrics(Arc::clone(&metrics));
            let handle = HandlerHandle::spawn_with_metrics(
                handler,
                sources,
                queue_capacity,
                flush_interval,
                metrics,
            );
            (handle, None)
        }
    };

    Ok(SpawnedHandler {
        kind: config.kind,
        handle,
        cache,
    })
}
