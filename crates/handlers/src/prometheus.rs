//! PrometheusHandler - feeds a SnapshotCache for scrape readers

use std::sync::Arc;

use contracts::{ContractError, Message, MetricHandler};
use tracing::{debug, instrument, trace};

use crate::metrics::HandlerMetrics;
use crate::snapshot::SnapshotCache;

pub struct PrometheusHandler {
    name: String,
    cache: Arc<SnapshotCache>,
    metrics: Arc<HandlerMetrics>,
}

impl PrometheusHandler {
    /// Handler with its own cache; `timestamps` controls the sample suffix
    pub fn new(name: impl Into<String>, timestamps: bool) -> Self {
        let name = name.into();
        let mut cache = SnapshotCache::new(&name);
        if !timestamps {
            cache = cache.without_timestamps();
        }
        Self::with_cache(Arc::new(cache), name)
    }

    pub fn with_cache(cache: Arc<SnapshotCache>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache,
            metrics: Arc::new(HandlerMetrics::new()),
        }
    }

    /// Share counters with the handle running this handler
    pub fn with_metrics(mut self, metrics: Arc<HandlerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Reader side for the scrape endpoint
    pub fn cache(&self) -> Arc<SnapshotCache> {
        Arc::clone(&self.cache)
    }
}

impl MetricHandler for PrometheusHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&mut self, source: &str, message: Message) -> Result<(), ContractError> {
        match message {
            Message::BeginGeneration(_) => self.cache.begin_generation(source),
            Message::Data(record) => {
                if !self.cache.append(source, record) {
                    self.metrics.add_dropped(1);
                    observability::record_records_dropped(&self.name, "no_generation", 1);
                }
            }
            Message::EndGeneration(_) => {
                if let Some(report) = self.cache.end_generation(source) {
                    self.metrics.add_emitted(report.samples as u64);
                    self.metrics.add_dropped(report.invalid as u64);
                }
            }
            Message::FlushNow => trace!(handler = %self.name, source, "FlushNow ignored"),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "prometheus_handler_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            handler = %self.name,
            sources = self.cache.published_sources().len(),
            "PrometheusHandler closed"
        );
        Ok(())
    }
}
