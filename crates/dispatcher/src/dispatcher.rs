//! Dispatcher - drains one collector channel and fans out to handlers

use std::time::Duration;

use contracts::{
    Collector, CollectorEmission, EndpointTable, Message, MetricReceiver, MetricRecord,
    CANONICAL_OVERRIDE_DIMENSION, SOURCE_DIMENSION,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::blacklist::Blacklist;
use crate::error::DispatcherError;
use crate::stats::EmissionStats;

/// Dispatcher tuning
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Emission report window; defaults to the collector interval
    pub stats_interval: Option<Duration>,
}

/// The parts of a collector the dispatcher routes by
#[derive(Debug, Clone)]
pub struct CollectorProfile {
    pub name: String,
    pub canonical_name: String,
    pub interval: u64,
    pub prefix: String,
    pub blacklist: Vec<String>,
    pub canonical_sources: Vec<String>,
}

impl CollectorProfile {
    pub fn new(name: impl Into<String>, interval: u64) -> Self {
        let name = name.into();
        Self {
            canonical_name: name.clone(),
            name,
            interval,
            prefix: String::new(),
            blacklist: Vec::new(),
            canonical_sources: Vec::new(),
        }
    }

    pub fn from_collector(collector: &dyn Collector) -> Self {
        Self {
            name: collector.name().to_string(),
            canonical_name: collector.canonical_name().to_string(),
            interval: collector.interval(),
            prefix: collector.prefix().to_string(),
            blacklist: collector.blacklist().to_vec(),
            canonical_sources: collector.canonical_sources().to_vec(),
        }
    }

    pub fn canonical_name(mut self, canonical_name: impl Into<String>) -> Self {
        self.canonical_name = canonical_name.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn blacklist<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn canonical_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Canonical name followed by the declared extra sources, deduplicated
    pub fn known_sources(&self) -> Vec<String> {
        let mut sources = vec![self.canonical_name.clone()];
        for source in &self.canonical_sources {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }
        sources
    }
}

/// Counters of one dispatcher's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Data records read from the collector channel
    pub received: u64,
    /// Data records that passed resolution and the blacklist
    pub forwarded: u64,
    /// Data records matching a blacklist pattern
    pub blacklisted: u64,
    /// Data records with a reserved name or an unknown source override
    pub rejected: u64,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    profile: CollectorProfile,
    input_rx: MetricReceiver,
    handlers: Vec<EndpointTable>,
    stats_tx: Option<mpsc::Sender<CollectorEmission>>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new(profile: CollectorProfile, input_rx: MetricReceiver) -> Self {
        Self {
            profile,
            input_rx,
            handlers: Vec::new(),
            stats_tx: None,
            config: DispatcherConfig::default(),
        }
    }

    /// Endpoint table of one handler
    pub fn handler(mut self, table: EndpointTable) -> Self {
        self.handlers.push(table);
        self
    }

    pub fn handlers(mut self, tables: impl IntoIterator<Item = EndpointTable>) -> Self {
        self.handlers.extend(tables);
        self
    }

    /// Side channel for cumulative emission counts
    pub fn stats(mut self, stats_tx: mpsc::Sender<CollectorEmission>) -> Self {
        self.stats_tx = Some(stats_tx);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile the blacklist and build the dispatcher
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(collector = %self.profile.name, handlers = self.handlers.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let blacklist = Blacklist::compile(&self.profile.name, &self.profile.blacklist)?;
        let stats_interval = self
            .config
            .stats_interval
            .unwrap_or_else(|| Duration::from_secs(self.profile.interval));
        let known_sources = self.profile.known_sources();

        debug!(
            patterns = blacklist.len(),
            known_sources = known_sources.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            profile: self.profile,
            known_sources,
            blacklist,
            handlers: self.handlers,
            input_rx: self.input_rx,
            stats: EmissionStats::new(stats_interval, self.stats_tx),
            summary: DispatchSummary::default(),
        })
    }
}

/// Routes one physical collector's messages to handler endpoints
pub struct Dispatcher {
    profile: CollectorProfile,
    known_sources: Vec<String>,
    blacklist: Blacklist,
    handlers: Vec<EndpointTable>,
    input_rx: MetricReceiver,
    stats: EmissionStats,
    summary: DispatchSummary,
}

impl Dispatcher {
    /// Run the dispatcher main loop
    ///
    /// Returns when the collector channel is closed. The stats sender and
    /// the endpoint senders held by this dispatcher are dropped on return.
    #[instrument(name = "dispatcher_run", skip(self), fields(collector = %self.profile.name))]
    pub async fn run(mut self) -> DispatchSummary {
        info!(
            handlers = self.handlers.len(),
            sources = ?self.known_sources,
            "Dispatcher started"
        );

        while let Some(message) = self.input_rx.recv().await {
            match message {
                Message::Data(record) => self.dispatch_record(record).await,
                Message::BeginGeneration(source) => {
                    if let Some(source) = self.resolve_control_source(&source) {
                        self.fan_out(&source, Message::BeginGeneration(source.clone()))
                            .await;
                    }
                }
                Message::EndGeneration(source) => {
                    if let Some(source) = self.resolve_control_source(&source) {
                        self.fan_out(&source, Message::EndGeneration(source.clone()))
                            .await;
                    }
                }
                Message::FlushNow => {
                    for source in self.known_sources.clone() {
                        self.fan_out(&source, Message::FlushNow).await;
                    }
                }
            }
        }

        info!(
            received = self.summary.received,
            forwarded = self.summary.forwarded,
            blacklisted = self.summary.blacklisted,
            rejected = self.summary.rejected,
            "Collector channel closed, dispatcher stopped"
        );
        self.summary
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchSummary> {
        tokio::spawn(self.run())
    }

    async fn dispatch_record(&mut self, mut record: MetricRecord) {
        self.summary.received += 1;

        if record.has_reserved_control_name() {
            self.summary.rejected += 1;
            warn!(metric = %record.name, "Dropping data record with a reserved control name");
            return;
        }

        if record.dimension_value(SOURCE_DIMENSION).is_none() {
            record.add_dimension(SOURCE_DIMENSION, self.profile.name.clone());
        }

        let source = match record.remove_dimension(CANONICAL_OVERRIDE_DIMENSION) {
            Some(source) if self.known_sources.contains(&source) => source,
            Some(source) => {
                self.summary.rejected += 1;
                warn!(
                    metric = %record.name,
                    source = %source,
                    "Dropping record for an unregistered canonical source"
                );
                return;
            }
            None => self.profile.canonical_name.clone(),
        };

        if let Some(pattern) = self.blacklist.matching(&record.name) {
            self.summary.blacklisted += 1;
            trace!(metric = %record.name, pattern, "Metric blacklisted");
            return;
        }

        self.summary.forwarded += 1;
        self.stats.record(&source);
        self.stats.maybe_emit().await;

        if !self.profile.prefix.is_empty() {
            record.name = format!("{}{}", self.profile.prefix, record.name);
        }

        self.fan_out(&source, Message::Data(record)).await;
    }

    /// Routing key of a begin/end marker
    fn resolve_control_source(&self, source: &str) -> Option<String> {
        if source == self.profile.name {
            return Some(self.profile.canonical_name.clone());
        }
        if self.known_sources.iter().any(|s| s == source) {
            return Some(source.to_string());
        }
        warn!(source, "Dropping generation marker for an unregistered source");
        None
    }

    /// Deliver to every handler with an endpoint for `source`
    async fn fan_out(&self, source: &str, message: Message) {
        for table in &self.handlers {
            let Some(endpoint) = table.endpoint(source) else {
                continue;
            };
            if endpoint.channel.send(message.clone()).await.is_err() {
                warn!(
                    handler = %table.handler,
                    source,
                    "Handler endpoint closed, message skipped"
                );
            }
        }
    }
}
