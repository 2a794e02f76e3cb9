//! CollectorRunner - per-collector schedule and overrun watchdog
//!
//! Every tick brackets one `collect()` invocation with begin/end markers on
//! the collector's own channel. The invocation runs on a blocking thread;
//! the watchdog only reports, it never aborts the call.

use std::sync::Arc;
use std::time::Duration;

use contracts::{Collector, CollectorError, CollectorType, Message, MetricRecord};
use observability::{RunningStats, StatsSummary};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Grace period added to the interval before the watchdog fires
pub const STAGGER: Duration = Duration::from_secs(1);

/// Runner tuning
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Tick period; defaults to the collector interval
    pub period: Option<Duration>,

    /// Grace period on top of the period before an overrun is reported
    pub stagger: Duration,

    /// Stop after this many cycles (None = run forever)
    pub max_cycles: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            period: None,
            stagger: STAGGER,
            max_cycles: None,
        }
    }
}

/// Counters of one runner's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub overruns: u64,
    pub failures: u64,
    /// Invocation wall times in milliseconds
    pub duration_ms: StatsSummary,
}

/// Owns one collector's schedule
pub struct CollectorRunner {
    collector: Arc<dyn Collector>,
    config: RunnerConfig,
}

impl CollectorRunner {
    /// Runner with the default schedule
    pub fn new(collector: Arc<dyn Collector>) -> Self {
        Self::with_config(collector, RunnerConfig::default())
    }

    pub fn with_config(collector: Arc<dyn Collector>, config: RunnerConfig) -> Self {
        Self { collector, config }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.config
            .period
            .unwrap_or_else(|| Duration::from_secs(self.collector.interval().max(1)))
    }

    /// Watchdog deadline measured from the start of an invocation
    pub fn deadline(&self) -> Duration {
        self.period() + self.config.stagger
    }

    /// Spawn the runner as a background task
    pub fn spawn(self) -> JoinHandle<RunSummary> {
        tokio::spawn(self.run())
    }

    /// Run the schedule
    ///
    /// Returns after `max_cycles` or once the collector channel is closed.
    /// Dropping the runner drops its handle on the collector, which closes
    /// the channel once no invocation is in flight.
    #[instrument(name = "collector_runner", skip(self), fields(collector = %self.collector.name()))]
    pub async fn run(self) -> RunSummary {
        let period = self.period();
        info!(
            period_ms = period.as_millis() as u64,
            collector_type = %self.collector.collector_type(),
            "Collector runner started"
        );

        // first collection one period after start, like a plain ticker
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = RunSummary::default();
        let mut durations = RunningStats::default();
        loop {
            if let Some(max) = self.config.max_cycles {
                if summary.cycles >= max {
                    break;
                }
            }
            ticker.tick().await;
            if !self.run_cycle(&mut summary, &mut durations).await {
                warn!("Collector channel closed, stopping runner");
                break;
            }
        }
        summary.duration_ms = durations.summary();

        info!(
            cycles = summary.cycles,
            overruns = summary.overruns,
            failures = summary.failures,
            duration_ms = %summary.duration_ms,
            "Collector runner stopped"
        );
        summary
    }

    /// One begin / collect / end cycle; false once the channel is closed
    async fn run_cycle(&self, summary: &mut RunSummary, durations: &mut RunningStats) -> bool {
        let name = self.collector.name().to_string();
        let channel = self.collector.channel();

        if channel
            .send(Message::BeginGeneration(name.clone()))
            .await
            .is_err()
        {
            return false;
        }

        let started = Instant::now();
        let collector = Arc::clone(&self.collector);
        let invocation = tokio::task::spawn_blocking(move || collector.collect());

        let result = match self.collector.collector_type() {
            CollectorType::Listener => invocation.await,
            CollectorType::Poller => self.await_with_watchdog(invocation, summary).await,
        };
        summary.cycles += 1;

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        durations.push(elapsed);
        observability::record_collection_duration_ms(&name, elapsed);
        let elapsed_ms = elapsed as u64;
        match result {
            Ok(Ok(())) => debug!(elapsed_ms, "Collection completed"),
            Ok(Err(CollectorError::ChannelClosed)) => return false,
            Ok(Err(e)) => {
                summary.failures += 1;
                warn!(elapsed_ms, error = %e, "Collection failed");
            }
            Err(e) => {
                summary.failures += 1;
                error!(elapsed_ms, error = %e, "Collection task panicked");
            }
        }

        channel.send(Message::EndGeneration(name)).await.is_ok()
    }

    /// Wait for the invocation, reporting at most one overrun
    async fn await_with_watchdog(
        &self,
        mut invocation: JoinHandle<Result<(), CollectorError>>,
        summary: &mut RunSummary,
    ) -> Result<Result<(), CollectorError>, JoinError> {
        let deadline = tokio::time::sleep(self.deadline());
        tokio::pin!(deadline);
        let mut armed = true;

        loop {
            tokio::select! {
                result = &mut invocation => return result,
                _ = &mut deadline, if armed => {
                    armed = false;
                    summary.overruns += 1;
                    self.report_overrun().await;
                }
            }
        }
    }

    async fn report_overrun(&self) {
        let interval = self.collector.interval();
        warn!(
            interval,
            deadline_ms = self.deadline().as_millis() as u64,
            "Collector took too long to run, reporting incident"
        );
        observability::record_collection_overrun(self.collector.name());

        let record = MetricRecord::collection_time_exceeded(interval);
        if self.collector.channel().send(record).await.is_err() {
            debug!("Overrun report dropped, channel closed");
        }
    }
}
