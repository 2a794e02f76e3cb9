//! Emission accounting
//!
//! Counts forwarded records per canonical source. Totals are cumulative for
//! the lifetime of the dispatcher; only the reporting window is reset.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::CollectorEmission;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

pub struct EmissionStats {
    counts: BTreeMap<String, u64>,
    interval: Duration,
    last_emit: Instant,
    sink: Option<mpsc::Sender<CollectorEmission>>,
}

impl EmissionStats {
    pub fn new(interval: Duration, sink: Option<mpsc::Sender<CollectorEmission>>) -> Self {
        Self {
            counts: BTreeMap::new(),
            interval,
            last_emit: Instant::now(),
            sink,
        }
    }

    /// Count one forwarded record
    pub fn record(&mut self, source: &str) {
        match self.counts.get_mut(source) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(source.to_string(), 1);
            }
        }
    }

    /// Current total for `source`
    pub fn count(&self, source: &str) -> u64 {
        self.counts.get(source).copied().unwrap_or(0)
    }

    /// Report every total if the reporting window has elapsed
    ///
    /// Without a sink this only advances the window.
    pub async fn maybe_emit(&mut self) {
        if self.last_emit.elapsed() < self.interval {
            return;
        }
        self.last_emit = Instant::now();

        let Some(sink) = &self.sink else {
            return;
        };
        for (source, count) in &self.counts {
            let emission = CollectorEmission {
                source: source.clone(),
                count: *count,
            };
            if sink.send(emission).await.is_err() {
                debug!("Stats receiver gone, disabling emission reports");
                self.sink = None;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_totals_are_cumulative() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut stats = EmissionStats::new(Duration::ZERO, Some(tx));

        stats.record("Test");
        stats.maybe_emit().await;
        stats.record("Test");
        stats.record("Other");
        stats.maybe_emit().await;

        let first = rx.recv().await.unwrap();
        assert_eq!((first.source.as_str(), first.count), ("Test", 1));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.source.as_str(), second.count), ("Other", 1));
        let third = rx.recv().await.unwrap();
        assert_eq!((third.source.as_str(), third.count), ("Test", 2));
    }

    #[tokio::test]
    async fn test_window_not_elapsed() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut stats = EmissionStats::new(Duration::from_secs(3600), Some(tx));
        stats.record("Test");
        stats.maybe_emit().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(stats.count("Test"), 1);
    }

    #[tokio::test]
    async fn test_closed_sink_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut stats = EmissionStats::new(Duration::ZERO, Some(tx));
        stats.record("Test");
        stats.maybe_emit().await;
        assert!(stats.sink.is_none());
    }
}
