//! Collector trait - the on-demand data source contract
//!
//! Implementations push zero or more messages onto their channel each time
//! `collect()` is invoked. The runner owns the schedule; the dispatcher
//! owns the receiving half of the channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MetricSender;

/// How a collector is triggered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorType {
    /// Polled on every tick; `collect()` may block
    #[default]
    Poller,
    /// Push-triggered; `collect()` arms and returns immediately
    Listener,
}

impl std::fmt::Display for CollectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poller => write!(f, "poller"),
            Self::Listener => write!(f, "listener"),
        }
    }
}

/// Errors a collector invocation may report
///
/// All of them are transient from the runner's point of view: the cycle
/// produces fewer records and the schedule carries on.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("metric channel closed")]
    ChannelClosed,
}

impl From<crate::ChannelClosed> for CollectorError {
    fn from(_: crate::ChannelClosed) -> Self {
        Self::ChannelClosed
    }
}

/// Data source polled by the collector runner
pub trait Collector: Send + Sync + 'static {
    /// Physical collector name
    fn name(&self) -> &str;

    /// Logical source name used for routing when records carry no override
    fn canonical_name(&self) -> &str {
        self.name()
    }

    /// Collection interval in seconds, > 0
    fn interval(&self) -> u64;

    /// Prefix prepended to every forwarded metric name
    fn prefix(&self) -> &str {
        ""
    }

    /// Partial-match regular expressions of metric names to drop
    fn blacklist(&self) -> &[String] {
        &[]
    }

    /// Additional logical sources this collector may emit on behalf of
    fn canonical_sources(&self) -> &[String] {
        &[]
    }

    /// The collector's output channel
    fn channel(&self) -> &MetricSender;

    /// Perform one collection; runs on a blocking-capable thread
    fn collect(&self) -> Result<(), CollectorError>;

    fn collector_type(&self) -> CollectorType {
        CollectorType::Poller
    }
}
