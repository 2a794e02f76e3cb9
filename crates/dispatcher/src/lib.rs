//! # Dispatcher
//!
//! Metric routing module.
//!
//! Responsibilities:
//! - Drain one collector's channel until it closes
//! - Resolve the canonical source of every record
//! - Blacklist filtering and name prefixing
//! - Fan-out to the handler endpoints registered for the source
//! - Cumulative emission counts on an optional side channel

mod blacklist;
pub mod dispatcher;
pub mod error;
mod stats;

pub use blacklist::Blacklist;
pub use dispatcher::{
    CollectorProfile, DispatchSummary, Dispatcher, DispatcherBuilder, DispatcherConfig,
};
pub use error::DispatcherError;
pub use stats::EmissionStats;
