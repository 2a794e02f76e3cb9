//! # Collector Runner
//!
//! Schedules collectors and watches their invocations.
//!
//! Responsibilities:
//! - Tick each collector on its own interval
//! - Bracket every cycle with begin/end generation markers
//! - Report invocations that exceed `interval + stagger` (advisory only)
//! - Build the built-in collectors from configuration
//!
//! ## Usage Example
//!
//! ```ignore
//! use runner::{build_collector, CollectorRunner};
//!
//! let (sender, receiver) = contracts::metric_channel(100);
//! let collector = build_collector(&config, 10, sender)?;
//! let handle = CollectorRunner::new(collector).spawn();
//! // hand `receiver` to a dispatcher
//! ```

pub mod collectors;
mod runner;

pub use collectors::{build_collector, is_known_kind, CollectorSettings};
pub use runner::{CollectorRunner, RunSummary, RunnerConfig, STAGGER};
