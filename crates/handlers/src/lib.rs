//! # Handlers
//!
//! Output side of the agent.
//!
//! Responsibilities:
//! - One endpoint channel per subscribed source, merged into one worker
//! - Generation-consistent snapshot cache for scrape readers
//! - Prometheus text exposition serializer
//! - Buffered textfile and log outputs
//!
//! ## Usage Example
//!
//! ```ignore
//! use handlers::spawn_handler;
//!
//! let spawned = spawn_handler(&config, &sources, 100, Duration::from_secs(10))?;
//! let endpoints = spawned.handle.endpoints(); // give to dispatchers
//! if let Some(cache) = &spawned.cache {
//!     let payload = cache.render();
//! }
//! ```

pub mod buffered;
pub mod error;
pub mod exposition;
mod factory;
pub mod handle;
pub mod log;
pub mod metrics;
pub mod prometheus;
pub mod snapshot;
pub mod textfile;

pub use buffered::{BufferedHandler, Emitter};
pub use error::HandlerError;
pub use factory::{spawn_handler, SpawnedHandler};
pub use handle::HandlerHandle;
pub use log::LogEmitter;
pub use metrics::{HandlerMetrics, MetricsSnapshot};
pub use prometheus::PrometheusHandler;
pub use snapshot::{PublishReport, SnapshotCache};
pub use textfile::{TextfileConfig, TextfileEmitter};
