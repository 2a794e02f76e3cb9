//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `MetricRecord` is the unit of data; `Message` wraps it together with
//!   the generation control signals
//! - a collector channel carries `Message`s from one physical collector
//! - a handler endpoint carries `Message`s for one logical source

mod blueprint;
mod collector;
mod error;
mod handler;
mod message;
mod record;

pub use blueprint::*;
pub use collector::{Collector, CollectorError, CollectorType};
pub use error::*;
pub use handler::{EndpointTable, HandlerEndpoint, LocalMetricHandler, MetricHandler};
pub use message::{
    metric_channel, ChannelClosed, CollectorEmission, Message, MetricReceiver, MetricSender,
};
pub use record::*;
