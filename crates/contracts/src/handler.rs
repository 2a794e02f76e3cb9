//! MetricHandler trait and endpoint tables
//!
//! A handler declares one endpoint per logical source it wants to receive.
//! The dispatcher looks endpoints up by canonical source name.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::{ContractError, Message};

/// Per-source input of a handler
#[derive(Debug, Clone)]
pub struct HandlerEndpoint {
    /// Dedicated channel for this source
    pub channel: mpsc::Sender<Message>,

    /// Declared interval for this source (seconds)
    pub interval: u64,
}

/// All endpoints of one handler, keyed by canonical source name
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    pub handler: String,
    pub endpoints: HashMap<String, HandlerEndpoint>,
}

impl EndpointTable {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            endpoints: HashMap::new(),
        }
    }

    /// Endpoint for `source`, if this handler wants it
    pub fn endpoint(&self, source: &str) -> Option<&HandlerEndpoint> {
        self.endpoints.get(source)
    }
}

/// Output handler trait
///
/// Receives the messages of every source it has an endpoint for, tagged
/// with that source.
#[trait_variant::make(MetricHandler: Send)]
pub trait LocalMetricHandler {
    /// Handler name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Handle one message delivered on the endpoint for `source`
    async fn handle(&mut self, source: &str, message: Message) -> Result<(), ContractError>;

    /// Periodic flush tick
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Called once after every endpoint closed and a final flush ran
    async fn close(&mut self) -> Result<(), ContractError>;
}
