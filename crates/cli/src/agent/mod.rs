//! Agent orchestration module.

mod orchestrator;
mod server;
mod stats;

pub use orchestrator::{Agent, AgentConfig};
pub use stats::AgentStats;
