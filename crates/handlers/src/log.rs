//! LogEmitter - logs batch summaries via tracing

use contracts::{ContractError, MetricRecord};
use tracing::{debug, info};

use crate::buffered::Emitter;

/// Emitter that logs batches for debugging
#[derive(Debug, Default)]
pub struct LogEmitter {
    batches: u64,
}

impl LogEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }
}

impl Emitter for LogEmitter {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn emit(&mut self, handler: &str, records: &[MetricRecord]) -> Result<(), ContractError> {
        self.batches += 1;
        info!(
            handler,
            batch = self.batches,
            records = records.len(),
            "Metric batch"
        );
        for record in records {
            debug!(
                handler,
                metric = %record.name,
                kind = record.kind.exposition_type(),
                value = record.value,
                dimensions = ?record.dimensions,
                "Metric"
            );
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        info!(batches = self.batches, "LogEmitter closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_emit() {
        let mut emitter = LogEmitter::new();
        let records = vec![MetricRecord::with_value("a", 1.0)];
        assert!(emitter.emit("log", &records).is_ok());
        assert!(emitter.emit("log", &[]).is_ok());
        assert_eq!(emitter.batches(), 2);
        assert_eq!(emitter.kind(), "log");
    }
}
