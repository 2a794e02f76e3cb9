//! BufferedHandler - batch-and-flush loop for simple handlers
//!
//! No generation tracking: every data record lands in one always-open
//! buffer. A full buffer, `FlushNow` or the periodic tick empties it
//! through the `Emitter`.

use std::sync::Arc;

use contracts::{ContractError, Message, MetricHandler, MetricRecord};
use tracing::{debug, instrument, trace};

use crate::metrics::HandlerMetrics;

/// Writes one batch somewhere
pub trait Emitter: Send + 'static {
    /// Short kind name used in logs
    fn kind(&self) -> &'static str;

    fn emit(&mut self, handler: &str, records: &[MetricRecord]) -> Result<(), ContractError>;

    /// Release resources; called once at close
    fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

pub struct BufferedHandler<E: Emitter> {
    name: String,
    emitter: E,
    buffer: Vec<MetricRecord>,
    max_buffer_size: usize,
    metrics: Arc<HandlerMetrics>,
}

impl<E: Emitter> BufferedHandler<E> {
    pub fn new(name: impl Into<String>, emitter: E, max_buffer_size: usize) -> Self {
        Self {
            name: name.into(),
            emitter,
            buffer: Vec::new(),
            max_buffer_size: max_buffer_size.max(1),
            metrics: Arc::new(HandlerMetrics::new()),
        }
    }

    /// Share counters with the handle running this handler
    pub fn with_metrics(mut self, metrics: Arc<HandlerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    fn emit_buffer(&mut self) -> Result<(), ContractError> {
        if self.buffer.is_empty() {
            debug!(handler = %self.name, "Buffer empty, skipping emission");
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        let result = self.emitter.emit(&self.name, &batch);
        if result.is_ok() {
            self.metrics.add_emitted(batch.len() as u64);
        } else {
            self.metrics.add_dropped(batch.len() as u64);
        }
        result
    }
}

impl<E: Emitter> MetricHandler for BufferedHandler<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&mut self, source: &str, message: Message) -> Result<(), ContractError> {
        match message {
            Message::Data(record) => {
                self.buffer.push(record);
                if self.buffer.len() >= self.max_buffer_size {
                    trace!(handler = %self.name, source, "Buffer full, emitting");
                    return self.emit_buffer();
                }
                Ok(())
            }
            Message::FlushNow => self.emit_buffer(),
            Message::BeginGeneration(_) | Message::EndGeneration(_) => Ok(()),
        }
    }

    #[instrument(name = "buffered_handler_flush", skip(self), fields(handler = %self.name, kind = self.emitter.kind()))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.emit_buffer()
    }

    #[instrument(name = "buffered_handler_close", skip(self), fields(handler = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.emitter.close()?;
        debug!(handler = %self.name, "BufferedHandler closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Keeps every batch it was given
    #[derive(Default)]
    struct CollectingEmitter {
        batches: Vec<Vec<String>>,
    }

    impl Emitter for CollectingEmitter {
        fn kind(&self) -> &'static str {
            "collecting"
        }

        fn emit(&mut self, _handler: &str, records: &[MetricRecord]) -> Result<(), ContractError> {
            self.batches
                .push(records.iter().map(|r| r.name.clone()).collect());
            Ok(())
        }
    }

    fn data(name: &str) -> Message {
        Message::Data(MetricRecord::new(name))
    }

    #[tokio::test]
    async fn test_full_buffer_emits() {
        let mut handler = BufferedHandler::new("buf", CollectingEmitter::default(), 2);
        handler.handle("A", data("a")).await.unwrap();
        assert!(handler.emitter().batches.is_empty());
        handler.handle("B", data("b")).await.unwrap();
        assert_eq!(handler.emitter().batches, vec![vec!["a", "b"]]);
        assert_eq!(handler.buffered(), 0);
    }

    #[tokio::test]
    async fn test_flush_now_and_tick() {
        let mut handler = BufferedHandler::new("buf", CollectingEmitter::default(), 100);
        handler.handle("A", data("a")).await.unwrap();
        handler.handle("A", Message::FlushNow).await.unwrap();
        handler.handle("A", data("b")).await.unwrap();
        handler.flush().await.unwrap();
        assert_eq!(handler.emitter().batches, vec![vec!["a"], vec!["b"]]);
    }

    #[tokio::test]
    async fn test_markers_ignored_and_empty_skipped() {
        let metrics = Arc::new(HandlerMetrics::new());
        let mut handler = BufferedHandler::new("buf", CollectingEmitter::default(), 100)
            .with_metrics(Arc::clone(&metrics));

        // records outside any generation are still buffered
        handler.handle("A", data("orphan")).await.unwrap();
        handler
            .handle("A", Message::BeginGeneration("A".into()))
            .await
            .unwrap();
        handler
            .handle("A", Message::EndGeneration("A".into()))
            .await
            .unwrap();
        assert_eq!(handler.buffered(), 1);

        handler.flush().await.unwrap();
        handler.flush().await.unwrap();
        assert_eq!(handler.emitter().batches.len(), 1);
        assert_eq!(metrics.emitted_count(), 1);
    }
}
