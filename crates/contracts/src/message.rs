//! Message - what travels on collector and handler channels
//!
//! Control signals share the data channel so that a consumer observes
//! begin, records and end of one cycle in production order.

use tokio::sync::mpsc;

use crate::MetricRecord;

/// Data or control message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// An ordinary metric sample
    Data(MetricRecord),

    /// Opens a generation for the named source
    BeginGeneration(String),

    /// Closes the open generation for the named source
    EndGeneration(String),

    /// Forces buffered handlers to flush
    FlushNow,
}

impl From<MetricRecord> for Message {
    fn from(record: MetricRecord) -> Self {
        Self::Data(record)
    }
}

/// Cumulative count of records forwarded for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorEmission {
    pub source: String,
    pub count: u64,
}

/// Sending half of a collector channel
#[derive(Debug, Clone)]
pub struct MetricSender {
    tx: mpsc::Sender<Message>,
}

/// Receiving half of a collector channel
pub type MetricReceiver = mpsc::Receiver<Message>;

/// Create a bounded collector channel
pub fn metric_channel(capacity: usize) -> (MetricSender, MetricReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MetricSender { tx }, rx)
}

/// Returned when the dispatcher side of a channel is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("metric channel closed")]
pub struct ChannelClosed;

impl MetricSender {
    /// Send from async code, waiting for capacity
    pub async fn send(&self, message: impl Into<Message>) -> Result<(), ChannelClosed> {
        self.tx.send(message.into()).await.map_err(|_| ChannelClosed)
    }

    /// Send from blocking code (collector invocations, listener threads)
    ///
    /// Must not be called from within an async execution context.
    pub fn emit(&self, message: impl Into<Message>) -> Result<(), ChannelClosed> {
        self.tx.blocking_send(message.into()).map_err(|_| ChannelClosed)
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (tx, rx) = metric_channel(1);
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(Message::FlushNow).await, Err(ChannelClosed));
    }

    #[test]
    fn test_emit_from_blocking_thread() {
        let (tx, mut rx) = metric_channel(4);
        std::thread::spawn(move || {
            tx.emit(MetricRecord::with_value("m", 2.0)).unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(
            rx.blocking_recv(),
            Some(Message::Data(MetricRecord::with_value("m", 2.0)))
        );
    }
}
