use tokio::sync::broadcast;
use tracing::debug;

use monetra_shared::{AnalyticsEvent, AnalyticsSink};

/// In-process analytics fan-out. Consumers subscribe to the broadcast
/// channel; publishing never blocks and never fails the caller.
#[derive(Clone)]
pub struct AnalyticsProducer {
    tx: broadcast::Sender<AnalyticsEvent>,
}

impl AnalyticsProducer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalyticsEvent> {
        self.tx.subscribe()
    }
}

impl AnalyticsSink for AnalyticsProducer {
    fn publish(&self, event: AnalyticsEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!(receivers, "analytics event published"),
            Err(_) => debug!("analytics event dropped, no subscribers"),
        }
    }
}
