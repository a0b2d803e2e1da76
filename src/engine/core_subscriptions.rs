use futures::{future, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::EngineHandle;
use crate::telemetry::TelemetryEvent;

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    /// Raw broadcast receiver; slow receivers observe `Lagged`
    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_collector().subscribe()
    }

    /// Telemetry as an async stream. Lagged gaps are skipped silently.
    pub fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> + Unpin + Send {
        BroadcastStream::new(self.subscribe_telemetry())
            .filter_map(|event| future::ready(event.ok()))
    }
}
