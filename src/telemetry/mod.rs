//! Telemetry collector.
//!
//! The collector fans engine events out over a broadcast channel and keeps a
//! bounded history so late observers (the CLI summary, a UI opening a debug
//! pane) can still see what happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::broadcast;

pub mod events;

pub use events::{TelemetryEvent, TelemetryEventKind};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<TelemetryEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
#[derive(Debug)]
pub struct TelemetryCollector {
    tx: broadcast::Sender<TelemetryEvent>,
    history: Mutex<VecDeque<TelemetryEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
    start_instant: Instant,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
            start_instant: Instant::now(),
        }
    }

    pub fn publish(&self, kind: TelemetryEventKind, detail: Option<String>) {
        let event = TelemetryEvent {
            timestamp_ms: self.start_instant.elapsed().as_millis() as u64,
            kind,
            detail,
        };
        tracing::debug!(event = ?event.kind, "[Telemetry] publish");

        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self
                .history
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if self.history_capacity > 0 {
                if history.len() == self.history_capacity {
                    history.pop_front();
                    self.dropped_history.fetch_add(1, Ordering::Relaxed);
                }
                history.push_back(event.clone());
            }
        }

        let _ = self.tx.send(event);
    }

    pub fn warn(&self, detail: impl Into<String>) {
        self.publish(TelemetryEventKind::Warning, Some(detail.into()));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(128, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::ConnectionState;

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(
            TelemetryEventKind::ConnectionChanged {
                state: ConnectionState::Connecting,
            },
            None,
        );
        collector.publish(TelemetryEventKind::ReadingStarted, None);
        collector.warn("link flaky");

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(matches!(
            snapshot.recent[0].kind,
            TelemetryEventKind::ConnectionChanged { .. }
        ));
        assert_eq!(snapshot.recent[2].detail.as_deref(), Some("link flaky"));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        collector.publish(TelemetryEventKind::ReadingStarted, None);
        collector.publish(TelemetryEventKind::ReadingStopped, None);
        collector.publish(TelemetryEventKind::SessionStopped, None);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.recent[0].kind, TelemetryEventKind::ReadingStopped);
    }

    #[test]
    fn subscribers_receive_events() {
        let collector = TelemetryCollector::default();
        let mut rx = collector.subscribe();

        collector.publish(
            TelemetryEventKind::SessionStarted {
                id: "session-1".to_string(),
            },
            None,
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event.kind,
            TelemetryEventKind::SessionStarted {
                id: "session-1".to_string()
            }
        );
    }

    #[test]
    fn event_kind_serializes_with_tag() {
        let json = serde_json::to_string(&TelemetryEventKind::CalibrationFinished {
            success: true,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"calibration_finished","payload":{"success":true}}"#
        );
    }
}
