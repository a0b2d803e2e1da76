// EMG Session Core - BLE sensor session engine
// Connection supervision, gated sampling, two-phase calibration and
// recording sessions for a single-characteristic EMG peripheral

// Module declarations
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod managers;
pub mod sampling;
pub mod session;
pub mod telemetry;
#[cfg(any(test, feature = "test_fixtures"))]
pub mod testing;
pub mod transport;

// Re-exports for convenience
pub use calibration::{CalibrationListener, CalibrationPhase, CalibrationProfile};
pub use config::AppConfig;
pub use engine::EngineHandle;
pub use managers::{ConnectRequest, ConnectionState};
pub use session::{JsonFileSink, Session, SessionMetrics, SessionSink};

/// Install the process-wide log subscriber.
///
/// Desktop builds log to stderr through `tracing-subscriber` (which also
/// captures `log` records, honouring `RUST_LOG`); Android builds log to
/// logcat. Calling it more than once is harmless.
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            use tracing_subscriber::prelude::*;

            match tracing_android::layer("EmgSession") {
                Ok(layer) => {
                    let _ = tracing_subscriber::registry().with(layer).try_init();
                }
                Err(err) => eprintln!("Failed to create logcat layer: {}", err),
            }
        } else {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .try_init();
        }
    }
}
