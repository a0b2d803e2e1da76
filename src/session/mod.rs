// Session module - recording sessions and their summary statistics
//
// 1. SessionAggregator: Idle/Recording/Stopped lifecycle and sample buffer
// 2. SessionMetrics: min/avg/max over raw and calibrated values
// 3. SessionSink: persistence boundary, with a JSON file implementation

pub mod aggregator;
pub mod metrics;
pub mod sink;
pub mod types;

pub use aggregator::SessionAggregator;
pub use metrics::SessionMetrics;
pub use sink::{JsonFileSink, SessionSink};
pub use types::{SensorSample, Session, SessionSnapshot, SessionStart, SessionState};
