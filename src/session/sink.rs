// Persistence boundary for sealed sessions

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::session::Session;

/// Receives a sealed session.
///
/// An error leaves the in-memory session untouched so the save can be
/// retried.
pub trait SessionSink {
    fn persist(&mut self, session: &Session) -> anyhow::Result<()>;
}

impl<F> SessionSink for F
where
    F: FnMut(&Session) -> anyhow::Result<()>,
{
    fn persist(&mut self, session: &Session) -> anyhow::Result<()> {
        self(session)
    }
}

/// Writes each session to `<dir>/<session id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, session: &Session) -> PathBuf {
        self.dir.join(format!("{}.json", session.id))
    }
}

impl SessionSink for JsonFileSink {
    fn persist(&mut self, session: &Session) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating session directory {:?}", self.dir))?;

        let path = self.path_for(session);
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&path, json).with_context(|| format!("writing session {:?}", path))?;

        log::info!(
            "[JsonFileSink] Saved {} ({} samples) to {:?}",
            session.id,
            session.samples.len(),
            path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SensorSample, SessionMetrics};
    use tempfile::tempdir;

    fn session() -> Session {
        let samples = vec![SensorSample {
            timestamp: 1,
            raw_value: 12.5,
            calibrated_value: None,
        }];
        Session {
            id: "session-1700000000000".to_string(),
            started_at: 1_700_000_000_000,
            duration_seconds: 1,
            metrics: SessionMetrics::from_samples(&samples),
            samples,
            calibration_used: false,
            calibration: None,
        }
    }

    #[test]
    fn test_json_sink_writes_file() {
        let dir = tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("sessions"));
        let session = session();

        sink.persist(&session).unwrap();

        let path = dir.path().join("sessions").join("session-1700000000000.json");
        let stored: Session = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(stored, session);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |session: &Session| -> anyhow::Result<()> {
            seen.push(session.id.clone());
            Ok(())
        };

        sink.persist(&session()).unwrap();
        assert_eq!(seen, vec!["session-1700000000000".to_string()]);
    }
}
