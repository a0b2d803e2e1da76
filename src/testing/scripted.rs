//! Scripted transport with recorded interactions.
//!
//! Clones share one script, so a test keeps a clone for inspection after
//! moving the original into the engine.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
enum AcceptPolicy {
    Any,
    Only(HashSet<String>),
    Never,
    Hang,
}

#[derive(Debug)]
struct Script {
    accept: AcceptPolicy,
    verify: bool,
    link_alive: bool,
    payloads: VecDeque<Vec<u8>>,
    idle_payload: Vec<u8>,
    connect_attempts: Vec<String>,
    reads: usize,
    disconnects: usize,
}

/// Handle returned by [`ScriptedTransport::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedLink {
    pub address: String,
}

/// Deterministic [`Transport`] for tests
///
/// Reads replay the queued payloads in order and fall back to an idle `0`
/// frame once the queue is empty.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Transport accepting every address with nothing queued
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                accept: AcceptPolicy::Any,
                verify: true,
                link_alive: false,
                payloads: VecDeque::new(),
                idle_payload: b"0".to_vec(),
                connect_attempts: Vec::new(),
                reads: 0,
                disconnects: 0,
            })),
        }
    }

    /// Only connect when the exact address text is one of `addresses`
    pub fn accepting_only(self, addresses: &[&str]) -> Self {
        self.lock().accept =
            AcceptPolicy::Only(addresses.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn rejecting_all(self) -> Self {
        self.lock().accept = AcceptPolicy::Never;
        self
    }

    /// Connect never completes
    pub fn hanging_connect(self) -> Self {
        self.lock().accept = AcceptPolicy::Hang;
        self
    }

    /// Connect succeeds but `is_connected` reports the link as down
    pub fn failing_verification(self) -> Self {
        self.lock().verify = false;
        self
    }

    pub fn with_readings(self, values: &[f64]) -> Self {
        self.push_readings(values);
        self
    }

    pub fn with_payloads(self, payloads: Vec<Vec<u8>>) -> Self {
        self.lock().payloads.extend(payloads);
        self
    }

    /// Queue readings formatted the way the sensor sends them
    pub fn push_readings(&self, values: &[f64]) {
        let mut script = self.lock();
        for value in values {
            script.payloads.push_back(value.to_string().into_bytes());
        }
    }

    /// Simulate the peripheral going out of range
    pub fn drop_link(&self) {
        self.lock().link_alive = false;
    }

    /// Address text of every connect call, in order
    pub fn connect_attempts(&self) -> Vec<String> {
        self.lock().connect_attempts.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connect_attempts.len()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    pub fn pending_payloads(&self) -> usize {
        self.lock().payloads.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Handle = ScriptedLink;

    async fn connect(
        &mut self,
        address: &str,
        _timeout: Duration,
    ) -> Result<Self::Handle, TransportError> {
        let accept = {
            let mut script = self.lock();
            script.connect_attempts.push(address.to_string());
            script.accept.clone()
        };

        let accepted = match accept {
            AcceptPolicy::Any => true,
            AcceptPolicy::Only(addresses) => addresses.contains(address),
            AcceptPolicy::Never => false,
            AcceptPolicy::Hang => {
                std::future::pending::<()>().await;
                false
            }
        };

        if !accepted {
            return Err(TransportError::ConnectFailed {
                address: address.to_string(),
                reason: "scripted rejection".to_string(),
            });
        }

        self.lock().link_alive = true;
        Ok(ScriptedLink {
            address: address.to_string(),
        })
    }

    async fn is_connected(&mut self, _handle: &Self::Handle) -> Result<bool, TransportError> {
        let script = self.lock();
        Ok(script.verify && script.link_alive)
    }

    async fn read_characteristic(
        &mut self,
        _handle: &Self::Handle,
        _characteristic: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let mut script = self.lock();
        script.reads += 1;

        if !script.link_alive {
            return Err(TransportError::ReadFailed {
                reason: "scripted link dropped".to_string(),
            });
        }

        let payload = match script.payloads.pop_front() {
            Some(payload) => payload,
            None => script.idle_payload.clone(),
        };
        Ok(payload)
    }

    async fn disconnect(&mut self, _handle: Self::Handle) -> Result<(), TransportError> {
        let mut script = self.lock();
        script.disconnects += 1;
        script.link_alive = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_the_script() {
        let inspector = ScriptedTransport::new()
            .accepting_only(&["B"])
            .with_readings(&[1.5]);
        let mut transport = inspector.clone();
        let timeout = Duration::from_secs(1);

        assert!(transport.connect("A", timeout).await.is_err());
        let link = transport.connect("B", timeout).await.unwrap();

        assert_eq!(inspector.connect_attempts(), vec!["A", "B"]);
        assert_eq!(
            transport.read_characteristic(&link, "c").await.unwrap(),
            b"1.5".to_vec()
        );
        assert_eq!(
            transport.read_characteristic(&link, "c").await.unwrap(),
            b"0".to_vec()
        );
        assert_eq!(inspector.read_count(), 2);
    }

    #[tokio::test]
    async fn test_dropped_link_fails_reads() {
        let mut transport = ScriptedTransport::new().with_readings(&[3.0]);
        let link = transport
            .connect("A", Duration::from_secs(1))
            .await
            .unwrap();

        transport.drop_link();

        assert!(transport.read_characteristic(&link, "c").await.is_err());
        assert!(!transport.is_connected(&link).await.unwrap());
        assert_eq!(transport.pending_payloads(), 1);
    }
}
