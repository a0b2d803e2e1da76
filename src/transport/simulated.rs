use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TransportError;

use super::Transport;

/// Muscle effort driving the simulated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effort {
    /// Alternate rest and contraction every `contraction_period` reads
    Cycle,
    Rest,
    Tense,
}

/// Shared switch letting a caller steer the simulated subject.
#[derive(Debug, Clone, Default)]
pub struct EffortControl {
    inner: Arc<AtomicU8>,
}

impl EffortControl {
    pub fn set(&self, effort: Effort) {
        let raw = match effort {
            Effort::Cycle => 0,
            Effort::Rest => 1,
            Effort::Tense => 2,
        };
        self.inner.store(raw, Ordering::Relaxed);
    }

    pub fn get(&self) -> Effort {
        match self.inner.load(Ordering::Relaxed) {
            1 => Effort::Rest,
            2 => Effort::Tense,
            _ => Effort::Cycle,
        }
    }
}

/// Shape of the simulated EMG signal and link behaviour.
#[derive(Debug, Clone)]
pub struct SimulationProfile {
    /// Connect calls that fail before the first success
    pub failing_connects: u32,
    /// Mean level while relaxed
    pub rest_level: f64,
    /// Mean level while contracting
    pub peak_level: f64,
    /// Uniform noise amplitude added to every reading
    pub noise: f64,
    /// Probability of an idle `0` frame
    pub idle_frame_ratio: f64,
    /// Probability of a non-numeric `Test:N` frame
    pub garbage_frame_ratio: f64,
    /// Reads per half-cycle in [`Effort::Cycle`] mode
    pub contraction_period: u64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            failing_connects: 2,
            rest_level: 12.0,
            peak_level: 85.0,
            noise: 4.0,
            idle_frame_ratio: 0.05,
            garbage_frame_ratio: 0.02,
            contraction_period: 5,
        }
    }
}

/// Link handle for [`SimulatedTransport`].
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    pub address: String,
}

/// In-process stand-in for the EMG peripheral.
///
/// Produces ASCII payloads the same way the sensor firmware does, including
/// idle zero frames and occasional non-numeric test frames.
pub struct SimulatedTransport {
    profile: SimulationProfile,
    effort: EffortControl,
    rng: StdRng,
    connect_calls: u32,
    reads: u64,
    connected: bool,
}

impl SimulatedTransport {
    pub fn new(profile: SimulationProfile) -> Self {
        Self::with_seed(profile, rand::random())
    }

    pub fn with_seed(profile: SimulationProfile, seed: u64) -> Self {
        Self {
            profile,
            effort: EffortControl::default(),
            rng: StdRng::seed_from_u64(seed),
            connect_calls: 0,
            reads: 0,
            connected: false,
        }
    }

    /// Handle for steering the subject after the transport is moved into
    /// the engine.
    pub fn effort_control(&self) -> EffortControl {
        self.effort.clone()
    }

    fn next_payload(&mut self) -> Vec<u8> {
        self.reads += 1;

        if self.rng.gen_bool(self.profile.garbage_frame_ratio.clamp(0.0, 1.0)) {
            return format!("Test:{}", self.reads).into_bytes();
        }
        if self.rng.gen_bool(self.profile.idle_frame_ratio.clamp(0.0, 1.0)) {
            return b"0".to_vec();
        }

        let tense = match self.effort.get() {
            Effort::Rest => false,
            Effort::Tense => true,
            Effort::Cycle => {
                let period = self.profile.contraction_period.max(1);
                (self.reads / period) % 2 == 1
            }
        };
        let level = if tense {
            self.profile.peak_level
        } else {
            self.profile.rest_level
        };
        let noise = self.profile.noise.abs();
        let jitter = if noise > 0.0 {
            self.rng.gen_range(-noise..noise)
        } else {
            0.0
        };
        let value = (level + jitter).max(0.1);

        format!("{:.1}", value).into_bytes()
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(SimulationProfile::default())
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    type Handle = SimulatedLink;

    async fn connect(
        &mut self,
        address: &str,
        _timeout: Duration,
    ) -> Result<Self::Handle, TransportError> {
        self.connect_calls += 1;
        if self.connect_calls <= self.profile.failing_connects {
            return Err(TransportError::ConnectFailed {
                address: address.to_string(),
                reason: "simulated radio hiccup".to_string(),
            });
        }

        self.connected = true;
        Ok(SimulatedLink {
            address: address.to_string(),
        })
    }

    async fn is_connected(&mut self, _handle: &Self::Handle) -> Result<bool, TransportError> {
        Ok(self.connected)
    }

    async fn read_characteristic(
        &mut self,
        _handle: &Self::Handle,
        _characteristic: &str,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(self.next_payload())
    }

    async fn disconnect(&mut self, _handle: Self::Handle) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::decode_reading;

    fn quiet_profile() -> SimulationProfile {
        SimulationProfile {
            failing_connects: 0,
            idle_frame_ratio: 0.0,
            garbage_frame_ratio: 0.0,
            ..SimulationProfile::default()
        }
    }

    #[tokio::test]
    async fn test_failing_connects_then_success() {
        let mut transport = SimulatedTransport::with_seed(
            SimulationProfile {
                failing_connects: 2,
                ..quiet_profile()
            },
            7,
        );
        let timeout = Duration::from_secs(1);

        assert!(transport.connect("AA", timeout).await.is_err());
        assert!(transport.connect("AA", timeout).await.is_err());
        let link = transport.connect("AA", timeout).await.unwrap();
        assert!(transport.is_connected(&link).await.unwrap());
    }

    #[tokio::test]
    async fn test_effort_control_steers_levels() {
        let mut transport = SimulatedTransport::with_seed(quiet_profile(), 42);
        let control = transport.effort_control();
        let link = transport
            .connect("AA", Duration::from_secs(1))
            .await
            .unwrap();

        control.set(Effort::Rest);
        let payload = transport.read_characteristic(&link, "c").await.unwrap();
        let rest = decode_reading(&payload).unwrap().unwrap();

        control.set(Effort::Tense);
        let payload = transport.read_characteristic(&link, "c").await.unwrap();
        let tense = decode_reading(&payload).unwrap().unwrap();

        assert!(rest < 20.0, "rest reading too high: {}", rest);
        assert!(tense > 70.0, "tense reading too low: {}", tense);
    }

    #[tokio::test]
    async fn test_read_after_disconnect_fails() {
        let mut transport = SimulatedTransport::with_seed(quiet_profile(), 1);
        let link = transport
            .connect("AA", Duration::from_secs(1))
            .await
            .unwrap();
        transport.disconnect(link.clone()).await.unwrap();

        let result = transport.read_characteristic(&link, "c").await;
        assert_eq!(result, Err(TransportError::NotConnected));
    }
}
