//! Transport abstractions for the sensor link.
//!
//! The engine only needs three capabilities from a BLE stack: connect by
//! address, read one characteristic, and disconnect. Everything else
//! (scanning, pairing, GATT discovery) stays behind this boundary.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

mod address;
mod simulated;

#[cfg(feature = "ble")]
mod ble;

pub use address::{address_variants, normalize_mac};
pub use simulated::{Effort, EffortControl, SimulatedLink, SimulatedTransport, SimulationProfile};

#[cfg(feature = "ble")]
pub use ble::{BtleLink, BtleplugTransport};

/// Trait implemented by BLE transports.
///
/// Implementations are owned exclusively by the engine's background worker,
/// so methods take `&mut self` and never need internal locking.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Live connection handle returned by [`Transport::connect`].
    type Handle: Send;

    /// Connect to `address`. Implementations should give up after `timeout`;
    /// the engine enforces the same deadline from the outside as well.
    async fn connect(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<Self::Handle, TransportError>;

    /// Report whether `handle` still refers to a live link.
    async fn is_connected(&mut self, handle: &Self::Handle) -> Result<bool, TransportError>;

    /// Read the raw bytes of `characteristic` (a UUID string).
    async fn read_characteristic(
        &mut self,
        handle: &Self::Handle,
        characteristic: &str,
    ) -> Result<Vec<u8>, TransportError>;

    /// Tear down `handle`.
    async fn disconnect(&mut self, handle: Self::Handle) -> Result<(), TransportError>;
}
