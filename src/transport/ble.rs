//! btleplug-backed transport for a real peripheral.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::TransportError;

use super::Transport;

type CleanupTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Async cleanup that runs unless disarmed.
///
/// Dropping an armed guard (including when an enclosing timeout cancels the
/// future holding it) spawns the task on the current runtime.
struct Cleanup {
    task: Option<CleanupTask>,
}

impl Cleanup {
    fn new(task: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            task: Some(Box::pin(task)),
        }
    }

    /// Run the cleanup now
    async fn run(mut self) {
        if let Some(task) = self.task.take() {
            task.await;
        }
    }

    fn disarm(mut self) {
        self.task = None;
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(task);
                }
                Err(_) => warn!("[BtleplugTransport] No runtime left for cleanup"),
            }
        }
    }
}

/// Live link to the peripheral.
pub struct BtleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

/// Transport backed by the host's first Bluetooth adapter.
///
/// `connect` scans until a peripheral whose reported address matches the
/// requested spelling appears, connects, discovers services and resolves
/// the configured characteristic.
pub struct BtleplugTransport {
    adapter: Option<Adapter>,
    characteristic: Uuid,
}

impl BtleplugTransport {
    pub fn new(characteristic_uuid: &str) -> Result<Self, TransportError> {
        let characteristic =
            Uuid::parse_str(characteristic_uuid).map_err(|err| TransportError::ReadFailed {
                reason: format!("invalid characteristic uuid {}: {}", characteristic_uuid, err),
            })?;
        Ok(Self {
            adapter: None,
            characteristic,
        })
    }

    async fn adapter(&mut self) -> Result<Adapter, TransportError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let unavailable = |err: btleplug::Error| TransportError::AdapterUnavailable {
            reason: err.to_string(),
        };
        let manager = Manager::new().await.map_err(unavailable)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(unavailable)?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::AdapterUnavailable {
                reason: "no Bluetooth adapter found".to_string(),
            })?;

        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    async fn find_peripheral(adapter: &Adapter, address: &str) -> Peripheral {
        loop {
            let peripherals = adapter.peripherals().await.unwrap_or_default();
            for p in peripherals {
                if p.address().to_string() == address {
                    return p;
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn open(&mut self, address: &str) -> Result<BtleLink, TransportError> {
        let adapter = self.adapter().await?;
        let connect_failed = |err: btleplug::Error| TransportError::ConnectFailed {
            address: address.to_string(),
            reason: err.to_string(),
        };

        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(connect_failed)?;
        let scan = {
            let adapter = adapter.clone();
            Cleanup::new(async move {
                let _ = adapter.stop_scan().await;
            })
        };
        let peripheral = Self::find_peripheral(&adapter, address).await;
        scan.run().await;
        debug!("[BtleplugTransport] Found peripheral at {}", address);

        // Armed before connecting so a cancelled connect is torn down too
        let connection = {
            let peripheral = peripheral.clone();
            Cleanup::new(async move {
                let _ = peripheral.disconnect().await;
            })
        };
        if let Err(err) = peripheral.connect().await {
            connection.run().await;
            return Err(connect_failed(err));
        }

        match self.resolve(&peripheral, address).await {
            Ok(characteristic) => {
                connection.disarm();
                info!("[BtleplugTransport] Connected to {}", address);
                Ok(BtleLink {
                    peripheral,
                    characteristic,
                })
            }
            Err(err) => {
                connection.run().await;
                Err(err)
            }
        }
    }

    /// Discover services and find the configured characteristic
    async fn resolve(
        &self,
        peripheral: &Peripheral,
        address: &str,
    ) -> Result<Characteristic, TransportError> {
        // BlueZ reports the connection before the GATT cache is populated
        #[cfg(target_os = "linux")]
        tokio::time::sleep(Duration::from_millis(600)).await;

        peripheral
            .discover_services()
            .await
            .map_err(|err| TransportError::ConnectFailed {
                address: address.to_string(),
                reason: err.to_string(),
            })?;

        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.characteristic)
            .ok_or_else(|| TransportError::ConnectFailed {
                address: address.to_string(),
                reason: format!("characteristic {} not found", self.characteristic),
            })
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    type Handle = BtleLink;

    async fn connect(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<Self::Handle, TransportError> {
        // Cancelling `open` leaves cleanup to its guards
        tokio::time::timeout(timeout, self.open(address))
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    operation: format!("connect {}", address),
                })
            })
    }

    async fn is_connected(&mut self, handle: &Self::Handle) -> Result<bool, TransportError> {
        handle
            .peripheral
            .is_connected()
            .await
            .map_err(|err| TransportError::ReadFailed {
                reason: err.to_string(),
            })
    }

    async fn read_characteristic(
        &mut self,
        handle: &Self::Handle,
        characteristic: &str,
    ) -> Result<Vec<u8>, TransportError> {
        if !characteristic.eq_ignore_ascii_case(&handle.characteristic.uuid.to_string()) {
            return Err(TransportError::ReadFailed {
                reason: format!("characteristic {} not resolved on this link", characteristic),
            });
        }

        handle
            .peripheral
            .read(&handle.characteristic)
            .await
            .map_err(|err| TransportError::ReadFailed {
                reason: err.to_string(),
            })
    }

    async fn disconnect(&mut self, handle: Self::Handle) -> Result<(), TransportError> {
        handle
            .peripheral
            .disconnect()
            .await
            .map_err(|err| TransportError::ConnectFailed {
                address: handle.peripheral.address().to_string(),
                reason: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn flagged() -> (Arc<AtomicBool>, Cleanup) {
        let flag = Arc::new(AtomicBool::new(false));
        let task_flag = Arc::clone(&flag);
        let cleanup = Cleanup::new(async move {
            task_flag.store(true, Ordering::SeqCst);
        });
        (flag, cleanup)
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_cancelled() {
        let (flag, cleanup) = flagged();

        let pending = async move {
            let _cleanup = cleanup;
            std::future::pending::<()>().await;
        };
        assert!(tokio::time::timeout(Duration::from_millis(10), pending)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cleanup_run_and_disarm() {
        let (ran, cleanup) = flagged();
        cleanup.run().await;
        assert!(ran.load(Ordering::SeqCst));

        let (skipped, cleanup) = flagged();
        cleanup.disarm();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!skipped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_characteristic_uuid() {
        assert!(matches!(
            BtleplugTransport::new("not-a-uuid"),
            Err(TransportError::ReadFailed { .. })
        ));
    }
}
