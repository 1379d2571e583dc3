//! BlueZ transport.
//!
//! Connects to a band by address over D-Bus, resolves every characteristic
//! to a [`CharacteristicRole`] once, and forwards notify streams into the
//! session's notification channel.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Mutex;
use std::time::Duration;

use bluer::gatt::remote::Characteristic;
use bluer::{Address, Device};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::core::{CharacteristicRole, Notification, Transport, TransportError};

/// How long to wait for the connection itself.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for BlueZ to resolve services after connecting.
const SERVICES_TIMEOUT: Duration = Duration::from_secs(10);

const SERVICES_POLL: Duration = Duration::from_millis(100);

/// GATT link to one band over BlueZ.
pub struct BluezTransport {
    _session: bluer::Session,
    device: Device,
    characteristics: HashMap<CharacteristicRole, Characteristic>,
    notifications: mpsc::Sender<Notification>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl BluezTransport {
    /// Connect to `address` and map its characteristics.
    ///
    /// Fails with [`TransportError::CharacteristicMissing`] if any role in
    /// [`CharacteristicRole::REQUIRED`] is absent.
    pub async fn connect(
        address: &str,
        notifications: mpsc::Sender<Notification>,
    ) -> Result<Self, TransportError> {
        let address: Address = address
            .parse()
            .map_err(|e| TransportError::Connection(format!("invalid address {address}: {e}")))?;

        let session = bluer::Session::new().await.map_err(connection_error)?;
        let adapter = session.default_adapter().await.map_err(connection_error)?;
        if !adapter.is_powered().await.map_err(connection_error)? {
            info!("Powering on BLE adapter...");
            adapter.set_powered(true).await.map_err(connection_error)?;
        }

        let device = adapter.device(address).map_err(connection_error)?;
        if !device.is_connected().await.map_err(connection_error)? {
            info!("Connecting to {}...", address);
            match tokio::time::timeout(CONNECT_TIMEOUT, device.connect()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(connection_error(e)),
                Err(_) => {
                    return Err(TransportError::Connection(format!(
                        "connection to {address} timed out"
                    )));
                }
            }
        }
        wait_for_services(&device).await?;

        let characteristics = discover(&device).await?;
        if let Some(missing) = CharacteristicRole::REQUIRED
            .into_iter()
            .find(|role| !characteristics.contains_key(role))
        {
            return Err(TransportError::CharacteristicMissing(missing));
        }
        info!(
            "Connected to {} ({} known characteristics)",
            address,
            characteristics.len()
        );

        Ok(Self {
            _session: session,
            device,
            characteristics,
            notifications,
            forwarders: Mutex::new(Vec::new()),
        })
    }

    /// Address of the connected band.
    pub fn address(&self) -> Address {
        self.device.address()
    }

    /// Stop forwarding notifications and drop the connection.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.stop_forwarders();
        self.device.disconnect().await.map_err(connection_error)
    }

    fn characteristic(&self, role: CharacteristicRole) -> Result<&Characteristic, TransportError> {
        self.characteristics
            .get(&role)
            .ok_or(TransportError::CharacteristicMissing(role))
    }

    fn stop_forwarders(&self) {
        if let Ok(mut forwarders) = self.forwarders.lock() {
            for handle in forwarders.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Transport for BluezTransport {
    async fn write(&self, role: CharacteristicRole, value: &[u8]) -> Result<(), TransportError> {
        let characteristic = self.characteristic(role)?;
        debug!("Writing {} bytes to {}", value.len(), role);
        characteristic
            .write(value)
            .await
            .map_err(|e| TransportError::Write {
                role,
                reason: e.to_string(),
            })
    }

    async fn enable_notifications(&self, role: CharacteristicRole) -> Result<bool, TransportError> {
        let characteristic = self.characteristic(role)?;
        let notify_error = |e: bluer::Error| TransportError::Notify {
            role,
            reason: e.to_string(),
        };

        let flags = characteristic.flags().await.map_err(notify_error)?;
        if !flags.notify && !flags.indicate {
            warn!("{} does not support notifications", role);
            return Ok(false);
        }

        let stream = characteristic.notify().await.map_err(notify_error)?;
        let tx = self.notifications.clone();
        let handle = tokio::spawn(async move {
            let mut stream = pin!(stream);
            while let Some(value) = stream.next().await {
                if tx.send(Notification::new(role, value)).await.is_err() {
                    break;
                }
            }
            debug!("Notification stream for {} ended", role);
        });

        if let Ok(mut forwarders) = self.forwarders.lock() {
            forwarders.push(handle);
        }
        info!("Notifications enabled on {}", role);
        Ok(true)
    }
}

impl Drop for BluezTransport {
    fn drop(&mut self) {
        self.stop_forwarders();
    }
}

async fn wait_for_services(device: &Device) -> Result<(), TransportError> {
    let resolved = async {
        loop {
            match device.is_services_resolved().await {
                Ok(true) => return Ok(()),
                Ok(false) => tokio::time::sleep(SERVICES_POLL).await,
                Err(e) => return Err(connection_error(e)),
            }
        }
    };
    tokio::time::timeout(SERVICES_TIMEOUT, resolved)
        .await
        .map_err(|_| TransportError::Connection("services were not resolved in time".into()))?
}

async fn discover(
    device: &Device,
) -> Result<HashMap<CharacteristicRole, Characteristic>, TransportError> {
    let mut characteristics = HashMap::new();
    for service in device.services().await.map_err(connection_error)? {
        for characteristic in service.characteristics().await.map_err(connection_error)? {
            let uuid = characteristic.uuid().await.map_err(connection_error)?;
            if let Some(role) = CharacteristicRole::from_uuid(&uuid) {
                debug!("Found {} ({})", role, uuid);
                characteristics.entry(role).or_insert(characteristic);
            }
        }
    }
    Ok(characteristics)
}

fn connection_error(e: bluer::Error) -> TransportError {
    TransportError::Connection(e.to_string())
}
