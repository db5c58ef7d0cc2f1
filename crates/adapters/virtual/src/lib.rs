//! # stimlink-adapter-virtual
//!
//! Virtual/demo transport that simulates one HowlandStim stimulator, for
//! testing and demonstration without Bluetooth hardware.
//!
//! ## Simulated peripheral
//!
//! | Aspect | Behaviour |
//! |--------|-----------|
//! | Advertising | Periodically while a scan runs, with the configured name and RSSI |
//! | Services | Generic Access plus the Nordic UART service, after a few empty discovery rounds |
//! | RX writes | Interpreted like the firmware does (handshake, query, set config) |
//! | TX notifications | The current configuration after every accepted command |
//! | Link loss | On demand through [`VirtualTransport::drop_connection`] |
//!
//! ## Dependency rule
//!
//! Depends on `stimlink-app` (port traits) and `stimlink-domain` only.

mod error;
mod options;
mod stimulator;

pub use error::VirtualError;
pub use options::VirtualOptions;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stimlink_app::ports::{ScanOptions, ServiceDescriptor, Transport};
use stimlink_domain::config::DeviceConfig;
use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::protocol::{RX_CHAR, TX_CHAR, UART_SERVICE};
use stimlink_domain::scan::ScannedPeripheral;

use stimulator::Stimulator;

/// Generic Access service, exposed by every BLE peripheral.
const GENERIC_ACCESS: uuid::Uuid = uuid::Uuid::from_u128(0x0000_1800_0000_1000_8000_0080_5f9b_34fb);

/// Radio-side state of the simulated link.
#[derive(Default)]
struct Link {
    connected: bool,
    empty_polls_left: u32,
    disconnects: Option<mpsc::Sender<PeripheralId>>,
    frames: Option<mpsc::Sender<Vec<u8>>>,
}

/// [`Transport`] backed by a simulated stimulator.
pub struct VirtualTransport {
    id: PeripheralId,
    options: VirtualOptions,
    device: Stimulator,
    link: Mutex<Link>,
    advertiser: Mutex<Option<JoinHandle<()>>>,
}

impl Default for VirtualTransport {
    fn default() -> Self {
        Self::new(VirtualOptions::default())
    }
}

impl VirtualTransport {
    /// Power up a simulated stimulator with a fresh random id.
    #[must_use]
    pub fn new(options: VirtualOptions) -> Self {
        let id = PeripheralId::new(uuid::Uuid::new_v4().to_string());
        tracing::debug!(id = %id, name = %options.name, "simulated stimulator powered up");
        Self {
            id,
            device: Stimulator::new(options.config),
            options,
            link: Mutex::new(Link::default()),
            advertiser: Mutex::new(None),
        }
    }

    /// Id under which the simulated stimulator advertises.
    #[must_use]
    pub fn peripheral_id(&self) -> &PeripheralId {
        &self.id
    }

    /// Configuration currently stored on the simulated device.
    #[must_use]
    pub fn device_config(&self) -> DeviceConfig {
        self.device.config()
    }

    /// Drop the link as if the device went out of range.
    ///
    /// Returns `false` when there was no link to drop.
    pub fn drop_connection(&self) -> bool {
        let disconnects = {
            let mut link = self.link();
            if !link.connected {
                return false;
            }
            let disconnects = link.disconnects.take();
            *link = Link::default();
            disconnects
        };
        tracing::info!(id = %self.id, "simulated link loss");
        if let Some(disconnects) = disconnects {
            let _ = disconnects.try_send(self.id.clone());
        }
        true
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advertisement(&self) -> ScannedPeripheral {
        ScannedPeripheral {
            id: self.id.clone(),
            name: Some(self.options.name.clone()),
            signal_strength: Some(self.options.rssi),
        }
    }

    fn check_id(&self, id: &PeripheralId) -> Result<(), VirtualError> {
        if *id == self.id {
            Ok(())
        } else {
            Err(VirtualError::UnknownPeripheral(id.clone()))
        }
    }

    fn connected_link(&self, id: &PeripheralId) -> Result<MutexGuard<'_, Link>, VirtualError> {
        self.check_id(id)?;
        let link = self.link();
        if link.connected {
            Ok(link)
        } else {
            Err(VirtualError::NotConnected)
        }
    }

    fn replace_advertiser(&self, task: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(
            &mut *self.advertiser.lock().unwrap_or_else(PoisonError::into_inner),
            task,
        );
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn open(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> Result<(), VirtualError> {
        self.check_id(id)?;
        if self.options.fail_connect {
            return Err(VirtualError::Refused);
        }
        *self.link() = Link {
            connected: true,
            empty_polls_left: self.options.empty_service_polls,
            disconnects: Some(disconnects),
            frames: None,
        };
        tracing::info!(id = %id, "simulated connect");
        Ok(())
    }

    fn discover(&self, id: &PeripheralId) -> Result<Vec<ServiceDescriptor>, VirtualError> {
        let mut link = self.connected_link(id)?;
        if link.empty_polls_left > 0 {
            link.empty_polls_left -= 1;
            return Ok(Vec::new());
        }
        let mut services = vec![ServiceDescriptor {
            uuid: GENERIC_ACCESS,
        }];
        if !self.options.omit_uart_service {
            services.push(ServiceDescriptor { uuid: UART_SERVICE });
        }
        Ok(services)
    }

    fn check_characteristic(
        &self,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        expected: uuid::Uuid,
    ) -> Result<(), VirtualError> {
        if service == UART_SERVICE && characteristic == expected && !self.options.omit_uart_service {
            Ok(())
        } else {
            Err(VirtualError::NoSuchCharacteristic {
                service,
                characteristic,
            })
        }
    }

    fn subscribe(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), VirtualError> {
        self.check_characteristic(service, characteristic, TX_CHAR)?;
        self.connected_link(id)?.frames = Some(frames);
        Ok(())
    }

    fn receive(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> Result<(), VirtualError> {
        self.check_characteristic(service, characteristic, RX_CHAR)?;
        let frames = self.connected_link(id)?.frames.clone();
        let reply = self.device.receive(bytes);
        // Notify after the write has been acknowledged, like the radio does.
        if let (Some(reply), Some(frames)) = (reply, frames) {
            tokio::spawn(async move {
                let _ = frames.send(reply.to_vec()).await;
            });
        }
        Ok(())
    }
}

impl Transport for VirtualTransport {
    async fn scan(
        &self,
        _options: ScanOptions,
        results: mpsc::Sender<ScannedPeripheral>,
    ) -> Result<(), TransportError> {
        let advertisement = self.advertisement();
        let period = Duration::from_millis(self.options.advertise_interval_ms.max(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if results.send(advertisement.clone()).await.is_err() {
                    break;
                }
            }
        });
        self.replace_advertiser(Some(task));
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.replace_advertiser(None);
        Ok(())
    }

    async fn connect(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> Result<(), TransportError> {
        self.open(id, disconnects)
            .map_err(|err| err.during("connect"))
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), TransportError> {
        self.check_id(id).map_err(|err| err.during("disconnect"))?;
        *self.link() = Link::default();
        tracing::info!(id = %id, "simulated disconnect");
        Ok(())
    }

    async fn services(&self, id: &PeripheralId) -> Result<Vec<ServiceDescriptor>, TransportError> {
        self.discover(id)
            .map_err(|err| err.during("service discovery"))
    }

    async fn start_notifications(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), TransportError> {
        self.subscribe(id, service, characteristic, frames)
            .map_err(|err| err.during("subscribe"))
    }

    async fn write(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.receive(id, service, characteristic, bytes)
            .map_err(|err| err.during("write"))
    }

    async fn read_signal_strength(&self, id: &PeripheralId) -> Result<i16, TransportError> {
        self.connected_link(id)
            .map(|_| self.options.rssi)
            .map_err(|err| err.during("read signal strength"))
    }

    async fn connected_peripherals(&self) -> Result<Vec<ScannedPeripheral>, TransportError> {
        let connected = self.link().connected;
        Ok(if connected {
            vec![self.advertisement()]
        } else {
            Vec::new()
        })
    }
}

impl Drop for VirtualTransport {
    fn drop(&mut self) {
        self.replace_advertiser(None);
    }
}
