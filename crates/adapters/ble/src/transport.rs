//! btleplug implementation of the [`Transport`] port.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use stimlink_app::ports::{ScanOptions, ServiceDescriptor, Transport};
use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::scan::ScannedPeripheral;

use crate::advertisement;
use crate::config::BleConfig;
use crate::error::BleError;

/// Background tasks keyed by peripheral, aborted when replaced or removed.
#[derive(Default)]
struct Tasks(Mutex<HashMap<PeripheralId, JoinHandle<()>>>);

impl Tasks {
    fn replace(&self, id: PeripheralId, task: JoinHandle<()>) {
        let previous = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel(&self, id: &PeripheralId) {
        let task = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        let tasks = self.0.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

/// [`Transport`] over the host Bluetooth stack.
///
/// Peripheral ids are the textual form of btleplug's platform id. One
/// disconnect watcher and one notification forwarder run per connected
/// peripheral; both stop on an explicit [`Transport::disconnect`].
pub struct BtleplugTransport {
    _manager: Manager,
    central: Adapter,
    config: BleConfig,
    scan_task: Mutex<Option<JoinHandle<()>>>,
    watchers: Tasks,
    listeners: Tasks,
}

impl BtleplugTransport {
    /// Open the host adapter selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when there is no such adapter, or
    /// [`BleError::Btle`] when the stack cannot be reached.
    pub async fn new(config: BleConfig) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleError::NotAvailable)?;
        tracing::info!(adapter_index = config.adapter_index, "BLE adapter ready");
        Ok(Self {
            _manager: manager,
            central,
            config,
            scan_task: Mutex::new(None),
            watchers: Tasks::default(),
            listeners: Tasks::default(),
        })
    }

    async fn peripheral(&self, id: &PeripheralId) -> Result<Peripheral, BleError> {
        self.central
            .peripherals()
            .await?
            .into_iter()
            .find(|peripheral| peripheral.id().to_string() == id.as_str())
            .ok_or_else(|| BleError::UnknownPeripheral(id.clone()))
    }

    fn replace_scan_task(&self, task: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(
            &mut *self.scan_task.lock().unwrap_or_else(PoisonError::into_inner),
            task,
        );
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn start_scan(
        &self,
        options: ScanOptions,
        results: mpsc::Sender<ScannedPeripheral>,
    ) -> Result<(), BleError> {
        let mut events = self.central.events().await?;
        let allow_duplicates = options.allow_duplicates;
        let services = if options.services.is_empty() {
            self.config.scan_services.clone()
        } else {
            options.services
        };
        self.central.start_scan(ScanFilter { services }).await?;

        let central = self.central.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) => id,
                    CentralEvent::DeviceUpdated(id) if allow_duplicates => id,
                    _ => continue,
                };
                let Ok(peripheral) = central.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(properties)) = peripheral.properties().await else {
                    continue;
                };
                let found = advertisement::scanned(PeripheralId::new(id.to_string()), &properties);
                if results.send(found).await.is_err() {
                    break;
                }
            }
        });
        self.replace_scan_task(Some(task));
        Ok(())
    }

    async fn halt_scan(&self) -> Result<(), BleError> {
        self.replace_scan_task(None);
        self.central.stop_scan().await?;
        Ok(())
    }

    async fn open(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        // Subscribe first so a drop right after connecting is not missed.
        let mut events = self.central.events().await?;
        peripheral.connect().await?;

        let target = peripheral.id();
        let reported = id.clone();
        let watcher = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if matches!(&event, CentralEvent::DeviceDisconnected(gone) if *gone == target) {
                    tracing::debug!(id = %reported, "disconnect event from the stack");
                    let _ = disconnects.send(reported).await;
                    break;
                }
            }
        });
        self.watchers.replace(id.clone(), watcher);
        Ok(())
    }

    async fn close(&self, id: &PeripheralId) -> Result<(), BleError> {
        self.watchers.cancel(id);
        self.listeners.cancel(id);
        self.peripheral(id).await?.disconnect().await?;
        Ok(())
    }

    async fn discover(&self, id: &PeripheralId) -> Result<Vec<ServiceDescriptor>, BleError> {
        let peripheral = self.peripheral(id).await?;
        peripheral.discover_services().await?;
        Ok(peripheral
            .services()
            .into_iter()
            .map(|service| ServiceDescriptor { uuid: service.uuid })
            .collect())
    }

    async fn subscribe(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        let target = find_characteristic(&peripheral, service, characteristic)?;
        let mut notifications = peripheral.notifications().await?;
        peripheral.subscribe(&target).await?;

        let task = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != characteristic {
                    continue;
                }
                if frames.send(notification.value).await.is_err() {
                    break;
                }
            }
        });
        self.listeners.replace(id.clone(), task);
        Ok(())
    }

    async fn write_with_response(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        let target = find_characteristic(&peripheral, service, characteristic)?;
        peripheral
            .write(&target, bytes, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn rssi(&self, id: &PeripheralId) -> Result<i16, BleError> {
        self.peripheral(id)
            .await?
            .properties()
            .await?
            .and_then(|properties| properties.rssi)
            .ok_or(BleError::NoSignalStrength)
    }

    async fn connected(&self) -> Result<Vec<ScannedPeripheral>, BleError> {
        let mut connected = Vec::new();
        for peripheral in self.central.peripherals().await? {
            if !peripheral.is_connected().await? {
                continue;
            }
            let properties = peripheral.properties().await?.unwrap_or_default();
            let id = PeripheralId::new(peripheral.id().to_string());
            connected.push(advertisement::scanned(id, &properties));
        }
        Ok(connected)
    }
}

/// Find a GATT characteristic of `service` on a peripheral that has already
/// discovered its services.
fn find_characteristic(
    peripheral: &Peripheral,
    service: uuid::Uuid,
    uuid: uuid::Uuid,
) -> Result<Characteristic, BleError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.service_uuid == service && c.uuid == uuid)
        .ok_or(BleError::CharacteristicNotFound { uuid })
}

impl Transport for BtleplugTransport {
    async fn scan(
        &self,
        options: ScanOptions,
        results: mpsc::Sender<ScannedPeripheral>,
    ) -> Result<(), TransportError> {
        self.start_scan(options, results)
            .await
            .map_err(|err| err.during("scan"))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.halt_scan().await.map_err(|err| err.during("stop scan"))
    }

    async fn connect(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> Result<(), TransportError> {
        self.open(id, disconnects)
            .await
            .map_err(|err| err.during("connect"))
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), TransportError> {
        self.close(id).await.map_err(|err| err.during("disconnect"))
    }

    async fn services(&self, id: &PeripheralId) -> Result<Vec<ServiceDescriptor>, TransportError> {
        self.discover(id)
            .await
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
            .await
            .map_err(|err| err.during("subscribe"))
    }

    async fn write(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.write_with_response(id, service, characteristic, bytes)
            .await
            .map_err(|err| err.during("write"))
    }

    async fn read_signal_strength(&self, id: &PeripheralId) -> Result<i16, TransportError> {
        self.rssi(id)
            .await
            .map_err(|err| err.during("read signal strength"))
    }

    async fn connected_peripherals(&self) -> Result<Vec<ScannedPeripheral>, TransportError> {
        self.connected()
            .await
            .map_err(|err| err.during("list connected peripherals"))
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        self.replace_scan_task(None);
    }
}
