//! Transport port: the BLE radio stack seen as an opaque capability provider.
//!
//! The core never talks to a radio directly. Adapters (btleplug, virtual)
//! implement [`Transport`]; every operation is asynchronous and addressed by
//! [`PeripheralId`]. Callbacks of the underlying stack are modelled as
//! channel senders handed over with the call that registers them.

use std::future::Future;

use tokio::sync::mpsc;

use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::scan::ScannedPeripheral;

/// Options for [`Transport::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report every advertisement, not only the first per peripheral, so
    /// signal strength stays fresh.
    pub allow_duplicates: bool,
    /// Restrict the scan to peripherals advertising these services.
    /// Empty means "everything".
    pub services: Vec<uuid::Uuid>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            allow_duplicates: true,
            services: Vec::new(),
        }
    }
}

/// A GATT service exposed by a connected peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub uuid: uuid::Uuid,
}

/// BLE capability provider.
///
/// Implementations must tolerate the receiving side of any sender being
/// dropped: a closed channel means nobody listens anymore.
pub trait Transport: Send + Sync {
    /// Start scanning. Resolves once the stack has accepted the request;
    /// each advertisement is then sent through `results`.
    fn scan(
        &self,
        options: ScanOptions,
        results: mpsc::Sender<ScannedPeripheral>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop the running scan.
    fn stop_scan(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Connect to `id`. If the link later drops without [`disconnect`]
    /// being called, the id is sent through `disconnects`.
    ///
    /// [`disconnect`]: Self::disconnect
    fn connect(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the link to `id`.
    fn disconnect(
        &self,
        id: &PeripheralId,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Services discovered so far on `id`. May legitimately be empty right
    /// after connecting.
    fn services(
        &self,
        id: &PeripheralId,
    ) -> impl Future<Output = Result<Vec<ServiceDescriptor>, TransportError>> + Send;

    /// Subscribe to notifications of `characteristic`; every notified value
    /// is sent through `frames`.
    fn start_notifications(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<Vec<u8>>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Write `bytes` to `characteristic` (with response).
    fn write(
        &self,
        id: &PeripheralId,
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Current signal strength of a connected peripheral, in dBm.
    fn read_signal_strength(
        &self,
        id: &PeripheralId,
    ) -> impl Future<Output = Result<i16, TransportError>> + Send;

    /// Peripherals the OS still holds a connection to.
    fn connected_peripherals(
        &self,
    ) -> impl Future<Output = Result<Vec<ScannedPeripheral>, TransportError>> + Send;
}
