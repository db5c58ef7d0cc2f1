//! Scriptable in-memory [`Transport`] shared by the unit tests of this crate.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::protocol::{FRAME_LEN, UART_SERVICE};
use stimlink_domain::scan::ScannedPeripheral;

use crate::ports::{ScanOptions, ServiceDescriptor, Transport};

pub(crate) struct Script {
    pub fail_scan: bool,
    pub fail_stop_scan: bool,
    pub fail_connect: bool,
    pub hang_connect: bool,
    pub empty_service_rounds: u32,
    pub services: Vec<uuid::Uuid>,
    /// Frame pushed as a notification when the handshake byte is written.
    pub announce: Option<[u8; FRAME_LEN]>,
    /// Echo every full frame written back as a notification.
    pub echo_writes: bool,
    pub rssi: i16,
    pub connected: Vec<ScannedPeripheral>,
    pub calls: Vec<String>,
    pub writes: Vec<Vec<u8>>,
    pub scan_tx: Option<mpsc::Sender<ScannedPeripheral>>,
    pub frames_tx: Option<mpsc::Sender<Vec<u8>>>,
    pub disconnects_tx: Option<mpsc::Sender<PeripheralId>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            fail_scan: false,
            fail_stop_scan: false,
            fail_connect: false,
            hang_connect: false,
            empty_service_rounds: 0,
            services: vec![UART_SERVICE],
            announce: None,
            echo_writes: false,
            rssi: -50,
            connected: Vec::new(),
            calls: Vec::new(),
            writes: Vec::new(),
            scan_tx: None,
            frames_tx: None,
            disconnects_tx: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    script: Mutex<Script>,
}

impl FakeTransport {
    pub fn with(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn advertise(&self, id: &str, name: Option<&str>, rssi: Option<i16>) {
        let tx = self.script().scan_tx.clone().expect("scan not started");
        tx.try_send(ScannedPeripheral {
            id: PeripheralId::new(id),
            name: name.map(str::to_owned),
            signal_strength: rssi,
        })
        .expect("scan channel full");
    }

    pub fn notify(&self, bytes: &[u8]) {
        let tx = self.script().frames_tx.clone().expect("not subscribed");
        tx.try_send(bytes.to_vec()).expect("frame channel full");
    }

    pub fn drop_link(&self, id: &str) {
        let tx = self.script().disconnects_tx.take().expect("not connected");
        tx.try_send(PeripheralId::new(id))
            .expect("disconnect channel full");
    }

    fn record(&self, call: String) {
        self.script().calls.push(call);
    }
}

fn refused(operation: &'static str) -> TransportError {
    TransportError::new(operation, "refused by script")
}

impl Transport for FakeTransport {
    async fn scan(
        &self,
        _options: ScanOptions,
        results: mpsc::Sender<ScannedPeripheral>,
    ) -> Result<(), TransportError> {
        self.record("scan".to_owned());
        let mut script = self.script();
        if script.fail_scan {
            return Err(refused("scan"));
        }
        script.scan_tx = Some(results);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.record("stop_scan".to_owned());
        let mut script = self.script();
        script.scan_tx = None;
        if script.fail_stop_scan {
            return Err(refused("stop scan"));
        }
        Ok(())
    }

    async fn connect(
        &self,
        id: &PeripheralId,
        disconnects: mpsc::Sender<PeripheralId>,
    ) -> Result<(), TransportError> {
        self.record(format!("connect {id}"));
        let hang = {
            let mut script = self.script();
            if script.fail_connect {
                return Err(refused("connect"));
            }
            script.disconnects_tx = Some(disconnects);
            script.hang_connect
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), TransportError> {
        self.record(format!("disconnect {id}"));
        let mut script = self.script();
        script.disconnects_tx = None;
        script.frames_tx = None;
        Ok(())
    }

    async fn services(&self, id: &PeripheralId) -> Result<Vec<ServiceDescriptor>, TransportError> {
        self.record(format!("services {id}"));
        let mut script = self.script();
        if script.empty_service_rounds > 0 {
            script.empty_service_rounds -= 1;
            return Ok(Vec::new());
        }
        Ok(script
            .services
            .iter()
            .map(|uuid| ServiceDescriptor { uuid: *uuid })
            .collect())
    }

    async fn start_notifications(
        &self,
        id: &PeripheralId,
        _service: uuid::Uuid,
        _characteristic: uuid::Uuid,
        frames: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), TransportError> {
        self.record(format!("subscribe {id}"));
        self.script().frames_tx = Some(frames);
        Ok(())
    }

    async fn write(
        &self,
        id: &PeripheralId,
        _service: uuid::Uuid,
        _characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.record(format!("write {id} {}", bytes.len()));
        let mut script = self.script();
        script.writes.push(bytes.to_vec());
        let reply = if bytes == [0] {
            script.announce.map(|frame| frame.to_vec())
        } else if script.echo_writes && bytes.len() == FRAME_LEN {
            Some(bytes.to_vec())
        } else {
            None
        };
        if let (Some(reply), Some(tx)) = (reply, script.frames_tx.as_ref()) {
            let _ = tx.try_send(reply);
        }
        Ok(())
    }

    async fn read_signal_strength(&self, id: &PeripheralId) -> Result<i16, TransportError> {
        self.record(format!("rssi {id}"));
        Ok(self.script().rssi)
    }

    async fn connected_peripherals(&self) -> Result<Vec<ScannedPeripheral>, TransportError> {
        Ok(self.script().connected.clone())
    }
}
