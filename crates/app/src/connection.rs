//! Connection session: bring a link to a stimulator up, keep it fed, tear
//! it down.
//!
//! The bring-up protocol runs strictly in order, without per-step retry:
//!
//! 1. transport connect
//! 2. service discovery, polled until the stack reports something
//! 3. check that the Nordic UART service is present
//! 4. subscribe to TX notifications and spawn the frame decoder
//! 5. write the handshake byte to RX, which makes the device report its
//!    configuration
//!
//! Anything the device sends afterwards surfaces as a [`SessionSignal`] on
//! the channel handed to [`establish`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stimlink_domain::config::DeviceConfig;
use stimlink_domain::error::{StimError, TransportError};
use stimlink_domain::frame;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::protocol::{Command, RX_CHAR, TX_CHAR, UART_SERVICE};

use crate::ports::{ServiceDescriptor, Transport};
use crate::settings::SessionSettings;

const FRAME_BUFFER: usize = 16;

/// Asynchronous news from a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The device notified a well-formed configuration frame.
    ConfigReceived { id: PeripheralId, config: DeviceConfig },
    /// The link dropped without being asked to.
    Disconnected { id: PeripheralId },
}

/// An established link to one peripheral.
///
/// Dropping it stops the relay tasks but leaves the radio link alone; call
/// [`disconnect`](Self::disconnect) for an orderly teardown.
pub struct Connection<T> {
    transport: Arc<T>,
    id: PeripheralId,
    write_timeout: Duration,
    disconnect_timeout: Duration,
    relays: Vec<JoinHandle<()>>,
}

/// Connect to `id` and run the bring-up protocol.
///
/// Decoded configuration frames and unexpected disconnects are sent to
/// `signals`, converted into whatever message type the receiver uses.
///
/// # Errors
///
/// - [`StimError::ConnectFailed`] when the transport refuses the connection
/// - [`StimError::ServiceDiscoveryTimeout`] when no service shows up in time
/// - [`StimError::RequiredServiceMissing`] when the UART service is absent
/// - [`StimError::Timeout`] when a single step exceeds its limit
/// - [`StimError::Transport`] for any other transport failure
///
/// In every case the link has been torn down (best effort) before return.
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn establish<T, S>(
    transport: Arc<T>,
    id: PeripheralId,
    settings: &SessionSettings,
    signals: mpsc::Sender<S>,
) -> Result<Connection<T>, StimError>
where
    T: Transport,
    S: From<SessionSignal> + Send + 'static,
{
    let mut connection = Connection {
        transport,
        id,
        write_timeout: settings.write_timeout,
        disconnect_timeout: settings.disconnect_timeout,
        relays: Vec::new(),
    };
    match connection.open(settings, signals).await {
        Ok(()) => {
            tracing::info!("connection established");
            Ok(connection)
        }
        Err(err) => {
            tracing::warn!(%err, "connection attempt failed");
            connection.teardown().await;
            Err(err)
        }
    }
}

/// Run a transport call under a deadline.
async fn bounded<V>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = Result<V, TransportError>>,
) -> Result<Result<V, TransportError>, StimError> {
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| StimError::Timeout { operation, after })
}

impl<T: Transport> Connection<T> {
    #[must_use]
    pub fn id(&self) -> &PeripheralId {
        &self.id
    }

    async fn open<S>(
        &mut self,
        settings: &SessionSettings,
        signals: mpsc::Sender<S>,
    ) -> Result<(), StimError>
    where
        S: From<SessionSignal> + Send + 'static,
    {
        let (disconnect_tx, disconnect_rx) = mpsc::channel(1);
        bounded(
            "connect",
            settings.connect_timeout,
            self.transport.connect(&self.id, disconnect_tx),
        )
        .await?
        .map_err(|source| StimError::ConnectFailed {
            id: self.id.clone(),
            source,
        })?;
        self.relays
            .push(tokio::spawn(relay_disconnect(disconnect_rx, signals.clone())));

        let services = self.discover(settings).await?;
        if !services.iter().any(|service| service.uuid == UART_SERVICE) {
            return Err(StimError::RequiredServiceMissing {
                service: UART_SERVICE,
            });
        }

        let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);
        bounded(
            "subscribe",
            settings.write_timeout,
            self.transport
                .start_notifications(&self.id, UART_SERVICE, TX_CHAR, frames_tx),
        )
        .await??;
        self.relays.push(tokio::spawn(relay_frames(
            self.id.clone(),
            frames_rx,
            signals,
        )));

        bounded(
            "handshake",
            settings.write_timeout,
            self.transport
                .write(&self.id, UART_SERVICE, RX_CHAR, &frame::handshake()),
        )
        .await??;
        Ok(())
    }

    async fn discover(
        &self,
        settings: &SessionSettings,
    ) -> Result<Vec<ServiceDescriptor>, StimError> {
        let attempts = settings.discovery_max_attempts;
        for attempt in 1..=attempts {
            let services = bounded(
                "service discovery",
                settings.connect_timeout,
                self.transport.services(&self.id),
            )
            .await??;
            if !services.is_empty() {
                tracing::debug!(attempt, count = services.len(), "services discovered");
                return Ok(services);
            }
            if attempt < attempts {
                tokio::time::sleep(settings.discovery_backoff).await;
            }
        }
        Err(StimError::ServiceDiscoveryTimeout { attempts })
    }

    /// Send `config` to the device.
    ///
    /// Local state is not touched: the device echoes the applied
    /// configuration through a notification.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::Frame`] when a current does not fit the wire
    /// format (nothing is written then), [`StimError::Timeout`] or
    /// [`StimError::Transport`] when the write itself fails.
    #[tracing::instrument(skip(self, config), fields(id = %self.id))]
    pub async fn write_config(&self, config: &DeviceConfig) -> Result<(), StimError> {
        let bytes = frame::encode(config, Command::SetConfig)?;
        bounded(
            "configuration write",
            self.write_timeout,
            self.transport.write(&self.id, UART_SERVICE, RX_CHAR, &bytes),
        )
        .await??;
        tracing::info!("configuration written");
        Ok(())
    }

    /// Close the link.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::Timeout`] or [`StimError::Transport`] when the
    /// transport could not confirm the disconnect.
    #[tracing::instrument(skip(self), fields(id = %self.id))]
    pub async fn disconnect(mut self) -> Result<(), StimError> {
        self.abort_relays();
        bounded(
            "disconnect",
            self.disconnect_timeout,
            self.transport.disconnect(&self.id),
        )
        .await??;
        tracing::info!("disconnected");
        Ok(())
    }

    async fn teardown(&mut self) {
        self.abort_relays();
        let outcome = bounded(
            "disconnect",
            self.disconnect_timeout,
            self.transport.disconnect(&self.id),
        )
        .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(id = %self.id, %err, "teardown disconnect failed"),
            Err(err) => tracing::warn!(id = %self.id, %err, "teardown disconnect failed"),
        }
    }
}

impl<T> Connection<T> {
    fn abort_relays(&mut self) {
        for relay in self.relays.drain(..) {
            relay.abort();
        }
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        self.abort_relays();
    }
}

async fn relay_disconnect<S: From<SessionSignal>>(
    mut disconnects: mpsc::Receiver<PeripheralId>,
    signals: mpsc::Sender<S>,
) {
    if let Some(id) = disconnects.recv().await {
        tracing::info!(id = %id, "peripheral dropped the link");
        let _ = signals.send(SessionSignal::Disconnected { id }.into()).await;
    }
}

async fn relay_frames<S: From<SessionSignal>>(
    id: PeripheralId,
    mut frames: mpsc::Receiver<Vec<u8>>,
    signals: mpsc::Sender<S>,
) {
    while let Some(bytes) = frames.recv().await {
        match frame::decode(&bytes) {
            Ok(config) => {
                let signal = SessionSignal::ConfigReceived {
                    id: id.clone(),
                    config,
                };
                if signals.send(signal.into()).await.is_err() {
                    break;
                }
            }
            Err(err) => tracing::debug!(id = %id, %err, "dropping malformed frame"),
        }
    }
}

/// Disconnect every peripheral named `name` the OS still holds a link to.
///
/// Returns how many were released. Individual failures are logged and
/// skipped.
///
/// # Errors
///
/// Returns [`StimError::Transport`] when the connected peripherals cannot
/// be listed.
#[tracing::instrument(skip(transport))]
pub async fn release_stale_connections<T: Transport>(
    transport: &T,
    name: &str,
) -> Result<usize, StimError> {
    let connected = transport.connected_peripherals().await?;
    let mut released = 0;
    for peripheral in connected.iter().filter(|p| p.is_named(name)) {
        match transport.disconnect(&peripheral.id).await {
            Ok(()) => {
                tracing::info!(id = %peripheral.id, "released stale connection");
                released += 1;
            }
            Err(err) => tracing::warn!(id = %peripheral.id, %err, "could not release stale connection"),
        }
    }
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, Script};
    use stimlink_domain::error::{ErrorKind, FrameError};
    use stimlink_domain::protocol::FRAME_LEN;
    use stimlink_domain::scan::ScannedPeripheral;

    fn device_config() -> DeviceConfig {
        DeviceConfig {
            timeout_ms: 1000,
            pulse_count: 1,
            pulse_width_us: 50,
            pulse_interval_us: 0,
            mid_value: 0,
            recycle_us: 200,
            tail_us: 0,
            electrode_currents: [1, -1, 0, 0, 0, 0, 0, 0],
        }
    }

    fn announcing(config: &DeviceConfig) -> Script {
        Script {
            announce: Some(frame::encode(config, Command::Query).unwrap()),
            ..Script::default()
        }
    }

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            connect_timeout: Duration::from_millis(100),
            ..SessionSettings::default()
        }
    }

    async fn connect(
        script: Script,
    ) -> (
        Arc<FakeTransport>,
        Result<Connection<FakeTransport>, StimError>,
        mpsc::Receiver<SessionSignal>,
    ) {
        let transport = Arc::new(FakeTransport::with(script));
        let (tx, rx) = mpsc::channel(8);
        let outcome = establish(
            Arc::clone(&transport),
            PeripheralId::new("dev1"),
            &fast_settings(),
            tx,
        )
        .await;
        (transport, outcome, rx)
    }

    #[tokio::test]
    async fn should_run_protocol_steps_in_order() {
        let (transport, outcome, _rx) = connect(Script::default()).await;

        assert!(outcome.is_ok());
        assert_eq!(
            transport.calls(),
            vec!["connect dev1", "services dev1", "subscribe dev1", "write dev1 1"]
        );
        assert_eq!(transport.script().writes, vec![vec![0u8]]);
    }

    #[tokio::test]
    async fn should_report_config_announced_after_handshake() {
        let config = device_config();
        let (_transport, outcome, mut rx) = connect(announcing(&config)).await;
        let connection = outcome.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionSignal::ConfigReceived {
                id: connection.id().clone(),
                config,
            }
        );
    }

    #[tokio::test]
    async fn should_drop_malformed_frames_silently() {
        let config = device_config();
        let (transport, outcome, mut rx) = connect(Script::default()).await;
        let _connection = outcome.unwrap();

        transport.notify(&[1, 2, 3]);
        transport.notify(&frame::encode(&config, Command::Query).unwrap());

        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionSignal::ConfigReceived { config: received, .. } if received == config
        ));
    }

    #[tokio::test]
    async fn should_fail_and_tear_down_when_connect_is_refused() {
        let (transport, outcome, _rx) = connect(Script {
            fail_connect: true,
            ..Script::default()
        })
        .await;

        let err = outcome.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConnectFailed);
        assert_eq!(transport.calls(), vec!["connect dev1", "disconnect dev1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_a_hanging_connect() {
        let (transport, outcome, _rx) = connect(Script {
            hang_connect: true,
            ..Script::default()
        })
        .await;

        let err = outcome.err().unwrap();
        assert!(matches!(
            err,
            StimError::Timeout {
                operation: "connect",
                ..
            }
        ));
        assert_eq!(transport.calls().last().unwrap(), "disconnect dev1");
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_discovery_until_services_appear() {
        let (transport, outcome, _rx) = connect(Script {
            empty_service_rounds: 3,
            ..Script::default()
        })
        .await;

        assert!(outcome.is_ok());
        let rounds = transport
            .calls()
            .iter()
            .filter(|call| call.starts_with("services"))
            .count();
        assert_eq!(rounds, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn should_give_up_discovery_after_max_attempts() {
        let (transport, outcome, _rx) = connect(Script {
            empty_service_rounds: u32::MAX,
            ..Script::default()
        })
        .await;

        assert!(matches!(
            outcome.err().unwrap(),
            StimError::ServiceDiscoveryTimeout { attempts: 25 }
        ));
        assert_eq!(transport.calls().last().unwrap(), "disconnect dev1");
    }

    #[tokio::test]
    async fn should_reject_device_without_uart_service() {
        let (transport, outcome, _rx) = connect(Script {
            services: vec![uuid::Uuid::from_u128(0x1800)],
            ..Script::default()
        })
        .await;

        let err = outcome.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RequiredServiceMissing);
        assert!(!transport.calls().iter().any(|c| c.starts_with("subscribe")));
        assert_eq!(transport.calls().last().unwrap(), "disconnect dev1");
    }

    #[tokio::test]
    async fn should_forward_unexpected_disconnect() {
        let (transport, outcome, mut rx) = connect(Script::default()).await;
        let _connection = outcome.unwrap();

        transport.drop_link("dev1");

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionSignal::Disconnected {
                id: PeripheralId::new("dev1")
            }
        );
    }

    #[tokio::test]
    async fn should_write_set_config_frame() {
        let (transport, outcome, _rx) = connect(Script::default()).await;
        let connection = outcome.unwrap();

        connection.write_config(&device_config()).await.unwrap();

        let writes = transport.script().writes.clone();
        let last = writes.last().unwrap();
        assert_eq!(last.len(), FRAME_LEN);
        assert_eq!(last[0], Command::SetConfig.code());
        assert_eq!(frame::decode(last).unwrap(), device_config());
    }

    #[tokio::test]
    async fn should_not_write_out_of_range_current() {
        let (transport, outcome, _rx) = connect(Script::default()).await;
        let connection = outcome.unwrap();
        let mut config = device_config();
        config.electrode_currents[3] = 200;

        let err = connection.write_config(&config).await.unwrap_err();

        assert!(matches!(
            err,
            StimError::Frame(FrameError::OutOfRange {
                electrode: 3,
                value: 200
            })
        ));
        assert_eq!(transport.script().writes.len(), 1);
    }

    #[tokio::test]
    async fn should_disconnect_on_request() {
        let (transport, outcome, _rx) = connect(Script::default()).await;

        outcome.unwrap().disconnect().await.unwrap();

        assert_eq!(transport.calls().last().unwrap(), "disconnect dev1");
    }

    #[tokio::test]
    async fn should_release_only_peripherals_with_matching_name() {
        let stale = |id: &str, name: &str| ScannedPeripheral {
            id: PeripheralId::new(id),
            name: Some(name.to_owned()),
            signal_strength: None,
        };
        let transport = FakeTransport::with(Script {
            connected: vec![
                stale("dev1", "HowlandStim"),
                stale("dev2", "Keyboard"),
                stale("dev3", "HowlandStim"),
            ],
            ..Script::default()
        });

        let released = release_stale_connections(&transport, "HowlandStim")
            .await
            .unwrap();

        assert_eq!(released, 2);
        assert_eq!(transport.calls(), vec!["disconnect dev1", "disconnect dev3"]);
    }
}
