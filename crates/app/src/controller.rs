//! Device controller: the single owner of the session state.
//!
//! One tokio task processes one queue. User commands (select, disconnect,
//! send), outcomes of spawned connect/disconnect attempts, decoded frames,
//! link losses and signal readings all arrive on that queue, so every
//! [`ConnectionState`] transition is applied in arrival order by the same
//! code path. Outcomes that refer to a peripheral which is no longer the
//! selected one are ignored.
//!
//! The UI side talks to the controller through a cloneable
//! [`DeviceHandle`] and observes it through a `watch` of
//! [`SessionSnapshot`] plus the [`SessionEvent`]s handed to the
//! [`EventPublisher`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use stimlink_domain::config::DeviceConfig;
use stimlink_domain::edit::PendingEdit;
use stimlink_domain::error::StimError;
use stimlink_domain::event::{SessionEvent, SessionSnapshot};
use stimlink_domain::id::PeripheralId;
use stimlink_domain::selection::{ConnectionState, SelectionEvent};

use crate::connection::{self, Connection, SessionSignal};
use crate::ports::{EventPublisher, Transport};
use crate::settings::SessionSettings;
use crate::signal::{SignalPoller, SignalReading};

const INBOX_CAPACITY: usize = 32;

enum Message<T> {
    Select(PeripheralId),
    Disconnect,
    SendConfig {
        config: DeviceConfig,
        reply: oneshot::Sender<Result<(), StimError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
    ConnectOutcome {
        id: PeripheralId,
        result: Result<Connection<T>, StimError>,
    },
    DisconnectFinished {
        id: PeripheralId,
        result: Result<(), StimError>,
    },
    Signal(SessionSignal),
    SignalStrength(SignalReading),
}

impl<T> From<SessionSignal> for Message<T> {
    fn from(signal: SessionSignal) -> Self {
        Self::Signal(signal)
    }
}

impl<T> From<SignalReading> for Message<T> {
    fn from(reading: SignalReading) -> Self {
        Self::SignalStrength(reading)
    }
}

/// Actor owning the [`ConnectionState`], the live [`Connection`] and the
/// [`SignalPoller`].
///
/// The task ends on [`DeviceHandle::shutdown`], or once every handle is gone
/// and no connection remains.
pub struct DeviceController<T, P> {
    transport: Arc<T>,
    publisher: P,
    settings: SessionSettings,
    inbox: mpsc::Receiver<Message<T>>,
    outbox: mpsc::WeakSender<Message<T>>,
    state: ConnectionState,
    signal_strength: Option<i16>,
    connection: Option<Connection<T>>,
    /// Signals of the attempt in flight, replayed once it has succeeded.
    deferred: Vec<SessionSignal>,
    poller: Option<SignalPoller>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl<T, P> DeviceController<T, P>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Spawn the controller task and return a handle to it.
    pub fn spawn(
        transport: Arc<T>,
        publisher: P,
        settings: SessionSettings,
    ) -> (DeviceHandle<T>, JoinHandle<()>) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let controller = Self {
            transport,
            publisher,
            settings,
            inbox,
            outbox: sender.downgrade(),
            state: ConnectionState::Idle,
            signal_strength: None,
            connection: None,
            deferred: Vec::new(),
            poller: None,
            snapshot,
        };
        let task = tokio::spawn(controller.run());
        let handle = DeviceHandle {
            sender,
            snapshot: snapshot_rx,
        };
        (handle, task)
    }

    async fn run(mut self) {
        tracing::debug!("device controller started");
        while let Some(message) = self.inbox.recv().await {
            if let Message::Shutdown { reply } = message {
                self.inbox.close();
                self.close().await;
                let _ = reply.send(());
                return;
            }
            self.handle(message).await;
        }
        self.close().await;
    }

    async fn handle(&mut self, message: Message<T>) {
        match message {
            Message::Select(id) => self.select(id).await,
            Message::Disconnect => self.request_disconnect().await,
            Message::SendConfig { config, reply } => {
                let result = self.send_config(&config).await;
                if let Err(err) = &result {
                    self.publisher.publish(SessionEvent::failure(err)).await;
                }
                let _ = reply.send(result);
            }
            Message::ConnectOutcome { id, result } => self.on_connect_outcome(id, result).await,
            Message::DisconnectFinished { id, result } => {
                self.on_disconnect_finished(id, result).await;
            }
            Message::Signal(signal) => self.on_signal(signal).await,
            Message::SignalStrength(SignalReading { id, rssi }) => {
                if self.is_live(&id) {
                    self.signal_strength = Some(rssi);
                    self.publish_snapshot();
                    self.publisher
                        .publish(SessionEvent::SignalStrength { id, rssi })
                        .await;
                }
            }
            Message::Shutdown { .. } => {}
        }
    }

    fn is_live(&self, id: &PeripheralId) -> bool {
        self.state.is_connected() && self.state.is_selected(id)
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn select(&mut self, id: PeripheralId) {
        if !self.state.can_select() {
            tracing::debug!(state = %self.state, "selection ignored while busy");
            return;
        }
        let Some(outbox) = self.outbox.upgrade() else {
            return;
        };
        self.deferred.clear();
        self.apply(SelectionEvent::SelectAndConnect(id.clone()))
            .await;

        let transport = Arc::clone(&self.transport);
        let settings = self.settings.clone();
        tokio::spawn(async move {
            let result = connection::establish(transport, id.clone(), &settings, outbox.clone()).await;
            if let Err(mpsc::error::SendError(Message::ConnectOutcome {
                result: Ok(orphan),
                ..
            })) = outbox.send(Message::ConnectOutcome { id, result }).await
            {
                let _ = orphan.disconnect().await;
            }
        });
    }

    async fn request_disconnect(&mut self) {
        match &self.state {
            ConnectionState::Connected { .. } => {
                self.apply(SelectionEvent::RequestDisconnect).await;
                match self.connection.take() {
                    Some(live) => self.spawn_disconnect(live),
                    None => self.apply(SelectionEvent::DisconnectCompleted).await,
                }
            }
            // Torn down once the in-flight attempt reports back.
            ConnectionState::Connecting { .. } => {
                self.apply(SelectionEvent::RequestDisconnect).await;
            }
            _ => tracing::debug!(state = %self.state, "nothing to disconnect"),
        }
    }

    fn spawn_disconnect(&self, live: Connection<T>) {
        let Some(outbox) = self.outbox.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let id = live.id().clone();
            let result = live.disconnect().await;
            let _ = outbox.send(Message::DisconnectFinished { id, result }).await;
        });
    }

    async fn send_config(&self, config: &DeviceConfig) -> Result<(), StimError> {
        match (&self.state, &self.connection) {
            (ConnectionState::Connected { .. }, Some(live)) => live.write_config(config).await,
            _ => Err(StimError::NotConnected),
        }
    }

    async fn on_connect_outcome(
        &mut self,
        id: PeripheralId,
        result: Result<Connection<T>, StimError>,
    ) {
        let selected = self.state.is_selected(&id);
        let connecting = selected && matches!(self.state, ConnectionState::Connecting { .. });
        let abandoned = selected && matches!(self.state, ConnectionState::Disconnecting { .. });
        match result {
            Ok(live) if connecting => {
                self.connection = Some(live);
                self.apply(SelectionEvent::ConnectSucceeded).await;
                for signal in std::mem::take(&mut self.deferred) {
                    self.on_signal(signal).await;
                }
            }
            Err(err) if connecting => {
                self.deferred.clear();
                self.apply(SelectionEvent::ConnectFailed).await;
                self.publisher.publish(SessionEvent::failure(&err)).await;
            }
            Ok(live) if abandoned => {
                tracing::info!(id = %id, "connected after disconnect was requested, tearing down");
                self.deferred.clear();
                self.spawn_disconnect(live);
            }
            Err(err) if abandoned => {
                tracing::debug!(id = %id, %err, "abandoned attempt failed");
                self.deferred.clear();
                self.apply(SelectionEvent::DisconnectCompleted).await;
            }
            Ok(orphan) => {
                tracing::debug!(id = %id, "stale connect outcome, tearing down");
                tokio::spawn(async move {
                    let _ = orphan.disconnect().await;
                });
            }
            Err(_) => tracing::debug!(id = %id, "stale connect failure ignored"),
        }
    }

    async fn on_disconnect_finished(&mut self, id: PeripheralId, result: Result<(), StimError>) {
        let disconnecting =
            matches!(&self.state, ConnectionState::Disconnecting { id: current, .. } if *current == id);
        if !disconnecting {
            tracing::debug!(id = %id, "stale disconnect outcome ignored");
            return;
        }
        if let Err(err) = &result {
            tracing::warn!(id = %id, %err, "disconnect did not complete cleanly");
        }
        self.apply(SelectionEvent::DisconnectCompleted).await;
        if let Err(err) = result {
            self.publisher.publish(SessionEvent::failure(&err)).await;
        }
    }

    async fn on_signal(&mut self, signal: SessionSignal) {
        let id = match &signal {
            SessionSignal::ConfigReceived { id, .. } | SessionSignal::Disconnected { id } => id,
        };
        // The device answers the handshake before the attempt reports back.
        if matches!(&self.state, ConnectionState::Connecting { id: current } if current == id) {
            tracing::debug!(id = %id, "deferring signal until the connection is up");
            self.deferred.push(signal);
            return;
        }
        if !self.is_live(id) {
            tracing::debug!(id = %id, "ignoring signal from stale link");
            return;
        }
        match signal {
            SessionSignal::ConfigReceived { config, .. } => {
                self.apply(SelectionEvent::ConfigReceived(config)).await;
            }
            SessionSignal::Disconnected { .. } => {
                self.connection = None;
                self.apply(SelectionEvent::UnexpectedDisconnect).await;
                self.publisher
                    .publish(SessionEvent::failure(&StimError::UnexpectedDisconnect))
                    .await;
            }
        }
    }

    /// Run `event` through the state machine and propagate the result.
    async fn apply(&mut self, event: SelectionEvent) {
        let from = self.state.clone();
        let to = from.clone().apply(event);
        if to == from {
            tracing::debug!(state = %from, "transition left state unchanged");
            return;
        }
        self.state = to.clone();

        if to.is_connected() {
            self.ensure_poller();
        } else {
            self.poller = None;
            self.signal_strength = None;
        }
        self.publish_snapshot();

        tracing::info!(from = %from, to = %to, "connection state changed");
        self.publisher
            .publish(SessionEvent::StateChanged { from, to })
            .await;
    }

    fn ensure_poller(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let (Some(id), Some(outbox)) = (self.state.id(), self.outbox.upgrade()) else {
            return;
        };
        self.poller = Some(SignalPoller::spawn(
            Arc::clone(&self.transport),
            id.clone(),
            self.settings.signal_poll_interval,
            outbox,
        ));
    }

    fn publish_snapshot(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            connection: self.state.clone(),
            signal_strength: self.signal_strength,
        });
    }

    async fn close(&mut self) {
        self.poller = None;
        if let Some(live) = self.connection.take() {
            self.apply(SelectionEvent::RequestDisconnect).await;
            if let Err(err) = live.disconnect().await {
                tracing::warn!(%err, "disconnect on shutdown failed");
            }
        }
        // An attempt or disconnect still in flight finishes on its own.
        self.apply(SelectionEvent::RequestDisconnect).await;
        self.apply(SelectionEvent::DisconnectCompleted).await;
        tracing::debug!("device controller stopped");
    }
}

/// Cloneable front door of a [`DeviceController`].
pub struct DeviceHandle<T> {
    sender: mpsc::Sender<Message<T>>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl<T> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<T: Transport + 'static> DeviceHandle<T> {
    async fn send(&self, message: Message<T>) -> Result<(), StimError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| StimError::ControllerClosed)
    }

    /// Select `id` and connect to it. Ignored while another selection is
    /// in flight or connected.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ControllerClosed`] once the controller stopped.
    /// Connection failures are reported through the snapshot and events.
    pub async fn select_and_connect(&self, id: PeripheralId) -> Result<(), StimError> {
        self.send(Message::Select(id)).await
    }

    /// Disconnect the selected peripheral, or abandon the attempt in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ControllerClosed`] once the controller stopped.
    pub async fn request_disconnect(&self) -> Result<(), StimError> {
        self.send(Message::Disconnect).await
    }

    /// Write `config` to the connected device and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::NotConnected`] without a live connection, any
    /// error of [`Connection::write_config`], or
    /// [`StimError::ControllerClosed`].
    pub async fn send_config(&self, config: DeviceConfig) -> Result<(), StimError> {
        let (reply, outcome) = oneshot::channel();
        self.send(Message::SendConfig { config, reply }).await?;
        outcome.await.map_err(|_| StimError::ControllerClosed)?
    }

    /// Build a configuration from `edit` on top of the last known device
    /// configuration and send it.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::NotConnected`] before the first sync,
    /// [`StimError::Validation`] when the edit cannot be turned into a
    /// configuration, or any error of [`send_config`](Self::send_config).
    pub async fn send_edit(&self, edit: &PendingEdit) -> Result<(), StimError> {
        let base = self
            .snapshot()
            .connection
            .config()
            .copied()
            .ok_or(StimError::NotConnected)?;
        let config = edit.to_config(&base)?;
        self.send_config(config).await
    }

    /// Current view of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the session view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until the session view satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ControllerClosed`] if the controller stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, StimError> {
        let mut watcher = self.snapshot.clone();
        let snapshot = watcher
            .wait_for(predicate)
            .await
            .map_err(|_| StimError::ControllerClosed)?
            .clone();
        Ok(snapshot)
    }

    /// Stop the controller, disconnecting any live connection first.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ControllerClosed`] if it was already stopped.
    pub async fn shutdown(&self) -> Result<(), StimError> {
        let (reply, done) = oneshot::channel();
        self.send(Message::Shutdown { reply }).await?;
        done.await.map_err(|_| StimError::ControllerClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::testing::{FakeTransport, Script};
    use stimlink_domain::error::{ErrorKind, FrameError};
    use stimlink_domain::frame;
    use stimlink_domain::protocol::Command;

    fn device_config() -> DeviceConfig {
        DeviceConfig {
            timeout_ms: 1000,
            pulse_count: 1,
            pulse_width_us: 50,
            pulse_interval_us: 0,
            mid_value: 0,
            recycle_us: 200,
            tail_us: 0,
            electrode_currents: [2, -2, 0, 0, 0, 0, 0, 0],
        }
    }

    fn announcing() -> Script {
        Script {
            announce: Some(frame::encode(&device_config(), Command::Query).unwrap()),
            echo_writes: true,
            ..Script::default()
        }
    }

    struct Harness {
        transport: Arc<FakeTransport>,
        bus: InProcessEventBus,
        handle: DeviceHandle<FakeTransport>,
    }

    fn start(script: Script) -> Harness {
        let transport = Arc::new(FakeTransport::with(script));
        let bus = InProcessEventBus::new(64);
        let settings = SessionSettings {
            connect_timeout: Duration::from_millis(500),
            ..SessionSettings::default()
        };
        let (handle, _task) = DeviceController::spawn(Arc::clone(&transport), bus.clone(), settings);
        Harness {
            transport,
            bus,
            handle,
        }
    }

    fn dev1() -> PeripheralId {
        PeripheralId::new("dev1")
    }

    async fn synced(h: &Harness) -> SessionSnapshot {
        h.handle.select_and_connect(dev1()).await.unwrap();
        h.handle
            .wait_for(|s| s.connection.is_connected() && s.connection.config().is_some())
            .await
            .unwrap()
    }

    fn connect_calls(transport: &FakeTransport) -> usize {
        transport
            .calls()
            .iter()
            .filter(|call| call.starts_with("connect"))
            .count()
    }

    #[tokio::test]
    async fn should_connect_and_sync_configuration() {
        let h = start(announcing());

        let snapshot = synced(&h).await;

        assert_eq!(
            snapshot.connection,
            ConnectionState::Connected {
                id: dev1(),
                config: Some(device_config()),
            }
        );
    }

    #[tokio::test]
    async fn should_publish_state_changes_in_order() {
        let h = start(announcing());
        let mut events = h.bus.subscribe();

        synced(&h).await;

        let mut labels = Vec::new();
        while labels.len() < 3 {
            if let SessionEvent::StateChanged { to, .. } = events.recv().await.unwrap() {
                labels.push(to.label());
            }
        }
        assert_eq!(labels, vec!["connecting", "connected", "connected"]);
    }

    #[tokio::test]
    async fn should_allow_new_selection_after_failed_connect() {
        let h = start(Script {
            fail_connect: true,
            ..Script::default()
        });
        let mut events = h.bus.subscribe();

        h.handle.select_and_connect(dev1()).await.unwrap();
        let snapshot = h
            .handle
            .wait_for(|s| matches!(s.connection, ConnectionState::Disconnected { .. }))
            .await
            .unwrap();
        assert_eq!(
            snapshot.connection,
            ConnectionState::Disconnected {
                id: dev1(),
                config: None,
            }
        );
        loop {
            if let SessionEvent::Failure { kind, .. } = events.recv().await.unwrap() {
                assert_eq!(kind, ErrorKind::ConnectFailed);
                break;
            }
        }

        h.transport.script().fail_connect = false;
        h.handle.select_and_connect(dev1()).await.unwrap();
        h.handle
            .wait_for(|s| s.connection.is_connected())
            .await
            .unwrap();
        assert_eq!(connect_calls(&h.transport), 2);
    }

    #[tokio::test]
    async fn should_keep_configuration_after_unexpected_disconnect() {
        let h = start(announcing());
        synced(&h).await;

        h.transport.drop_link("dev1");

        let snapshot = h
            .handle
            .wait_for(|s| !s.connection.is_connected())
            .await
            .unwrap();
        assert_eq!(
            snapshot.connection,
            ConnectionState::Disconnected {
                id: dev1(),
                config: Some(device_config()),
            }
        );
        assert!(snapshot.signal_strength.is_none());
    }

    #[tokio::test]
    async fn should_ignore_selection_while_connected() {
        let h = start(announcing());
        synced(&h).await;

        h.handle
            .select_and_connect(PeripheralId::new("dev2"))
            .await
            .unwrap();
        h.handle.send_config(device_config()).await.unwrap();

        assert!(h.handle.snapshot().connection.is_selected(&dev1()));
        assert_eq!(connect_calls(&h.transport), 1);
    }

    #[tokio::test]
    async fn should_reject_send_without_connection() {
        let h = start(Script::default());

        let err = h.handle.send_config(device_config()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn should_update_configuration_from_device_echo() {
        let h = start(announcing());
        synced(&h).await;
        let mut updated = device_config();
        updated.electrode_currents = [5, -5, 0, 0, 0, 0, 0, 0];

        h.handle.send_config(updated).await.unwrap();

        let snapshot = h
            .handle
            .wait_for(|s| s.connection.config() == Some(&updated))
            .await
            .unwrap();
        assert!(snapshot.connection.is_connected());
    }

    #[tokio::test]
    async fn should_block_out_of_range_write() {
        let h = start(announcing());
        synced(&h).await;
        let writes_before = h.transport.script().writes.len();
        let mut config = device_config();
        config.electrode_currents[3] = 200;

        let err = h.handle.send_config(config).await.unwrap_err();

        assert!(matches!(
            err,
            StimError::Frame(FrameError::OutOfRange { electrode: 3, .. })
        ));
        assert_eq!(h.transport.script().writes.len(), writes_before);
    }

    #[tokio::test]
    async fn should_send_pending_edit_on_top_of_device_configuration() {
        let h = start(announcing());
        let snapshot = synced(&h).await;
        let base = *snapshot.connection.config().unwrap();
        let mut edit = PendingEdit::from_config(&base);
        edit.set_current(0, 4).unwrap();
        edit.set_current(1, -4).unwrap();

        h.handle.send_edit(&edit).await.unwrap();

        let sent = h.transport.script().writes.last().unwrap().clone();
        let decoded = frame::decode(&sent).unwrap();
        assert_eq!(decoded.electrode_currents[..2], [4, -4]);
        assert_eq!(decoded.timeout_ms, base.timeout_ms);
    }

    #[tokio::test]
    async fn should_disconnect_and_keep_last_configuration() {
        let h = start(announcing());
        synced(&h).await;

        h.handle.request_disconnect().await.unwrap();

        let snapshot = h
            .handle
            .wait_for(|s| matches!(s.connection, ConnectionState::Disconnected { .. }))
            .await
            .unwrap();
        assert_eq!(snapshot.connection.config(), Some(&device_config()));
        assert_eq!(h.transport.calls().last().unwrap(), "disconnect dev1");
    }

    #[tokio::test(start_paused = true)]
    async fn should_settle_disconnect_requested_while_connecting() {
        let h = start(Script {
            hang_connect: true,
            ..Script::default()
        });
        h.handle.select_and_connect(dev1()).await.unwrap();
        h.handle
            .wait_for(|s| matches!(s.connection, ConnectionState::Connecting { .. }))
            .await
            .unwrap();

        h.handle.request_disconnect().await.unwrap();

        let snapshot = h
            .handle
            .wait_for(|s| matches!(s.connection, ConnectionState::Disconnected { .. }))
            .await
            .unwrap();
        assert_eq!(
            snapshot.connection,
            ConnectionState::Disconnected {
                id: dev1(),
                config: None,
            }
        );
    }

    #[tokio::test]
    async fn should_report_signal_strength_while_connected() {
        let h = start(Script {
            rssi: -63,
            ..announcing()
        });
        synced(&h).await;

        let snapshot = h
            .handle
            .wait_for(|s| s.signal_strength.is_some())
            .await
            .unwrap();

        assert_eq!(snapshot.signal_strength, Some(-63));
    }

    #[tokio::test]
    async fn should_disconnect_on_shutdown() {
        let h = start(announcing());
        synced(&h).await;

        h.handle.shutdown().await.unwrap();

        assert_eq!(h.transport.calls().last().unwrap(), "disconnect dev1");
        assert!(matches!(
            h.handle.snapshot().connection,
            ConnectionState::Disconnected { .. }
        ));
        let err = h.handle.select_and_connect(dev1()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ControllerClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn should_settle_snapshot_when_shut_down_while_connecting() {
        let h = start(Script {
            hang_connect: true,
            ..Script::default()
        });
        h.handle.select_and_connect(dev1()).await.unwrap();
        h.handle
            .wait_for(|s| matches!(s.connection, ConnectionState::Connecting { .. }))
            .await
            .unwrap();

        h.handle.shutdown().await.unwrap();

        assert_eq!(
            h.handle.snapshot().connection,
            ConnectionState::Disconnected {
                id: dev1(),
                config: None,
            }
        );
    }
}
