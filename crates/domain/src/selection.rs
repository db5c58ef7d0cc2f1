//! Device selection state machine.
//!
//! Combines "which device is selected" with "what is its connection state"
//! and "what configuration is known". The whole application holds exactly
//! one [`ConnectionState`]; it only changes through [`transition`].
//!
//! | Current | Event | Next |
//! |---------|-------|------|
//! | Idle / Disconnected | `SelectAndConnect(id)` | Connecting(id) |
//! | Connecting(id) | `ConnectSucceeded` | Connected(id, none) |
//! | Connecting(id) | `ConnectFailed` | Disconnected(id, none) |
//! | Connecting(id) | `RequestDisconnect` | Disconnecting(id, none) |
//! | Connected(id, _) | `RequestDisconnect` | Disconnecting(id, config) |
//! | Connected(id, _) | `ConfigReceived(cfg)` | Connected(id, cfg) |
//! | Disconnecting(id, cfg) | `DisconnectCompleted` | Disconnected(id, cfg) |
//! | Connected(id, cfg) | `UnexpectedDisconnect` | Disconnected(id, cfg) |
//!
//! Any other pair leaves the state untouched: async callbacks may arrive
//! late or out of order and are simply ignored.

use serde::Serialize;

use crate::config::DeviceConfig;
use crate::id::PeripheralId;

/// Connection lifecycle of the selected peripheral.
///
/// `config` is `None` until the first notification frame has been decoded;
/// that means "awaiting first sync", never "all zero".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting {
        id: PeripheralId,
    },
    Connected {
        id: PeripheralId,
        config: Option<DeviceConfig>,
    },
    Disconnecting {
        id: PeripheralId,
        config: Option<DeviceConfig>,
    },
    Disconnected {
        id: PeripheralId,
        config: Option<DeviceConfig>,
    },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    SelectAndConnect(PeripheralId),
    ConnectSucceeded,
    ConnectFailed,
    RequestDisconnect,
    ConfigReceived(DeviceConfig),
    DisconnectCompleted,
    UnexpectedDisconnect,
}

/// Apply `event` to `state`.
///
/// Illegal pairs return `state` unchanged.
#[must_use]
pub fn transition(state: ConnectionState, event: SelectionEvent) -> ConnectionState {
    use ConnectionState as S;
    use SelectionEvent as E;

    match (state, event) {
        (S::Idle | S::Disconnected { .. }, E::SelectAndConnect(id)) => S::Connecting { id },
        (S::Connecting { id }, E::ConnectSucceeded) => S::Connected { id, config: None },
        (S::Connecting { id }, E::ConnectFailed) => S::Disconnected { id, config: None },
        (S::Connecting { id }, E::RequestDisconnect) => S::Disconnecting { id, config: None },
        (S::Connected { id, config }, E::RequestDisconnect) => S::Disconnecting { id, config },
        (S::Connected { id, .. }, E::ConfigReceived(cfg)) => S::Connected {
            id,
            config: Some(cfg),
        },
        (S::Disconnecting { id, config }, E::DisconnectCompleted)
        | (S::Connected { id, config }, E::UnexpectedDisconnect) => S::Disconnected { id, config },
        (state, _) => state,
    }
}

impl ConnectionState {
    /// Method form of [`transition`].
    #[must_use]
    pub fn apply(self, event: SelectionEvent) -> Self {
        transition(self, event)
    }

    /// The selected peripheral, if any.
    #[must_use]
    pub fn id(&self) -> Option<&PeripheralId> {
        match self {
            Self::Idle => None,
            Self::Connecting { id }
            | Self::Connected { id, .. }
            | Self::Disconnecting { id, .. }
            | Self::Disconnected { id, .. } => Some(id),
        }
    }

    /// Last configuration confirmed by the device, if any.
    #[must_use]
    pub fn config(&self) -> Option<&DeviceConfig> {
        match self {
            Self::Idle | Self::Connecting { .. } => None,
            Self::Connected { config, .. }
            | Self::Disconnecting { config, .. }
            | Self::Disconnected { config, .. } => config.as_ref(),
        }
    }

    /// Whether `id` is the selected peripheral.
    #[must_use]
    pub fn is_selected(&self, id: &PeripheralId) -> bool {
        self.id() == Some(id)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Whether a new selection may be started (nothing in flight).
    #[must_use]
    pub fn can_select(&self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected { .. })
    }

    /// Short lowercase label of the variant.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting { .. } => "connecting",
            Self::Connected { .. } => "connected",
            Self::Disconnecting { .. } => "disconnecting",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}({id})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}
