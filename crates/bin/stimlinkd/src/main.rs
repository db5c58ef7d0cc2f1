//! # stimlinkd
//!
//! Composition root: loads configuration, installs logging, picks the
//! transport, then runs one device session.
//!
//! The session releases stale links, scans for the stimulator (unless an
//! explicit id is configured), connects, waits for the first configuration
//! report, optionally pushes the `[apply]` pattern, and stays connected
//! until interrupted or the link drops.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stimlink_adapter_ble::BtleplugTransport;
use stimlink_adapter_virtual::VirtualTransport;
use stimlink_app::connection::release_stale_connections;
use stimlink_app::controller::DeviceController;
use stimlink_app::event_bus::InProcessEventBus;
use stimlink_app::ports::Transport;
use stimlink_app::scan_session::ScanSession;
use stimlink_domain::config::{DeviceConfig, ELECTRODE_LABELS};
use stimlink_domain::edit::is_dirty;
use stimlink_domain::id::PeripheralId;
use stimlink_domain::selection::ConnectionState;

use crate::config::{Config, TransportKind};

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("no peripheral named {name} found within {secs}s")]
    NoDevice { name: String, secs: u64 },
    #[error("{id} disconnected before reporting its configuration")]
    NeverSynced { id: PeripheralId },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(transport = ?config.transport.kind, "starting stimlinkd");

    match config.transport.kind {
        TransportKind::Ble => {
            let transport = BtleplugTransport::new(config.ble.clone()).await?;
            run(Arc::new(transport), &config).await
        }
        TransportKind::Virtual => {
            let transport = VirtualTransport::new(config.virtual_device.clone());
            run(Arc::new(transport), &config).await
        }
    }
}

async fn run<T: Transport + 'static>(
    transport: Arc<T>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match release_stale_connections(transport.as_ref(), &config.scan.target_name).await {
        Ok(0) => {}
        Ok(released) => tracing::info!(released, "released stale connections"),
        Err(err) => tracing::warn!(%err, "could not list connected peripherals"),
    }

    let target = find_target(&transport, config).await?;

    let bus = InProcessEventBus::new(EVENT_BUS_CAPACITY);
    let event_log = tokio::spawn(log_events(bus.subscribe()));

    let (handle, controller) =
        DeviceController::spawn(Arc::clone(&transport), bus, config.session.settings());
    handle.select_and_connect(target.clone()).await?;

    let synced = tokio::select! {
        snapshot = handle.wait_for(|s| {
            s.connection.config().is_some()
                || matches!(s.connection, ConnectionState::Disconnected { .. })
        }) => snapshot?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted while connecting");
            handle.shutdown().await?;
            return Ok(());
        }
    };
    let Some(device_config) = synced.connection.config().copied() else {
        handle.shutdown().await?;
        return Err(RunError::NeverSynced { id: target }.into());
    };
    tracing::info!(
        device = target.short(),
        pulse_count = device_config.pulse_count,
        pulse_width_us = device_config.pulse_width_us,
        recycle_us = device_config.recycle_us,
        period_us = device_config.period_us(),
        currents = %labelled_currents(&device_config),
        "device configuration received"
    );
    if !device_config.currents_within_ui_range() {
        tracing::warn!(device = target.short(), "device runs currents beyond the editable range");
    }

    if let Some(apply) = &config.apply {
        let edit = apply.to_edit()?;
        if is_dirty(&synced.connection, &edit) {
            match handle.send_edit(&edit).await {
                Ok(()) => tracing::info!(device = target.short(), "stimulation pattern applied"),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(%err, "could not apply stimulation pattern, device keeps its own");
                }
                Err(err) => {
                    handle.shutdown().await?;
                    return Err(err.into());
                }
            }
        } else {
            tracing::info!(device = target.short(), "device already runs the configured pattern");
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, disconnecting"),
        lost = handle.wait_for(|s| !s.connection.is_connected()) => {
            let snapshot = lost?;
            tracing::warn!(state = %snapshot.connection, "link lost");
        }
    }

    handle.shutdown().await?;
    drop(handle);
    controller.await?;
    event_log.await?;
    tracing::info!("stimlinkd stopped");
    Ok(())
}

/// Resolve the peripheral to connect to: the configured id, or the
/// strongest advertiser carrying the target name.
async fn find_target<T: Transport>(
    transport: &Arc<T>,
    config: &Config,
) -> Result<PeripheralId, Box<dyn std::error::Error>> {
    if let Some(id) = &config.scan.device_id {
        tracing::info!(id = %id, "using configured peripheral, skipping scan");
        return Ok(PeripheralId::new(id.clone()));
    }

    let mut scan = ScanSession::new(Arc::clone(transport));
    scan.start().await?;
    scan.run_for(config.scan_duration()).await;
    let best = scan
        .results()
        .matching(&config.scan.target_name)
        .max_by_key(|p| p.signal_strength.unwrap_or(i16::MIN))
        .map(|p| p.id.clone());
    tracing::info!(seen = scan.results().len(), "scan finished");
    if let Err(err) = scan.stop().await {
        tracing::warn!(%err, "scan did not stop cleanly");
    }

    best.ok_or_else(|| {
        RunError::NoDevice {
            name: config.scan.target_name.clone(),
            secs: config.scan.duration_secs,
        }
        .into()
    })
}

/// Electrode currents as `A=+2 B=-2 ...`, in wire order.
fn labelled_currents(config: &DeviceConfig) -> String {
    ELECTRODE_LABELS
        .iter()
        .zip(config.electrode_currents)
        .map(|(label, current)| format!("{label}={current:+}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mirror every session event to the log as one JSON line.
async fn log_events(
    mut events: tokio::sync::broadcast::Receiver<stimlink_domain::event::SessionEvent>,
) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(target: "stimlinkd::events", "{json}"),
                Err(err) => tracing::warn!(%err, "could not serialise session event"),
            },
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
