//! Scan session: one discovery pass over nearby peripherals.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use stimlink_domain::error::StimError;
use stimlink_domain::scan::{ScanResults, ScanState, ScannedPeripheral};

use crate::ports::{ScanOptions, Transport};

const ADVERTISEMENT_BUFFER: usize = 64;

/// Drives [`Transport::scan`] and accumulates what it reports.
pub struct ScanSession<T> {
    transport: Arc<T>,
    options: ScanOptions,
    state: ScanState,
    results: ScanResults,
    advertisements: Option<mpsc::Receiver<ScannedPeripheral>>,
}

impl<T: Transport> ScanSession<T> {
    /// Create a stopped session reporting duplicate advertisements.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_options(transport, ScanOptions::default())
    }

    /// Create a stopped session with explicit scan options.
    pub fn with_options(transport: Arc<T>, options: ScanOptions) -> Self {
        Self {
            transport,
            options,
            state: ScanState::Stopped,
            results: ScanResults::new(),
            advertisements: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Everything seen since the last [`start`](Self::start).
    #[must_use]
    pub fn results(&self) -> &ScanResults {
        &self.results
    }

    /// Start scanning. Ignored unless the session is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ScanStartFailed`] when the transport rejects the
    /// request; the session is back to [`ScanState::Stopped`] by then.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), StimError> {
        if self.state != ScanState::Stopped {
            tracing::debug!(state = ?self.state, "scan already running, ignoring start");
            return Ok(());
        }
        self.state = ScanState::Starting;
        self.results.clear();

        let (tx, rx) = mpsc::channel(ADVERTISEMENT_BUFFER);
        match self.transport.scan(self.options.clone(), tx).await {
            Ok(()) => {
                self.advertisements = Some(rx);
                self.state = ScanState::Started;
                tracing::info!("scan started");
                Ok(())
            }
            Err(err) => {
                self.state = ScanState::Stopped;
                tracing::warn!(%err, "scan rejected");
                Err(StimError::ScanStartFailed(err))
            }
        }
    }

    /// Record an advertisement. Ignored unless the session is started.
    pub fn on_advertisement(&mut self, advertisement: ScannedPeripheral) {
        if self.state != ScanState::Started {
            tracing::debug!(id = %advertisement.id, "advertisement outside of a scan, dropped");
            return;
        }
        let entry = self.results.upsert(advertisement);
        tracing::trace!(id = %entry.id, rssi = ?entry.signal_strength, "advertisement");
    }

    /// Wait for the next advertisement and record it.
    ///
    /// Returns `false` once no more advertisements can arrive.
    pub async fn next(&mut self) -> bool {
        let Some(rx) = self.advertisements.as_mut() else {
            return false;
        };
        match rx.recv().await {
            Some(advertisement) => {
                self.on_advertisement(advertisement);
                true
            }
            None => {
                self.advertisements = None;
                false
            }
        }
    }

    /// Record advertisements for `duration`, or until the transport closes
    /// the channel.
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        while let Ok(true) = tokio::time::timeout_at(deadline, self.next()).await {}
    }

    /// Stop scanning. Ignored unless the session is started.
    ///
    /// The session always ends up stopped with its results cleared, so read
    /// [`results`](Self::results) before calling this.
    ///
    /// # Errors
    ///
    /// Returns [`StimError::ScanStopFailed`] when the transport reports a
    /// failure; the state is already settled by then.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), StimError> {
        if self.state != ScanState::Started {
            tracing::debug!(state = ?self.state, "no scan running, ignoring stop");
            return Ok(());
        }
        self.state = ScanState::Stopping;
        let outcome = self.transport.stop_scan().await;

        self.advertisements = None;
        self.results.clear();
        self.state = ScanState::Stopped;

        outcome.map_err(|err| {
            tracing::warn!(%err, "scan stop reported a failure");
            StimError::ScanStopFailed(err)
        })?;
        tracing::info!("scan stopped");
        Ok(())
    }
}
