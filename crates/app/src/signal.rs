//! Periodic signal-strength polling of the connected peripheral.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use stimlink_domain::id::PeripheralId;

use crate::ports::Transport;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// One RSSI sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalReading {
    pub id: PeripheralId,
    pub rssi: i16,
}

/// Background task reading the RSSI of one peripheral at a fixed period.
///
/// Lives exactly as long as the value: dropping it stops the polling.
pub struct SignalPoller {
    task: JoinHandle<()>,
}

impl SignalPoller {
    /// Start polling `id` every `period`; the first reading is taken
    /// immediately. Failed reads are skipped. A zero period polls every
    /// millisecond.
    pub fn spawn<T, S>(
        transport: Arc<T>,
        id: PeripheralId,
        period: Duration,
        sink: mpsc::Sender<S>,
    ) -> Self
    where
        T: Transport + 'static,
        S: From<SignalReading> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match transport.read_signal_strength(&id).await {
                    Ok(rssi) => {
                        let reading = SignalReading {
                            id: id.clone(),
                            rssi,
                        };
                        if sink.send(reading.into()).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::debug!(id = %id, %err, "signal strength unavailable"),
                }
            }
        });
        Self { task }
    }
}

impl Drop for SignalPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, Script};

    #[tokio::test(start_paused = true)]
    async fn should_poll_at_the_configured_period() {
        let transport = Arc::new(FakeTransport::with(Script {
            rssi: -42,
            ..Script::default()
        }));
        let (tx, mut rx) = mpsc::channel::<SignalReading>(4);
        let started = tokio::time::Instant::now();

        let _poller = SignalPoller::spawn(
            transport,
            PeripheralId::new("dev1"),
            Duration::from_secs(2),
            tx,
        );

        for _ in 0..3 {
            let reading = rx.recv().await.unwrap();
            assert_eq!(reading.rssi, -42);
            assert_eq!(reading.id.as_str(), "dev1");
        }
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_polling_with_zero_period() {
        let transport = Arc::new(FakeTransport::default());
        let (tx, mut rx) = mpsc::channel::<SignalReading>(4);

        let _poller = SignalPoller::spawn(transport, PeripheralId::new("dev1"), Duration::ZERO, tx);

        for _ in 0..2 {
            assert_eq!(rx.recv().await.unwrap().rssi, -50);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_polling_when_dropped() {
        let transport = Arc::new(FakeTransport::default());
        let (tx, mut rx) = mpsc::channel::<SignalReading>(4);
        let poller = SignalPoller::spawn(
            Arc::clone(&transport),
            PeripheralId::new("dev1"),
            Duration::from_secs(2),
            tx,
        );
        rx.recv().await.unwrap();

        drop(poller);

        assert!(rx.recv().await.is_none());
        let reads = transport.calls().len();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.calls().len(), reads);
    }
}
