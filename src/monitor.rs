use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::event::MonitorEvent;
use crate::power::{PowerReader, monitor::PowerMonitor};
use crate::shutdown::{ShutdownMonitor, journal::LogSource};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Composition root for the monitors: owns the power change detector, the
/// composite shutdown monitor and the event channel between them and the
/// alert sink.
///
/// Forwarding is fire-and-forget; a failed send is logged and leaves the
/// monitors untouched.
pub struct MonitorSet<R: PowerReader> {
    power: PowerMonitor<R>,
    shutdown: ShutdownMonitor,
    events: Arc<Mutex<mpsc::Receiver<MonitorEvent>>>,
    forward: Option<JoinHandle<()>>,
}

impl<R: PowerReader> MonitorSet<R> {
    pub fn new(reader: R, log_source: Arc<dyn LogSource>) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            power: PowerMonitor::new(reader, tx.clone()),
            shutdown: ShutdownMonitor::new(log_source, tx),
            events: Arc::new(Mutex::new(rx)),
            forward: None,
        }
    }

    /// See [`PowerMonitor::set_polling_interval`].
    pub fn set_polling_interval(&mut self, interval: Duration) {
        self.power.set_polling_interval(interval);
    }

    pub fn start_all<S: AlertSink>(&mut self, sink: S) {
        if self.forward.is_none() {
            let events = Arc::clone(&self.events);
            self.forward = Some(tokio::spawn(async move {
                let mut rx = events.lock().await;
                while let Some(event) = rx.recv().await {
                    let message = event.alert_text();
                    if !sink.send(&message).await {
                        warn!("alert delivery failed: {message}");
                    }
                }
            }));
        }

        self.power.start();
        self.shutdown.start();
        info!("all monitors started");
    }

    /// Stops both monitors and the forward loop. Idempotent, and safe to
    /// call while a shutdown signal is being handled.
    pub fn stop_all(&mut self) {
        self.power.stop();
        self.shutdown.stop();
        if let Some(task) = self.forward.take() {
            task.abort();
        }
        info!("all monitors stopped");
    }
}
