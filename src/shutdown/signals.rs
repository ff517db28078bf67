use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::event::MonitorEvent;

/// Emits [`MonitorEvent::ShutdownInitiated`] for every SIGINT or SIGTERM
/// delivery. Repeated signals emit repeated events; there is no debouncing.
///
/// The listener never terminates the process itself — shutdown is the outer
/// process's call. `stop` aborts the listening task, which drops the signal
/// streams: no further events are emitted and a later `start` registers
/// fresh streams.
pub struct SignalListener {
    events: mpsc::Sender<MonitorEvent>,
    task: Option<JoinHandle<()>>,
}

impl SignalListener {
    pub fn new(events: mpsc::Sender<MonitorEvent>) -> Self {
        Self { events, task: None }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("shutdown signal listener already running");
            return;
        }

        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("failed to register SIGINT handler: {e}");
                    return;
                }
            };
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("failed to register SIGTERM handler: {e}");
                    return;
                }
            };

            info!("shutdown signal listener started");
            loop {
                let received = tokio::select! {
                    r = sigint.recv() => r.map(|_| "SIGINT"),
                    r = sigterm.recv() => r.map(|_| "SIGTERM"),
                };
                let Some(name) = received else { break };
                info!("{name} received, system shutdown detected");
                if events.send(MonitorEvent::ShutdownInitiated).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Idempotent; safe to call while a shutdown is in progress.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("shutdown signal listener stopped");
        }
    }
}
