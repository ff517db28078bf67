use std::sync::Arc;

use tokio::sync::mpsc;

use crate::event::MonitorEvent;

pub mod journal;
pub mod signals;

use journal::{JournalTailer, LogSource};
use signals::SignalListener;

/// Composite shutdown monitor: termination signals catch in-flight
/// shutdowns, the log tailer catches scheduled ones announced ahead of the
/// signal. Two independent detection paths behind one start/stop surface.
pub struct ShutdownMonitor {
    signals: SignalListener,
    journal: JournalTailer,
}

impl ShutdownMonitor {
    pub fn new(source: Arc<dyn LogSource>, events: mpsc::Sender<MonitorEvent>) -> Self {
        Self {
            signals: SignalListener::new(events.clone()),
            journal: JournalTailer::new(source, events),
        }
    }

    pub fn start(&mut self) {
        self.signals.start();
        self.journal.start();
    }

    pub fn stop(&mut self) {
        self.journal.stop();
        self.signals.stop();
    }
}
