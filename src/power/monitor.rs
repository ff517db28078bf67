use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PowerReader;
use crate::event::{MonitorEvent, PowerChangeKind};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Compare a new reading against the previous one.
///
/// Transitions are derived strictly from the (previous, observed) pair, so an
/// unchanged reading can never fire an event.
pub fn transition(prev_on_ac: bool, on_ac: bool) -> Option<PowerChangeKind> {
    if prev_on_ac == on_ac {
        None
    } else if on_ac {
        Some(PowerChangeKind::Plugged)
    } else {
        Some(PowerChangeKind::Unplugged)
    }
}

/// Polls a [`PowerReader`] on a fixed interval and emits a
/// [`MonitorEvent::PowerChanged`] whenever `on_ac` flips.
///
/// The baseline lives in a shared cell that outlives the poll task, so an
/// interval change (stop + start) never resets it.
pub struct PowerMonitor<R: PowerReader> {
    reader: Arc<R>,
    interval: Duration,
    baseline: Arc<Mutex<Option<bool>>>,
    events: mpsc::Sender<MonitorEvent>,
    task: Option<JoinHandle<()>>,
}

impl<R: PowerReader> PowerMonitor<R> {
    pub fn new(reader: R, events: mpsc::Sender<MonitorEvent>) -> Self {
        Self {
            reader: Arc::new(reader),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            baseline: Arc::new(Mutex::new(None)),
            events,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Take an initial reading as the baseline, then poll on the interval.
    /// Calling `start` while already running is a logged no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("power monitor already running");
            return;
        }

        let reader = Arc::clone(&self.reader);
        let baseline = Arc::clone(&self.baseline);
        let events = self.events.clone();
        let period = self.interval;

        self.task = Some(tokio::spawn(async move {
            {
                let mut last = baseline.lock().await;
                if last.is_none() {
                    let initial = reader.read();
                    info!(
                        "power monitor started, current source: {}",
                        if initial.on_ac { "AC" } else { "Battery" }
                    );
                    *last = Some(initial.on_ac);
                }
            }

            let mut ticker = tokio::time::interval(period);
            // The first tick of a fresh interval completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let state = reader.read();
                let mut last = baseline.lock().await;
                if let Some(prev) = *last {
                    if let Some(kind) = transition(prev, state.on_ac) {
                        info!(
                            "power source changed: {}",
                            if state.on_ac { "AC" } else { "Battery" }
                        );
                        let event = MonitorEvent::PowerChanged {
                            kind,
                            on_ac: state.on_ac,
                            at: state.observed_at,
                        };
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                // Baseline is replaced after every poll, changed or not.
                *last = Some(state.on_ac);
            }
        }));
    }

    /// Cancel the poll timer. Idempotent; stopping a monitor that already
    /// stopped (or whose task already finished) is a no-op.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("power monitor stopped");
        }
    }

    /// Restart the poll loop with a new period. The last observed baseline is
    /// preserved across the restart, so no transition is lost or duplicated.
    pub fn set_polling_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if self.task.is_some() {
            self.stop();
            self.start();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::PowerState;
    use chrono::Utc;
    use std::collections::VecDeque;

    /// Replays a scripted sequence of readings, repeating the last one once
    /// the script runs out.
    struct ScriptedReader {
        readings: std::sync::Mutex<(VecDeque<bool>, bool)>,
    }

    impl ScriptedReader {
        fn new(script: &[bool]) -> Self {
            let last = *script.last().unwrap_or(&false);
            Self {
                readings: std::sync::Mutex::new((script.iter().copied().collect(), last)),
            }
        }
    }

    impl PowerReader for ScriptedReader {
        fn read(&self) -> PowerState {
            let mut guard = self.readings.lock().unwrap();
            let on_ac = match guard.0.pop_front() {
                Some(value) => {
                    guard.1 = value;
                    value
                }
                None => guard.1,
            };
            PowerState {
                on_ac,
                observed_at: Utc::now(),
            }
        }
    }

    fn kind_of(event: MonitorEvent) -> PowerChangeKind {
        match event {
            MonitorEvent::PowerChanged { kind, .. } => kind,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn transition_fires_only_on_change() {
        assert_eq!(transition(true, true), None);
        assert_eq!(transition(false, false), None);
        assert_eq!(transition(true, false), Some(PowerChangeKind::Unplugged));
        assert_eq!(transition(false, true), Some(PowerChangeKind::Plugged));
    }

    #[tokio::test(start_paused = true)]
    async fn emits_one_event_per_flip() {
        // Baseline true, then polls observe true, false, false, true.
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor = PowerMonitor::new(
            ScriptedReader::new(&[true, true, false, false, true]),
            tx,
        );
        monitor.set_polling_interval(Duration::from_millis(10));
        monitor.start();

        let first = rx.recv().await.expect("first event");
        assert_eq!(kind_of(first), PowerChangeKind::Unplugged);

        let second = rx.recv().await.expect("second event");
        assert_eq!(kind_of(second), PowerChangeKind::Plugged);

        // Script exhausted: readings now repeat, so nothing further fires.
        let quiet = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(quiet.is_err(), "identical readings must not emit events");

        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_preserves_baseline() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor = PowerMonitor::new(ScriptedReader::new(&[true, false]), tx);
        monitor.set_polling_interval(Duration::from_secs(3600));
        monitor.start();

        // Let the task record the initial baseline (true) before restarting.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        monitor.set_polling_interval(Duration::from_millis(10));

        // If the restart re-initialized the baseline from the next reading
        // (false), no event would ever fire. Preserving it yields Unplugged.
        let event = rx.recv().await.expect("event after restart");
        assert_eq!(kind_of(event), PowerChangeKind::Unplugged);

        monitor.stop();
    }

    #[tokio::test]
    async fn start_twice_and_stop_twice_are_no_ops() {
        let (tx, _rx) = mpsc::channel(16);
        let mut monitor = PowerMonitor::new(ScriptedReader::new(&[false]), tx);

        monitor.start();
        monitor.start();
        assert!(monitor.is_running());

        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_running());

        // Stopping a never-started monitor is also fine.
        let (tx2, _rx2) = mpsc::channel(16);
        let mut idle = PowerMonitor::new(ScriptedReader::new(&[false]), tx2);
        idle.stop();
    }
}
