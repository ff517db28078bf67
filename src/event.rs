use chrono::{DateTime, Utc};

/// Direction of an AC power transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerChangeKind {
    Plugged,
    Unplugged,
}

/// Everything the monitors can report, as a closed set of variants.
///
/// Events are consumed exactly once by the facade's forward loop; they are
/// independently timestamped and carry no ordering guarantee across monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The host switched between AC and battery power.
    PowerChanged {
        kind: PowerChangeKind,
        on_ac: bool,
        at: DateTime<Utc>,
    },
    /// A termination signal arrived; shutdown is already in progress.
    ShutdownInitiated,
    /// The OS announced a pending shutdown/reboot in the system log.
    ShutdownScheduled { reason: String, at: DateTime<Utc> },
}

impl MonitorEvent {
    /// Message delivered to the alert sink for this event.
    pub fn alert_text(&self) -> String {
        match self {
            MonitorEvent::PowerChanged {
                kind: PowerChangeKind::Plugged,
                ..
            } => "🔌 Power plugged in".to_string(),
            MonitorEvent::PowerChanged {
                kind: PowerChangeKind::Unplugged,
                ..
            } => "🔋 Power unplugged".to_string(),
            MonitorEvent::ShutdownInitiated => "🛑 System shutdown initiated".to_string(),
            MonitorEvent::ShutdownScheduled { reason, .. } => {
                format!("⏰ Shutdown scheduled: {reason}")
            }
        }
    }
}
