use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::MonitorEvent;

/// Substrings announcing an imminent reboot, power-off or halt, matched
/// case-insensitively against the record's MESSAGE field. Covers logind's
/// wall announcements ("The system will reboot now!") and its scheduled
/// shutdown records.
pub const SHUTDOWN_PATTERNS: &[&str] = &[
    "will reboot",
    "will power off",
    "will halt",
    "is rebooting",
    "is powering down",
    "is halting",
    "scheduled shutdown",
];

/// A live, line-oriented system log stream plus the subprocess producing it,
/// if any.
pub struct LogStream {
    pub child: Option<Child>,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

/// Platform capability for attaching to the system log. Keeps the
/// platform-coupled subprocess handling out of the tailer so tests can feed
/// canned streams.
pub trait LogSource: Send + Sync + 'static {
    fn attach(&self) -> Result<LogStream>;
}

/// Follows the journal of the session-management unit as JSON lines.
pub struct JournalctlSource {
    unit: String,
}

pub const DEFAULT_JOURNAL_UNIT: &str = "systemd-logind.service";

impl JournalctlSource {
    pub fn new(unit: String) -> Self {
        Self { unit }
    }
}

impl LogSource for JournalctlSource {
    fn attach(&self) -> Result<LogStream> {
        let mut child = Command::new("journalctl")
            .arg("--follow")
            .arg("--output=json")
            .arg("--lines=0")
            .arg("--no-pager")
            .arg("--unit")
            .arg(&self.unit)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| eyre::eyre!("journalctl stdout was not captured"))?;
        Ok(LogStream {
            child: Some(child),
            reader: Box::new(stdout),
        })
    }
}

/// Extract the reason text if a journal record announces a pending shutdown.
///
/// Malformed lines (invalid JSON, missing or non-string MESSAGE) yield None
/// and are skipped by the caller; they are never a stream-level failure.
pub fn scheduled_shutdown_reason(line: &str) -> Option<String> {
    let record: serde_json::Value = serde_json::from_str(line).ok()?;
    let message = record.get("MESSAGE")?.as_str()?;
    let lowered = message.to_lowercase();
    SHUTDOWN_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
        .then(|| message.to_string())
}

/// Tails the system log and emits [`MonitorEvent::ShutdownScheduled`] for
/// every record matching [`SHUTDOWN_PATTERNS`].
///
/// If the source cannot attach (no journalctl, unsupported platform) the
/// tailer logs a warning and stays out of the way — degraded mode, with the
/// signal listener still covering in-flight shutdowns.
pub struct JournalTailer {
    source: Arc<dyn LogSource>,
    events: mpsc::Sender<MonitorEvent>,
    task: Option<JoinHandle<()>>,
}

impl JournalTailer {
    pub fn new(source: Arc<dyn LogSource>, events: mpsc::Sender<MonitorEvent>) -> Self {
        Self {
            source,
            events,
            task: None,
        }
    }

    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("system log tailer already running");
            return;
        }

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let stream = match source.attach() {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("system log stream unavailable, scheduled-shutdown detection disabled: {e}");
                    return;
                }
            };

            let mut child = stream.child;
            let mut lines = BufReader::new(stream.reader).lines();
            info!("system log tailer started");

            while let Ok(Some(line)) = lines.next_line().await {
                let Some(reason) = scheduled_shutdown_reason(&line) else {
                    debug!("skipping non-matching journal record");
                    continue;
                };
                info!("scheduled shutdown announced: {reason}");
                let event = MonitorEvent::ShutdownScheduled {
                    reason,
                    at: Utc::now(),
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }

            if let Some(mut child) = child.take() {
                let _ = child.kill().await;
            }
        }));
    }

    /// Aborting the task drops the subprocess handle, and kill-on-drop
    /// reaps the journalctl child. Idempotent; stopping with no subprocess
    /// attached is a no-op.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("system log tailer stopped");
        }
    }
}
