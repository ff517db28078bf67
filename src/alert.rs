use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{error, info};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for formatted monitor alerts.
///
/// Sends are best-effort and fire-and-forget from the monitors' point of
/// view: failure comes back as `false`, never as an error, and is not
/// retried.
pub trait AlertSink: Send + Sync + 'static {
    fn send(&self, message: &str) -> impl Future<Output = bool> + Send;
}

/// Delivers alerts by running a user-configured shell command with the
/// message in `$ALERT_MESSAGE`.
#[derive(Clone)]
pub struct CommandSink {
    command: Arc<str>,
}

impl CommandSink {
    pub fn new(command: String) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl AlertSink for CommandSink {
    async fn send(&self, message: &str) -> bool {
        let run = Command::new("sh")
            .arg("-c")
            .arg(self.command.as_ref())
            .env("ALERT_MESSAGE", message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match tokio::time::timeout(SEND_TIMEOUT, run).await {
            Ok(Ok(status)) if status.success() => true,
            Ok(Ok(status)) => {
                error!("alert command exited with {status}");
                false
            }
            Ok(Err(e)) => {
                error!("failed to run alert command: {e}");
                false
            }
            Err(_) => {
                error!("alert command timed out");
                false
            }
        }
    }
}

/// Fallback sink used when no alert command is configured: the message only
/// reaches the log.
#[derive(Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    async fn send(&self, message: &str) -> bool {
        info!("ALERT: {message}");
        true
    }
}
