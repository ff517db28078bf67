use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod alert;
mod event;
mod monitor;
mod power;
mod shutdown;

use alert::{AlertSink, CommandSink, LogSink};
use monitor::MonitorSet;
use power::{PowerReader, SysfsPowerReader};
use shutdown::journal::{DEFAULT_JOURNAL_UNIT, JournalctlSource};

#[derive(Parser, Debug)]
#[command(
    name = "powerwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Host power and shutdown monitor, delivering alerts to a configurable sink"
)]
struct Args {
    /// Power poll interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    interval_ms: u64,

    /// Journal unit followed for scheduled shutdown announcements
    #[arg(long, value_name = "UNIT", default_value = DEFAULT_JOURNAL_UNIT)]
    journal_unit: String,

    /// Shell command run for each alert; the message is passed in $ALERT_MESSAGE
    #[arg(long, value_name = "CMD")]
    alert_command: Option<String>,

    #[arg(short, long, action)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let reader = SysfsPowerReader::new();
    let source = Arc::new(JournalctlSource::new(args.journal_unit.clone()));
    let mut monitors = MonitorSet::new(reader, source);
    monitors.set_polling_interval(Duration::from_millis(args.interval_ms));

    match args.alert_command {
        Some(command) => run(monitors, CommandSink::new(command)).await,
        None => {
            warn!("no alert command configured, alerts only reach the log");
            run(monitors, LogSink).await
        }
    }
}

async fn run<R, S>(mut monitors: MonitorSet<R>, sink: S) -> Result<()>
where
    R: PowerReader,
    S: AlertSink + Clone,
{
    monitors.start_all(sink.clone());

    if !sink.send("🤖 Host monitor started").await {
        warn!("startup announcement was not delivered");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    monitors.stop_all();
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
