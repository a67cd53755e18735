use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use scolpay_offline::application::connectivity::{ConnectivityTracker, spawn_monitor};
use scolpay_offline::application::queue::{OfflineQueue, SaveOutcome, SyncOutcome};
use scolpay_offline::config::QueueConfig;
use scolpay_offline::domain::payment::{Amount, PaymentPayload};
use scolpay_offline::domain::ports::{PendingStoreBox, ReachabilityProbe};
use scolpay_offline::domain::submission::SubmissionId;
use scolpay_offline::infrastructure::file::JsonFileStore;
use scolpay_offline::infrastructure::http::HttpGateway;
use scolpay_offline::infrastructure::probe::TcpProbe;
#[cfg(feature = "storage-rocksdb")]
use scolpay_offline::infrastructure::rocksdb::RocksDBStore;
use scolpay_offline::interfaces::csv::payment_reader::PaymentReader;
use scolpay_offline::interfaces::csv::pending_writer::PendingWriter;
use scolpay_offline::telemetry;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the school-fees transaction API
    #[arg(long, global = true, env = "SCOLPAY_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// JSON file holding payments waiting to be synced
    #[arg(long, global = true, env = "SCOLPAY_QUEUE_FILE", default_value = "pending-transactions.json")]
    queue_file: PathBuf,

    /// Path to a RocksDB queue (optional). Requires the `storage-rocksdb` feature.
    #[arg(long, global = true, env = "SCOLPAY_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Seconds before a delivery attempt is abandoned
    #[arg(long, global = true, env = "SCOLPAY_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, env = "SCOLPAY_LOG", default_value = "info")]
    log_level: String,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one payment, delivering it now when possible
    Save(SaveArgs),
    /// Record every payment listed in a CSV file
    Import {
        /// CSV with columns studentId,amount,type,description,schoolId
        input: PathBuf,
    },
    /// Deliver queued payments
    Sync,
    /// Print queued payments as CSV
    Pending,
    /// Drop a queued payment without delivering it
    Remove { id: String },
    /// Keep syncing whenever the connection comes back, until Ctrl-C
    Watch {
        /// Seconds between connectivity probes [default: 5]
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Args)]
struct SaveArgs {
    #[arg(long)]
    student_id: String,
    #[arg(long, allow_hyphen_values = true)]
    amount: Decimal,
    /// Payment kind, e.g. scolarite or cantine
    #[arg(long = "type")]
    kind: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    school_id: Option<String>,
}

impl SaveArgs {
    fn into_payload(self) -> Result<PaymentPayload> {
        let amount = Amount::new(self.amount)?;
        let mut payload = PaymentPayload::new(self.student_id, amount, self.kind);
        payload.description = self.description;
        payload.school_id = self.school_id;
        Ok(payload)
    }
}

fn open_store(cli: &Cli) -> Result<PendingStoreBox> {
    if let Some(db_path) = &cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let store = RocksDBStore::open(db_path)?;
            return Ok(Box::new(store));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        tracing::warn!(
            db_path = %db_path.display(),
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to the JSON queue file."
        );
    }
    Ok(Box::new(JsonFileStore::new(&cli.queue_file)))
}

fn describe(outcome: &SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Delivered => "payment delivered".to_string(),
        SaveOutcome::Queued(id) => format!("payment queued locally as {id}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_level)?;

    let timeout = Duration::from_secs(cli.timeout_secs);
    let config = QueueConfig::default().with_delivery_timeout(timeout);
    let probe = TcpProbe::for_url(&cli.api_url, timeout)?;

    // Listing and removing queued payments never touch the network.
    let needs_network = !matches!(cli.command, Command::Pending | Command::Remove { .. });
    let online = needs_network && !cli.offline && probe.is_reachable().await;
    tracing::debug!(online, address = probe.address(), "initial connectivity");
    let connectivity = ConnectivityTracker::new(online);

    let store = open_store(&cli)?;
    let gateway = HttpGateway::new(&cli.api_url, timeout)?;
    let queue = Arc::new(OfflineQueue::new(
        store,
        Box::new(gateway),
        connectivity.clone(),
        config,
    ));

    match cli.command {
        Command::Save(args) => {
            let outcome = queue.save(args.into_payload()?).await?;
            println!("{}", describe(&outcome));
        }
        Command::Import { input } => {
            let file = File::open(input).into_diagnostic()?;
            let (mut delivered, mut queued) = (0, 0);
            for payment in PaymentReader::new(file).payments() {
                let payload = match payment.and_then(|p| Amount::new(p.amount).map(|_| p)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "Error reading payment");
                        continue;
                    }
                };
                match queue.save(payload).await? {
                    SaveOutcome::Delivered => delivered += 1,
                    SaveOutcome::Queued(_) => queued += 1,
                }
            }
            println!("{delivered} delivered, {queued} queued");
        }
        Command::Sync => match queue.sync_now().await? {
            SyncOutcome::Offline => println!("offline, nothing synced"),
            outcome => {
                let report = outcome.report();
                println!(
                    "{} succeeded, {} failed",
                    report.success_count, report.failure_count
                );
            }
        },
        Command::Pending => {
            let pending = queue.list_pending().await?;
            let stdout = io::stdout();
            PendingWriter::new(stdout.lock()).write_pending(&pending)?;
        }
        Command::Remove { id } => {
            let id = SubmissionId::from(id);
            queue.remove(&id).await?;
            println!("removed {id}");
        }
        Command::Watch { interval_secs } => {
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(config.monitor_interval);
            let _auto_sync = queue.spawn_auto_sync();
            let monitor = (!cli.offline)
                .then(|| spawn_monitor(connectivity.clone(), Box::new(probe), interval));

            if queue.is_online() {
                queue.sync_now().await?;
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match queue.pending_count().await {
                            Ok(pending) => {
                                tracing::info!(pending, online = queue.is_online(), "queue status");
                            }
                            Err(e) => tracing::error!(error = %e, "could not read pending payments"),
                        }
                    }
                    signal = tokio::signal::ctrl_c() => {
                        signal.into_diagnostic()?;
                        break;
                    }
                }
            }

            if let Some(monitor) = monitor {
                monitor.abort();
            }
        }
    }

    Ok(())
}
