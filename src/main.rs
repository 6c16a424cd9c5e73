use clap::{Parser, Subcommand, ValueEnum};
use escrowsim::application::guided::GuidedFlow;
use escrowsim::application::ledger::{EscrowLedger, LedgerOptions};
use escrowsim::application::runner::{RunState, ScenarioRunner};
use escrowsim::application::widget::WidgetSummary;
use escrowsim::domain::escrow::{CreateEscrowRequest, NotificationMode};
use escrowsim::domain::fingerprint::FingerprintGenerator;
use escrowsim::domain::ports::{NotifierHandle, SnapshotStoreBox};
use escrowsim::domain::scenario::{self, PacingSpeed};
use escrowsim::infrastructure::file::FileSnapshotStore;
#[cfg(feature = "storage-rocksdb")]
use escrowsim::infrastructure::rocksdb::RocksDBSnapshotStore;
use escrowsim::infrastructure::simulated_wallet::SimulatedWallet;
use escrowsim::interfaces::console::ConsoleNotifier;
use escrowsim::interfaces::csv::ledger_writer::LedgerWriter;
use escrowsim::interfaces::csv::run_writer::RunReportWriter;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding the ledger snapshot
    #[arg(long, default_value = "escrow-ledger.json")]
    store: PathBuf,

    /// Path to a RocksDB ledger store (optional). Needs the `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Simulated network latency for ledger operations, in milliseconds
    #[arg(long, default_value_t = 1000)]
    latency_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lock funds in a new escrow and print its id
    Create {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        description: String,
        #[arg(long)]
        recipient_id: String,
        #[arg(long)]
        recipient_name: String,
    },
    /// Release a locked escrow to its recipient
    Release { id: String },
    /// Raise a dispute on a locked escrow
    Dispute {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Remove every escrow and the stored snapshot
    Clear,
    /// Print the ledger as CSV
    List,
    /// List the built-in scenarios
    Scenarios,
    /// Run a scenario against a simulated wallet and print the step report as CSV
    Scenario {
        id: String,
        #[arg(long, default_value = "normal")]
        speed: PacingSpeed,
    },
    /// Walk through the one-click create-and-release demo
    Demo,
    /// Show the widget phase, optionally acting on the latest escrow first
    Widget { action: Option<WidgetAction> },
}

#[derive(Clone, Copy, ValueEnum)]
enum WidgetAction {
    Lock,
    Release,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let notifier: NotifierHandle = Arc::new(ConsoleNotifier);

    match &cli.command {
        Command::Create {
            amount,
            description,
            recipient_id,
            recipient_name,
        } => {
            let request = CreateEscrowRequest::new(
                *amount,
                description.as_str(),
                recipient_id.as_str(),
                recipient_name.as_str(),
            )
            .into_diagnostic()?;
            let ledger = open_ledger(&cli, notifier).await?;
            let escrow = ledger.create(request).await.into_diagnostic()?;
            println!("{}", escrow.id);
        }
        Command::Release { id } => {
            let ledger = open_ledger(&cli, notifier).await?;
            if !ledger
                .release(id, NotificationMode::Announce)
                .await
                .into_diagnostic()?
            {
                eprintln!("No locked escrow with id {}", id);
            }
        }
        Command::Dispute { id, reason } => {
            let ledger = open_ledger(&cli, notifier).await?;
            if !ledger
                .dispute(id, reason, NotificationMode::Announce)
                .await
                .into_diagnostic()?
            {
                eprintln!("No locked escrow with id {}", id);
            }
        }
        Command::Clear => {
            let ledger = open_ledger(&cli, notifier).await?;
            ledger.clear().await.into_diagnostic()?;
        }
        Command::List => {
            let ledger = open_ledger(&cli, notifier).await?;
            let transactions = ledger.transactions().await;
            let stdout = io::stdout();
            LedgerWriter::new(stdout.lock())
                .write_transactions(&transactions)
                .into_diagnostic()?;
        }
        Command::Scenarios => {
            for s in scenario::catalog() {
                println!("{:<20} {:>2} steps  {}", s.id, s.steps.len(), s.description);
            }
        }
        Command::Scenario { id, speed } => run_scenario(id, *speed).await?,
        Command::Demo => {
            let ledger = open_ledger(&cli, notifier.clone()).await?;
            let flow = GuidedFlow::new(ledger, notifier);
            println!("Frame {}: ready to lock a sample payment", flow.frame().index());
            for _ in 0..2 {
                let frame = flow.advance().await.into_diagnostic()?;
                if let Some(escrow) = flow.escrow() {
                    println!(
                        "Frame {}: escrow {} is {} ({})",
                        frame.index(),
                        escrow.id,
                        escrow.status,
                        escrow.hash
                    );
                }
            }
        }
        Command::Widget { action } => {
            let widget = WidgetSummary::new(open_ledger(&cli, notifier).await?);
            let phase = match action {
                Some(WidgetAction::Lock) => widget.lock().await.into_diagnostic()?,
                Some(WidgetAction::Release) => widget.release().await.into_diagnostic()?,
                None => widget.phase().await,
            };
            println!("Phase {}", phase);
        }
    }

    Ok(())
}

async fn open_ledger(cli: &Cli, notifier: NotifierHandle) -> Result<Arc<EscrowLedger>> {
    let store = open_store(cli).into_diagnostic()?;
    let ledger = EscrowLedger::open(
        store,
        notifier,
        FingerprintGenerator::new(),
        LedgerOptions {
            latency: Duration::from_millis(cli.latency_ms),
        },
    )
    .await;
    Ok(Arc::new(ledger))
}

async fn run_scenario(id: &str, speed: PacingSpeed) -> Result<()> {
    let runner = ScenarioRunner::new(Box::new(SimulatedWallet::new()));
    runner.select_scenario(id).into_diagnostic()?;
    runner.set_speed(speed);
    runner.connect().await.into_diagnostic()?;

    let state = runner.run_scenario().await.into_diagnostic()?;

    let run = runner.snapshot();
    let stdout = io::stdout();
    RunReportWriter::new(stdout.lock())
        .write_run(&run)
        .into_diagnostic()?;

    if state != RunState::Completed {
        miette::bail!("Scenario '{}' halted at step {}", id, run.cursor() + 1);
    }
    Ok(())
}

fn open_store(cli: &Cli) -> escrowsim::error::Result<SnapshotStoreBox> {
    if let Some(db_path) = &cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            return Ok(Box::new(RocksDBSnapshotStore::open(db_path)?));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path ({}), but 'storage-rocksdb' feature is not enabled. Falling back to JSON file storage.",
                db_path.display()
            );
        }
    }
    Ok(Box::new(FileSnapshotStore::new(&cli.store)))
}
