//! lnmock-node: standalone mock Lightning node.
//!
//! One subcommand per node operation, against a JSON state file at a
//! well-known temp-dir path (or wherever `--state-file` points). JSON
//! on stdout on success; a `{code, message}` error object on stderr
//! and a nonzero exit code on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lnmock_lib::{FileStateStore, InvoiceRequest, InvoiceStatus, MockNode};
use tracing::debug;

#[derive(Parser)]
#[command(name = "lnmock-node")]
#[command(about = "Mock c-lightning invoice node for deterministic tests", long_about = None)]
#[command(version)]
struct Cli {
    /// State file path (defaults to the well-known temp-dir location)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new invoice
    Invoice {
        /// Amount in millisatoshi
        msatoshi: u64,
        /// Unique invoice label
        label: String,
        /// Description embedded in the bolt11 string
        description: String,
        /// Seconds until the invoice expires
        expiry: i64,
        /// Hex payment preimage
        preimage: String,
    },
    /// List all invoices, expiring and autocleaning as side effects
    Listinvoices {
        /// Accepted for CLI compatibility; not used for filtering
        #[arg(long)]
        label: Option<String>,
    },
    /// Configure the autoclean retention policy
    Autocleaninvoice {
        /// Run a cleanup pass at most every this many seconds; 0 disables
        #[arg(long, default_value_t = 3600)]
        cycle_seconds: i64,
        /// Retain expired invoices this many seconds past expiry
        #[arg(long, default_value_t = 86400)]
        expired_by: i64,
    },
    /// Delete an invoice that is currently in the given status
    Delinvoice {
        /// Label of the invoice to delete
        label: String,
        /// Expected status: paid, unpaid or expired
        status: InvoiceStatus,
    },
    /// Mark an invoice as paid
    Markpaid {
        /// Label of the invoice to pay
        label: String,
    },
    /// Advance (or rewind, with a negative value) the virtual clock
    Advancetime {
        /// Seconds to add to the time offset
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
    /// Restore the state file to its empty baseline
    Reset,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli
        .state_file
        .clone()
        .unwrap_or_else(FileStateStore::default_path);
    debug!(path = %path.display(), "using state file");
    let node = MockNode::new(Box::new(FileStateStore::new(path)));

    match run(&cli.command, &node) {
        Ok(Some(output)) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            let payload = serde_json::json!({ "code": -1, "message": err.to_string() });
            eprintln!("{payload}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Commands, node: &MockNode) -> lnmock_lib::Result<Option<String>> {
    match command {
        Commands::Invoice {
            msatoshi,
            label,
            description,
            expiry,
            preimage,
        } => {
            let request = InvoiceRequest::new(*msatoshi, label.clone(), description.clone(), *expiry)
                .with_preimage(preimage.clone());
            let receipt = node.invoice(&request)?;
            Ok(Some(serde_json::to_string_pretty(&receipt)?))
        }
        Commands::Listinvoices { label: _ } => {
            let invoices = node.list_invoices()?;
            Ok(Some(serde_json::to_string_pretty(&invoices)?))
        }
        Commands::Autocleaninvoice {
            cycle_seconds,
            expired_by,
        } => {
            node.autoclean(*cycle_seconds, *expired_by)?;
            Ok(None)
        }
        Commands::Delinvoice { label, status } => {
            node.del_invoice(label, *status)?;
            Ok(None)
        }
        Commands::Markpaid { label } => {
            node.mark_paid(label)?;
            Ok(None)
        }
        Commands::Advancetime { seconds } => {
            node.advance_time(*seconds)?;
            Ok(None)
        }
        Commands::Reset => {
            node.reset()?;
            Ok(None)
        }
    }
}
