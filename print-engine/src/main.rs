//! Operator CLI for the print engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use print_engine::{PrintEngine, logger};
use serde_json::Value;

/// Print order receipts on thermal printers
#[derive(Parser, Debug)]
#[command(version, about)]
struct Opts {
    /// Path to the printer config file
    #[arg(short, long, env = "PRINT_ENGINE_CONFIG", default_value = print_engine::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for rotating log files (console only when unset)
    #[arg(long, env = "PRINT_ENGINE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an order from a JSON file
    Print {
        /// Order record
        file: PathBuf,
    },
    /// Show the receipt layout of an order without printing
    Preview {
        /// Order record
        file: PathBuf,
    },
    /// Print a test receipt
    Test,
    /// List installed spooler printers
    Printers,
    /// List serial ports
    Ports,
    /// Show the active configuration
    Config,
}

fn read_order(file: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read order file {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", file.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    let _guard = logger::init_logger(&opts.log_level, opts.log_dir.as_deref())?;

    let engine = Arc::new(
        PrintEngine::open(&opts.config)
            .with_context(|| format!("Failed to load config {}", opts.config.display()))?,
    );

    match opts.cmd {
        Command::Print { file } => {
            let order = read_order(&file)?;
            if !engine.print_async(order).await? {
                bail!("No print backend accepted the order");
            }
            println!("Order printed");
        }
        Command::Preview { file } => {
            let order = read_order(&file)?;
            for line in engine.preview(&order) {
                println!("{}", line);
            }
        }
        Command::Test => {
            let engine = engine.clone();
            let printed = tokio::task::spawn_blocking(move || engine.print_test()).await?;
            if !printed {
                bail!("Test receipt could not be printed");
            }
            println!("Test receipt printed");
        }
        Command::Printers => {
            for name in engine.list_printers()? {
                println!("{}", name);
            }
        }
        Command::Ports => {
            for port in engine.list_serial_ports()? {
                println!("{}", port);
            }
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&engine.config())?);
        }
    }

    Ok(())
}
