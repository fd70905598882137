//! mansel - pick files and directories from a checkbox tree.
//!
//! Usage:
//!   mansel [-p PATH] [-s FILE]          Launch the picker, print the chosen paths
//!   mansel [-p PATH] -s FILE total      Print the pre-selection and its size
//!   mansel --help                       Show help

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use humansize::{DECIMAL, format_size};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mansel_core::{SelectConfig, SelectionTree};
use mansel_session::{Coordinator, CoordinatorState};

#[derive(Parser)]
#[command(
    name = "mansel",
    version,
    about = "Pick files and directories with checkboxes",
    long_about = "mansel shows a directory tree with checkboxes and keeps a running \
                  total of the selected size.\n\n\
                  Confirming prints the chosen paths, relative to the root, one per \
                  line. Cancelling prints nothing."
)]
struct Cli {
    /// Root directory to pick from
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// File listing paths to pre-select, one per line ("-" reads stdin)
    #[arg(short, long, value_name = "FILE")]
    selection: Option<PathBuf>,

    /// Skip hidden files and directories
    #[arg(long)]
    no_hidden: bool,

    /// Write logs to this file (filter with MANSEL_LOG)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the pre-selection without the picker and print its size
    Total {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Headless report printed by `mansel total`.
#[derive(Debug, Serialize)]
struct TotalReport {
    root: PathBuf,
    selection: Vec<String>,
    bytes: u64,
    skipped: u64,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    if let Some(log_file) = &cli.log_file {
        init_logging(log_file)?;
    }

    let preselection = match &cli.selection {
        Some(source) => read_selection(source)?,
        None => Vec::new(),
    };

    let config = SelectConfig::builder()
        .root(cli.path.clone())
        .include_hidden(!cli.no_hidden)
        .build()
        .context("Invalid configuration")?;

    let mut tree = SelectionTree::open(config)
        .with_context(|| format!("Failed to open {}", cli.path.display()))?;

    let report = tree.preselect(&preselection);
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    info!(
        root = %tree.root_path().display(),
        preselected = report.applied.len(),
        ignored = report.warnings.len(),
        "selection tree opened"
    );

    match cli.command {
        Some(Command::Total { format }) => run_total(tree, format),
        None => run_picker(tree),
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("MANSEL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Read pre-selected paths from a file, or stdin for `-`.
fn read_selection(source: &Path) -> Result<Vec<String>> {
    let mut contents = String::new();
    if source == Path::new("-") {
        io::stdin()
            .read_to_string(&mut contents)
            .context("Failed to read selection from stdin")?;
    } else {
        contents = std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read selection file {}", source.display()))?;
    }
    Ok(parse_selection(&contents))
}

/// One path per line; blank lines are dropped.
fn parse_selection(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn run_picker(tree: SelectionTree) -> Result<()> {
    if let Some(selection) = mansel_tui::run(tree)? {
        for path in selection.to_strings() {
            println!("{path}");
        }
    }
    Ok(())
}

fn run_total(tree: SelectionTree, format: OutputFormat) -> Result<()> {
    let root = tree.root_path().to_path_buf();
    let runtime = tokio::runtime::Runtime::new()?;

    let (selection, state) = runtime.block_on(async {
        let mut coordinator = Coordinator::start(tree);
        let state = coordinator.settle().await.clone();
        let selection = coordinator.selection_set().to_strings();
        coordinator.close();
        (selection, state)
    });

    let (bytes, skipped) = match state {
        CoordinatorState::Settled { total, skipped, .. } => (total, skipped),
        CoordinatorState::Unavailable { message, .. } => {
            warn!(%message, "selection size unavailable");
            bail!("Could not compute selection size: {message}")
        }
        other => bail!("Size computation did not finish: {other:?}"),
    };

    let report = TotalReport {
        root,
        selection,
        bytes,
        skipped,
    };

    match format {
        OutputFormat::Text => {
            for path in &report.selection {
                println!("{path}");
            }
            println!();
            println!("Selection size: {}", format_size(report.bytes, DECIMAL));
            if report.skipped > 0 {
                println!("Skipped: {} unreadable entries", report.skipped);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
