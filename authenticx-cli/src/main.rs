//! AuthenticX CLI: export scan reports as PDF documents.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// AuthenticX report exporter
#[derive(Parser, Debug)]
#[command(name = "authenticx", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Export one or all report documents
    Export {
        /// Document to export
        #[arg(value_enum)]
        kind: ExportKind,

        #[command(flatten)]
        input: InputArgs,

        /// Output directory (defaults to output.directory from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print a built-in report as JSON
    Fixtures {
        /// Report identifier
        #[arg(short, long, default_value = "1")]
        report: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportKind {
    Table,
    Chart,
    Graph,
    Heatmap,
    Full,
    All,
}

#[derive(clap::Args, Debug, Clone)]
struct InputArgs {
    /// Built-in report identifier
    #[arg(short, long, conflicts_with = "findings")]
    report: Option<String>,

    /// JSON file with an array of findings
    #[arg(long, requires = "target")]
    findings: Option<PathBuf>,

    /// JSON file with the attack-path graph (derived from the findings if omitted)
    #[arg(long, requires = "findings")]
    graph: Option<PathBuf>,

    /// Target label used in titles and file names
    #[arg(short, long)]
    target: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "authenticx", "authenticx")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "authenticx.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.quiet).await
}
