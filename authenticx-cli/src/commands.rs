//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::ExportKind;
use crate::InputArgs;
use authenticx_core::config::{ConfigOverrides, ExportConfig, config_exists, load_config};
use authenticx_core::{Finding, Graph, fixtures};
use authenticx_export::widgets::heatmap_widget;
use authenticx_export::{DirectorySink, ExportReceipt, ReportExporter, SceneSurface};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    quiet: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::Export { kind, input, out } => {
            handle_export(kind, &input, out, workspace, quiet).await
        }
        Commands::Fixtures { report } => handle_fixtures(&report),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

/// Findings, graph and target label for one export run.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ReportInput {
    target: String,
    findings: Vec<Finding>,
    graph: Graph,
}

fn resolve_input(input: &InputArgs) -> anyhow::Result<ReportInput> {
    if let Some(path) = &input.findings {
        let findings = fixtures::load_findings(path)?;
        let target = input
            .target
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--target is required with --findings"))?;
        let graph = match &input.graph {
            Some(path) => fixtures::load_graph(path)?,
            None => Graph::from_findings(&target, &findings),
        };
        return Ok(ReportInput {
            target,
            findings,
            graph,
        });
    }

    let id = input.report.as_deref().unwrap_or("1");
    let report = fixtures::report(id)?;
    Ok(ReportInput {
        target: input.target.clone().unwrap_or(report.target),
        findings: report.findings,
        graph: report.graph,
    })
}

fn output_dir(config: &ExportConfig, workspace: &Path) -> PathBuf {
    let dir = &config.output.directory;
    if dir.is_absolute() {
        dir.clone()
    } else {
        workspace.join(dir)
    }
}

async fn handle_export(
    kind: ExportKind,
    input: &InputArgs,
    out: Option<PathBuf>,
    workspace: &Path,
    quiet: bool,
) -> anyhow::Result<()> {
    let overrides = out.map(ConfigOverrides::output_directory);
    let config = load_config(Some(workspace), overrides.as_ref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if !config_exists(Some(workspace)) {
        tracing::debug!("No configuration file found, using defaults");
    }
    let report = resolve_input(input)?;
    let dir = output_dir(&config, workspace);
    let exporter = ReportExporter::from_config(&config, Arc::new(DirectorySink::new(&dir)))?;

    let kinds: &[ExportKind] = match kind {
        ExportKind::All => &[
            ExportKind::Table,
            ExportKind::Chart,
            ExportKind::Graph,
            ExportKind::Heatmap,
            ExportKind::Full,
        ],
        _ => std::slice::from_ref(&kind),
    };

    let mut receipts = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let receipt = export_one(&exporter, &config, *kind, &report).await?;
        receipts.push(receipt);
    }

    if !quiet {
        for receipt in &receipts {
            println!(
                "  {} -> {} ({} page{}, {} bytes)",
                receipt.kind,
                receipt.path.display(),
                receipt.pages,
                if receipt.pages == 1 { "" } else { "s" },
                receipt.bytes
            );
        }
    }
    Ok(())
}

async fn export_one(
    exporter: &ReportExporter,
    config: &ExportConfig,
    kind: ExportKind,
    report: &ReportInput,
) -> anyhow::Result<ExportReceipt> {
    let target = report.target.as_str();
    let receipt = match kind {
        ExportKind::Table => exporter.export_table(&report.findings, target)?,
        ExportKind::Chart => exporter.export_chart(&report.findings, target)?,
        ExportKind::Graph => exporter.export_graph(&report.graph, target)?,
        ExportKind::Full => exporter.export_full(&report.findings, &report.graph, target)?,
        ExportKind::Heatmap => {
            let region = config.capture.heatmap_region.as_str();
            let surface = SceneSurface::new(heatmap_widget(&report.findings, region));
            exporter.export_heatmap(&surface, region, target).await?
        }
        ExportKind::All => anyhow::bail!("'all' expands to the individual documents"),
    };
    Ok(receipt)
}

fn handle_fixtures(id: &str) -> anyhow::Result<()> {
    let report = fixtures::report(id)?;
    let dump = ReportInput {
        target: report.target,
        findings: report.findings,
        graph: report.graph,
    };
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".authenticx");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&ExportConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
