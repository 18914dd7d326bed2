use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};

use step_parity::parity::export::write_timestamped;
use step_parity::{Config, ParityGenerator, read_chart_csv};

/// Assign feet to every note of a step chart
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Chart CSV (Beat,Second,Column,Type,Hold[,Fake])
    #[arg(long)]
    chart: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stage layout, overrides the config
    #[arg(long)]
    layout: Option<String>,

    /// Beat override document to apply before analysis
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Previously exported parity document to reconcile against
    #[arg(long)]
    import: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also export the full state graph
    #[arg(long)]
    graph: bool,

    #[arg(long)]
    pretty: bool,

    /// Ignore all overrides
    #[arg(long)]
    no_overrides: bool,
}

fn main() -> Result<()> {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    apply_cli(&mut config, &cli);
    config.validate()?;

    let generator = ParityGenerator::new(&config.analysis.layout)?;
    generator.update_weights(&config.weights);

    let mut notes = read_chart_csv(&cli.chart)
        .with_context(|| format!("reading chart {}", cli.chart.display()))?;
    info!("Loaded {} notes from {}", notes.len(), cli.chart.display());

    if let Some(path) = &cli.overrides {
        let json = read_text(path)?;
        if !generator.set_beat_overrides_json(&json) {
            warn!("Ignoring override file {}", path.display());
        }
    }

    if let Some(path) = &cli.import {
        let json = read_text(path)?;
        if generator.load_parity_data(&json, &mut notes) {
            info!("Parity data from {} reproduced", path.display());
        } else {
            warn!("Parity data from {} could not be fully reproduced", path.display());
        }
    } else {
        let summary = generator
            .analyze_with(&mut notes, config.analysis.use_overrides)
            .context("analysis already running")?;
        info!(
            "{} rows, {} nodes, {} edges, total cost {:.3} ({} overridden rows)",
            summary.rows, summary.nodes, summary.edges, summary.total_cost, summary.overridden_rows
        );
    }

    let output_dir = PathBuf::from(&config.export.output_dir);
    let parity = generator.serialize_parity_data(config.export.pretty)?;
    let path = write_timestamped(&output_dir, "parity", &parity)?;
    info!("Parity data saved to: {}", path.display());

    if config.export.include_graph {
        let graph = generator.serialize_step_graph(config.export.pretty)?;
        let path = write_timestamped(&output_dir, "graph", &graph)?;
        info!("State graph saved to: {}", path.display());
    }

    if !generator.beat_overrides().is_empty() {
        let overrides = generator.beat_overrides_json(config.export.pretty)?;
        let path = write_timestamped(&output_dir, "overrides", &overrides)?;
        info!("Overrides saved to: {}", path.display());
    }

    print_labels(&notes);
    Ok(())
}

fn apply_cli(config: &mut Config, cli: &Cli) {
    if let Some(layout) = &cli.layout {
        config.analysis.layout = layout.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.export.output_dir = dir.display().to_string();
    }
    if cli.graph {
        config.export.include_graph = true;
    }
    if cli.pretty {
        config.export.pretty = true;
    }
    if cli.no_overrides {
        config.analysis.use_overrides = false;
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_labels(notes: &[step_parity::NoteEvent]) {
    for note in notes.iter().filter(|n| n.parity.is_some()) {
        println!(
            "beat {:>8.3}  col {}  {}{}",
            note.beat,
            note.column,
            note.parity.unwrap_or('-'),
            if note.parity_override { " *" } else { "" }
        );
    }
}
