use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hybrid_motor_sim::export::{sweep as sweep_csv, writer_for_path};
use hybrid_motor_sim::scenario::{SweepParameter, engine_from_file, load_engine, settings_from_file};
use hybrid_motor_sim::sweep::{SweepAxis, SweepRequest, run_sweep};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sweep two engine-file parameters over a grid and export one row per cell.
#[derive(Parser, Debug)]
#[command(author, version, about = "Two-parameter hybrid motor design sweep")]
struct Cli {
    /// Single engine file (TOML); takes precedence over --catalog
    #[arg(long)]
    engine: Option<PathBuf>,

    #[arg(long, default_value = "data/engines")]
    catalog: PathBuf,

    #[arg(long)]
    name: Option<String>,

    /// Engine-file key varied along x (e.g. throat_radius_m)
    #[arg(long)]
    x_param: SweepParameter,
    #[arg(long)]
    x_start: f64,
    #[arg(long)]
    x_end: f64,
    #[arg(long, default_value_t = 10)]
    x_steps: usize,

    /// Engine-file key varied along y (e.g. oxidizer_mass_flow_kg_s)
    #[arg(long)]
    y_param: SweepParameter,
    #[arg(long)]
    y_start: f64,
    #[arg(long)]
    y_end: f64,
    #[arg(long, default_value_t = 10)]
    y_steps: usize,

    /// Worker threads (defaults to available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Iteration ceiling per cell (defaults to the engine file's)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Output CSV file (use '-' for stdout)
    #[arg(long, default_value = "artifacts/sweep.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let loaded = match &cli.engine {
        Some(path) => load_engine(path, None),
        None => load_engine(&cli.catalog, cli.name.as_deref()),
    }
    .context("failed to load engine")?;
    // Surface problems with the base engine before fanning out.
    loaded.config()?;
    let thermo = loaded.thermo()?;

    let mut request = SweepRequest::new(
        SweepAxis::linspace(cli.x_param.key(), cli.x_start, cli.x_end, cli.x_steps),
        SweepAxis::linspace(cli.y_param.key(), cli.y_start, cli.y_end, cli.y_steps),
    );
    request.threads = cli.threads;

    let base = &loaded.file;
    let matrix = run_sweep(&request, &thermo, |x, y| {
        let mut cell = base.clone();
        cli.x_param.apply(&mut cell, x);
        cli.y_param.apply(&mut cell, y);
        let config = engine_from_file(&cell)?;
        let mut settings = settings_from_file(&cell);
        if let Some(max) = cli.max_iterations {
            settings = settings.with_max_iterations(max);
        }
        Ok((config, settings))
    });

    let mut writer = writer_for_path(&cli.output)?;
    sweep_csv::write_matrix(&mut *writer, &matrix)?;
    info!(
        engine = %base.name,
        cells = matrix.cells().len(),
        completed = matrix.completed_count(),
        output = %cli.output.display(),
        "sweep written"
    );
    Ok(())
}
