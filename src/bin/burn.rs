use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hybrid_motor_sim::ballistics::feed::DEFAULT_MEASURED_FLOOR;
use hybrid_motor_sim::ballistics::{
    BurnReport, BurnSimulator, BurnStatus, FaultPolicy, TracingObserver,
};
use hybrid_motor_sim::config::write_engine_file;
use hybrid_motor_sim::core::units::{m_to_mm, pa_to_bar};
use hybrid_motor_sim::export::{history, summary, writer_for_path};
use hybrid_motor_sim::scenario::{load_engine, with_measured_feed};
use tracing_subscriber::EnvFilter;

/// Simulate one hybrid motor burn and export its history.
#[derive(Parser, Debug)]
#[command(author, version, about = "Hybrid motor burn simulator")]
struct Cli {
    /// Single engine file (TOML); takes precedence over --catalog
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Engine catalog: directory of TOML files or a YAML list
    #[arg(long, default_value = "data/engines")]
    catalog: PathBuf,

    /// Engine name within the catalog (case-insensitive)
    #[arg(long)]
    name: Option<String>,

    /// Measured oxidizer flow (`time_s,mass_flow_kg_s`) for hotfire replay
    #[arg(long)]
    ox_flow_csv: Option<PathBuf>,

    /// Replacement for negative measured flow samples (kg/s)
    #[arg(long, default_value_t = DEFAULT_MEASURED_FLOOR)]
    ox_flow_floor: f64,

    /// Halt on the first numerical fault, even if the engine file suppresses mixture-ratio faults
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Wall-clock budget in seconds
    #[arg(long)]
    deadline_s: Option<f64>,

    /// Log progress every N steps
    #[arg(long, default_value_t = 1000)]
    progress_every: usize,

    /// History CSV (use '-' for stdout); a `<stem>_summary.json` sidecar is written next to it
    #[arg(long, default_value = "artifacts/burn.csv")]
    output: PathBuf,

    /// Also write the resolved engine file here
    #[arg(long)]
    save_engine: Option<PathBuf>,
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

    let mut config = loaded.config()?;
    if let Some(csv) = &cli.ox_flow_csv {
        config = with_measured_feed(config, csv, cli.ox_flow_floor)
            .with_context(|| format!("failed to load {}", csv.display()))?;
    }
    let thermo = loaded.thermo()?;
    let mut settings = loaded.settings();
    if cli.strict {
        settings = settings.with_fault_policy(FaultPolicy::Strict);
    }
    if let Some(seconds) = cli.deadline_s {
        let deadline =
            Duration::try_from_secs_f64(seconds).context("invalid --deadline-s")?;
        settings = settings.with_deadline(deadline);
    }

    if let Some(path) = &cli.save_engine {
        write_engine_file(path, &loaded.file)?;
    }

    let mut simulator = BurnSimulator::new(config, &thermo, settings);
    let mut observer = TracingObserver::new(cli.progress_every);
    let report = simulator.run(&mut observer)?;

    {
        let mut writer = writer_for_path(&cli.output)?;
        history::write_log(&mut *writer, &report.log)?;
    }
    if cli.output.as_os_str() != "-" {
        let thermo_label = thermo.describe();
        let meta = summary::Metadata {
            source: &loaded.file.name,
            thermo: &thermo_label,
            status: status_label(report.status),
            iterations: report.iterations,
            fault: report.fault.as_ref().map(|event| event.fault.to_string()),
        };
        summary::write_sidecar(&summary::sidecar_path(&cli.output), &meta, &report.summary)?;
    }

    print_report(&report, simulator.config().grain.initial_port_radius_m);
    report.into_result()?;
    Ok(())
}

fn status_label(status: BurnStatus) -> &'static str {
    match status {
        BurnStatus::Uninitialized => "uninitialized",
        BurnStatus::Running => "running",
        BurnStatus::CompletedNormal => "completed",
        BurnStatus::CompletedFault => "fault",
        BurnStatus::CompletedMaxIterations => "did_not_converge",
    }
}

fn print_report(report: &BurnReport, initial_port_radius_m: f64) {
    let s = &report.summary;
    println!("Engine: {}", s.engine);
    println!("Status: {}", status_label(report.status));
    if let Some(event) = &report.fault {
        println!("First fault at {:.4} s: {}", event.time, event.fault);
    }
    println!("Maximum pressure: {:.3} bar", pa_to_bar(s.peak_pressure_pa));
    println!("Initial port diameter: {:.3} mm", m_to_mm(2.0 * initial_port_radius_m));
    println!("Final port diameter: {:.3} mm", m_to_mm(2.0 * s.final_port_radius_m));
    println!("Pre-combustion chamber length: {:.3} mm", m_to_mm(s.pre_chamber_length_m));
    println!("Post-combustion chamber length: {:.3} mm", m_to_mm(s.post_chamber_length_m));
    println!("Fuel burned: {:.4} kg", s.fuel_mass_burned_kg);
    println!("Oxidizer burned: {:.4} kg", s.oxidizer_mass_burned_kg);
    println!("Average O/F: {:.3}", s.average_mixture_ratio);
    println!("Burn time: {:.4} s", s.burn_time_s);
    println!("Peak thrust: {:.3} N", s.peak_thrust_n);
    println!("Average thrust: {:.3} N", s.average_thrust_n);
    println!("Total impulse: {:.3} N·s", s.total_impulse_n_s);
    println!("Average Isp: {:.2} s", s.specific_impulse_s);
    if let (Some(hoop), Some(factor)) = (s.hoop_stress_pa, s.safety_factor) {
        println!("Hoop stress: {:.3} MPa", hoop / 1.0e6);
        println!("Wall safety factor: {:.3}", factor);
    }
}
