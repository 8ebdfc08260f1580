//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod history {
    use std::io::{self, Write};

    use hybrid_ballistics::{ResultLog, StepRecord};

    const HEADER: &str = "time_s,dt_s,chamber_pressure_pa,chamber_pressure_bar,thrust_n,\
                          port_radius_m,mixture_ratio,oxidizer_mass_flow_kg_s,oxidizer_mass_kg,\
                          fuel_mass_flow_kg_s,nozzle_mass_flow_kg_s,regression_rate_m_s,\
                          specific_impulse_s,fault";

    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// Serialize one step, matching the header ordering. Clean steps leave `fault` empty.
    pub fn write_record(writer: &mut dyn Write, record: &StepRecord) -> io::Result<()> {
        writeln!(
            writer,
            "{:.6},{},{:.3},{:.5},{:.5},{:.7},{:.5},{:.6},{:.6},{:.6},{:.6},{:e},{:.3},{}",
            record.time,
            record.dt,
            record.chamber_pressure,
            record.chamber_pressure / 1.0e5,
            record.thrust,
            record.port_radius,
            record.mixture_ratio,
            record.oxidizer_mass_flow_rate,
            record.oxidizer_mass_remaining,
            record.fuel_mass_flow_rate,
            record.nozzle_mass_flow_rate,
            record.regression_rate,
            record.specific_impulse,
            record.fault.as_ref().map_or("", |f| f.kind()),
        )
    }

    /// Header plus one row per record.
    pub fn write_log(writer: &mut dyn Write, log: &ResultLog) -> io::Result<()> {
        write_header(writer)?;
        for record in log {
            write_record(writer, record)?;
        }
        writer.flush()
    }
}

pub mod sweep {
    use std::io::{self, Write};

    use hybrid_sweep::{SweepCell, SweepMatrix};

    /// Metric columns written after the two axis columns and the status column.
    pub const METRICS: [&str; 8] = [
        "burn_time_s",
        "total_impulse_n_s",
        "average_thrust_n",
        "peak_thrust_n",
        "peak_pressure_bar",
        "specific_impulse_s",
        "average_mixture_ratio",
        "final_port_radius_m",
    ];

    /// Header row: the two axis names, `status`, then [`METRICS`].
    pub fn write_header(writer: &mut dyn Write, x_name: &str, y_name: &str) -> io::Result<()> {
        writeln!(writer, "{},{},status,{}", x_name, y_name, METRICS.join(","))
    }

    fn metric_values(cell: &SweepCell) -> [f64; 8] {
        match cell.outcome.summary() {
            Some(s) => [
                s.burn_time_s,
                s.total_impulse_n_s,
                s.average_thrust_n,
                s.peak_thrust_n,
                s.peak_pressure_pa / 1.0e5,
                s.specific_impulse_s,
                s.average_mixture_ratio,
                s.final_port_radius_m,
            ],
            None => [f64::NAN; 8],
        }
    }

    pub fn write_cell(writer: &mut dyn Write, cell: &SweepCell) -> io::Result<()> {
        write!(writer, "{},{},{}", cell.x, cell.y, cell.outcome.label())?;
        for value in metric_values(cell) {
            write!(writer, ",{:.6}", value)?;
        }
        writeln!(writer)
    }

    pub fn write_matrix(writer: &mut dyn Write, matrix: &SweepMatrix) -> io::Result<()> {
        write_header(writer, &matrix.x_axis.name, &matrix.y_axis.name)?;
        for cell in matrix.cells() {
            write_cell(writer, cell)?;
        }
        writer.flush()
    }
}

pub mod summary {
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};

    use hybrid_ballistics::BurnSummary;
    use serde::Serialize;
    use serde_json::to_writer_pretty;

    /// Run context written alongside the summary figures.
    #[derive(Debug)]
    pub struct Metadata<'a> {
        pub source: &'a str,
        pub thermo: &'a str,
        pub status: &'a str,
        pub iterations: usize,
        pub fault: Option<String>,
    }

    #[derive(Serialize)]
    struct SummarySidecar<'a> {
        generated_utc: String,
        source: &'a str,
        thermo: &'a str,
        status: &'a str,
        iterations: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        fault: Option<&'a str>,
        #[serde(flatten)]
        summary: &'a BurnSummary,
    }

    /// Path of the JSON sidecar that accompanies a history CSV.
    pub fn sidecar_path(history: &Path) -> PathBuf {
        let parent = history.parent().unwrap_or_else(|| Path::new("."));
        let stem = history
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("burn");
        parent.join(format!("{}_summary.json", stem))
    }

    pub fn write_sidecar(
        path: &Path,
        meta: &Metadata<'_>,
        summary: &BurnSummary,
    ) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let sidecar = SummarySidecar {
            generated_utc: chrono::Utc::now().to_rfc3339(),
            source: meta.source,
            thermo: meta.thermo,
            status: meta.status,
            iterations: meta.iterations,
            fault: meta.fault.as_deref(),
            summary,
        };
        to_writer_pretty(File::create(path)?, &sidecar)?;
        Ok(())
    }
}
