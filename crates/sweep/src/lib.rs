//! Two-parameter design sweeps.
//!
//! Every grid cell gets its own [`EngineConfig`] and runs an independent burn on a pool of
//! scoped worker threads. A cell that fails (bad configuration, numerical fault, iteration
//! ceiling, non-finite result, even a panic) is recorded as such and never aborts the sweep.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use hybrid_ballistics::{
    BurnSimulator, BurnStatus, BurnSummary, ConfigurationError, EngineConfig, FaultEvent,
    NullObserver, SimulationSettings,
};
use hybrid_thermo::ThermoProvider;
use tracing::{debug, info, warn};

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// One named sweep dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepAxis {
    pub name: String,
    pub values: Vec<f64>,
}

impl SweepAxis {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn linspace(name: impl Into<String>, start: f64, end: f64, n: usize) -> Self {
        Self::new(name, linspace(start, end, n))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepRequest {
    pub x_axis: SweepAxis,
    pub y_axis: SweepAxis,
    /// Worker count; defaults to the available parallelism.
    pub threads: Option<usize>,
}

impl SweepRequest {
    pub fn new(x_axis: SweepAxis, y_axis: SweepAxis) -> Self {
        Self {
            x_axis,
            y_axis,
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// What happened in one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Completed(BurnSummary),
    InvalidConfiguration(ConfigurationError),
    Fault(FaultEvent),
    DidNotConverge { iterations: usize, time: f64 },
    NonFinite(BurnSummary),
    Panicked(String),
}

impl CellOutcome {
    pub fn summary(&self) -> Option<&BurnSummary> {
        match self {
            CellOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CellOutcome::Completed(_))
    }

    /// Short status tag used in exported matrices.
    pub fn label(&self) -> &'static str {
        match self {
            CellOutcome::Completed(_) => "completed",
            CellOutcome::InvalidConfiguration(_) => "invalid_configuration",
            CellOutcome::Fault(_) => "fault",
            CellOutcome::DidNotConverge { .. } => "did_not_converge",
            CellOutcome::NonFinite(_) => "non_finite",
            CellOutcome::Panicked(_) => "panicked",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepCell {
    pub x: f64,
    pub y: f64,
    pub outcome: CellOutcome,
}

/// Sweep results, row-major over the y axis (`cells[iy * nx + ix]`).
#[derive(Debug, Clone, PartialEq)]
pub struct SweepMatrix {
    pub x_axis: SweepAxis,
    pub y_axis: SweepAxis,
    cells: Vec<SweepCell>,
}

impl SweepMatrix {
    pub fn cells(&self) -> &[SweepCell] {
        &self.cells
    }

    pub fn cell(&self, ix: usize, iy: usize) -> Option<&SweepCell> {
        if ix >= self.x_axis.len() {
            return None;
        }
        self.cells.get(iy * self.x_axis.len() + ix)
    }

    pub fn completed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.outcome.is_completed()).count()
    }

    /// Metric per cell as `grid[iy][ix]`; cells without a completed burn are NaN.
    pub fn metric_grid<F>(&self, metric: F) -> Vec<Vec<f64>>
    where
        F: Fn(&BurnSummary) -> f64,
    {
        let nx = self.x_axis.len();
        if nx == 0 {
            return Vec::new();
        }
        self.cells
            .chunks(nx)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.outcome.summary().map_or(f64::NAN, &metric))
                    .collect()
            })
            .collect()
    }
}

/// Run one burn per grid cell.
///
/// `build(x, y)` produces the engine and settings for a cell. The provider is shared by all
/// workers and must therefore be thread-safe (guaranteed by [`ThermoProvider`]).
pub fn run_sweep<F>(request: &SweepRequest, thermo: &dyn ThermoProvider, build: F) -> SweepMatrix
where
    F: Fn(f64, f64) -> Result<(EngineConfig, SimulationSettings), ConfigurationError> + Sync,
{
    let nx = request.x_axis.len();
    let total = nx * request.y_axis.len();
    let workers = request
        .threads
        .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
        .clamp(1, total.max(1));
    info!(
        x = %request.x_axis.name,
        y = %request.y_axis.name,
        cells = total,
        workers,
        "starting sweep"
    );

    let coordinates = |index: usize| {
        (
            request.x_axis.values[index % nx],
            request.y_axis.values[index / nx],
        )
    };

    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<SweepCell>> = vec![None; total];
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= total {
                            break;
                        }
                        let (x, y) = coordinates(index);
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            run_cell(thermo, &build, x, y)
                        }))
                        .unwrap_or_else(|payload| {
                            let message = panic_message(payload.as_ref());
                            warn!(x, y, %message, "sweep cell panicked");
                            CellOutcome::Panicked(message)
                        });
                        done.push((index, SweepCell { x, y, outcome }));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            if let Ok(done) = handle.join() {
                for (index, cell) in done {
                    slots[index] = Some(cell);
                }
            }
        }
    });

    let cells: Vec<SweepCell> = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let (x, y) = coordinates(index);
                SweepCell {
                    x,
                    y,
                    outcome: CellOutcome::Panicked("worker thread lost".to_string()),
                }
            })
        })
        .collect();

    let matrix = SweepMatrix {
        x_axis: request.x_axis.clone(),
        y_axis: request.y_axis.clone(),
        cells,
    };
    info!(
        cells = total,
        completed = matrix.completed_count(),
        "sweep finished"
    );
    matrix
}

fn run_cell<F>(thermo: &dyn ThermoProvider, build: &F, x: f64, y: f64) -> CellOutcome
where
    F: Fn(f64, f64) -> Result<(EngineConfig, SimulationSettings), ConfigurationError>,
{
    let (config, settings) = match build(x, y) {
        Ok(pair) => pair,
        Err(err) => {
            debug!(x, y, error = %err, "sweep cell rejected");
            return CellOutcome::InvalidConfiguration(err);
        }
    };

    let mut simulator = BurnSimulator::new(config, thermo, settings);
    let report = match simulator.run(&mut NullObserver) {
        Ok(report) => report,
        Err(err) => {
            debug!(x, y, error = %err, "sweep cell rejected");
            return CellOutcome::InvalidConfiguration(err);
        }
    };

    // Lenient runs reach depletion even when every step was held; those are not results.
    let held = report.log.first_fault().map(|(time, fault)| FaultEvent {
        time,
        fault: fault.clone(),
    });
    match report.status {
        BurnStatus::CompletedNormal => match held {
            Some(event) => {
                debug!(
                    x,
                    y,
                    burn_time_s = event.time,
                    fault = %event.fault,
                    "sweep cell held faults"
                );
                CellOutcome::Fault(event)
            }
            None if report.summary.is_finite() => CellOutcome::Completed(report.summary),
            None => CellOutcome::NonFinite(report.summary),
        },
        BurnStatus::CompletedFault => match report.fault {
            Some(event) => {
                debug!(x, y, burn_time_s = event.time, fault = %event.fault, "sweep cell faulted");
                CellOutcome::Fault(event)
            }
            None => CellOutcome::NonFinite(report.summary),
        },
        _ => CellOutcome::DidNotConverge {
            iterations: report.iterations,
            time: report.final_state.time,
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybrid_thermo::FixedThermo;

    #[test]
    fn linspace_includes_both_ends() {
        let values = linspace(1.0, 2.0, 5);
        assert_eq!(values, vec![1.0, 1.25, 1.5, 1.75, 2.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    fn small_engine(
        oxidizer_mass: f64,
    ) -> Result<(EngineConfig, SimulationSettings), ConfigurationError> {
        let config = EngineConfig::builder("cell")
            .grain_length(0.2)
            .initial_port_radius(0.01)
            .regression(1.55e-4, 0.5, 0.0)
            .throat_area(1.5e-4)
            .combustion_efficiency(1.0)
            .oxidizer_mass(oxidizer_mass)
            .constant_oxidizer_flow(0.3)
            .build()?;
        Ok((config, SimulationSettings::default()))
    }

    #[test]
    fn bad_cells_do_not_abort_the_sweep() {
        let thermo = FixedThermo::new(1.2, 1800.0, 3000.0, 1500.0);
        let request = SweepRequest::new(
            SweepAxis::new("oxidizer_mass", vec![0.01, -1.0]),
            SweepAxis::new("case", vec![0.0, 1.0]),
        )
        .with_threads(2);

        let matrix = run_sweep(&request, &thermo, |x, y| {
            if y > 0.5 && x > 0.0 {
                panic!("synthetic failure");
            }
            small_engine(x)
        });

        assert_eq!(matrix.cells().len(), 4);
        assert!(matrix.cell(0, 0).unwrap().outcome.is_completed());
        assert!(matches!(
            matrix.cell(1, 0).unwrap().outcome,
            CellOutcome::InvalidConfiguration(_)
        ));
        assert!(matches!(
            &matrix.cell(0, 1).unwrap().outcome,
            CellOutcome::Panicked(message) if message == "synthetic failure"
        ));

        let grid = matrix.metric_grid(|s| s.total_impulse_n_s);
        assert_eq!(grid.len(), 2);
        assert!(grid[0][0] > 0.0);
        assert!(grid[0][1].is_nan());
        assert!(grid[1][0].is_nan());
        assert!(grid[1][1].is_nan());
    }
}
