//! Hooks for watching a burn as it runs.

use tracing::{info, warn};

use crate::error::NumericalFault;
use crate::log::StepRecord;
use crate::simulator::BurnStatus;
use crate::state::ChamberState;

/// Callbacks invoked by [`crate::BurnSimulator::run`]. Every method defaults to a no-op.
pub trait BurnObserver {
    fn on_step(&mut self, _record: &StepRecord) {}

    /// A step produced a fault while the previous step was clean.
    fn on_fault(&mut self, _time: f64, _fault: &NumericalFault) {}

    /// A clean step followed one or more faulted steps.
    fn on_fault_cleared(&mut self, _time: f64) {}

    fn on_complete(&mut self, _status: BurnStatus, _state: &ChamberState) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BurnObserver for NullObserver {}

/// Logs progress every `interval` steps plus fault transitions.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    interval: usize,
    steps: usize,
}

impl TracingObserver {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            steps: 0,
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl BurnObserver for TracingObserver {
    fn on_step(&mut self, record: &StepRecord) {
        self.steps += 1;
        if self.steps % self.interval == 0 {
            info!(
                burn_time_s = record.time,
                chamber_pressure_bar = record.chamber_pressure / 1.0e5,
                thrust_n = record.thrust,
                port_radius_m = record.port_radius,
                oxidizer_kg = record.oxidizer_mass_remaining,
                "burn progress"
            );
        }
    }

    fn on_fault(&mut self, time: f64, fault: &NumericalFault) {
        warn!(burn_time_s = time, %fault, "New engine fault at {time:.4} s");
    }

    fn on_fault_cleared(&mut self, time: f64) {
        info!(burn_time_s = time, "All faults cleared at {time:.4} s");
    }

    fn on_complete(&mut self, status: BurnStatus, state: &ChamberState) {
        info!(
            ?status,
            burn_time_s = state.time,
            steps = self.steps,
            "burn finished"
        );
    }
}
