//! Append-only step records and derived burn statistics.

use hybrid_core::constants::G0;
use hybrid_core::geometry::{annulus_volume, circle_area};
use serde::Serialize;

use crate::engine::EngineConfig;
use crate::error::NumericalFault;

/// Snapshot of one integration step, taken after the state update.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub time: f64,
    pub dt: f64,
    pub chamber_pressure: f64,
    pub thrust: f64,
    pub port_radius: f64,
    pub mixture_ratio: f64,
    pub oxidizer_mass_flow_rate: f64,
    pub oxidizer_mass_remaining: f64,
    pub fuel_mass_flow_rate: f64,
    pub nozzle_mass_flow_rate: f64,
    pub regression_rate: f64,
    pub specific_impulse: f64,
    pub fault: Option<NumericalFault>,
    /// The mixture ratio was clamped into the thermo domain and the step burned normally;
    /// `fault` keeps the out-of-range value.
    pub clamped: bool,
}

impl StepRecord {
    /// A fault that discarded or held the step. Clamped steps do not count.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some() && !self.clamped
    }
}

/// Ordered history of a burn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultLog {
    records: Vec<StepRecord>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepRecord> {
        self.records.iter()
    }

    pub fn thrusts(&self) -> Vec<f64> {
        self.series(|r| r.thrust)
    }

    pub fn port_radii(&self) -> Vec<f64> {
        self.series(|r| r.port_radius)
    }

    /// First step that faulted, with the burn time of its record.
    pub fn first_fault(&self) -> Option<(f64, &NumericalFault)> {
        self.records
            .iter()
            .filter(|r| r.is_faulted())
            .find_map(|r| r.fault.as_ref().map(|fault| (r.time, fault)))
    }

    fn series(&self, field: impl Fn(&StepRecord) -> f64) -> Vec<f64> {
        self.records.iter().map(field).collect()
    }

    /// Reduce the history to the figures printed after a burn.
    pub fn summarize(&self, config: &EngineConfig) -> BurnSummary {
        let initial_radius = config.grain.initial_port_radius_m;
        let initial_oxidizer = config.oxidizer.initial_mass_kg;

        let burn_time = self.last().map_or(0.0, |r| r.time);
        let final_radius = self.last().map_or(initial_radius, |r| r.port_radius);
        let final_oxidizer = self.last().map_or(initial_oxidizer, |r| r.oxidizer_mass_remaining);

        let total_impulse: f64 = self.records.iter().map(|r| r.thrust * r.dt).sum();
        let peak_thrust = self.records.iter().map(|r| r.thrust).fold(0.0, f64::max);
        let peak_pressure = self
            .records
            .iter()
            .map(|r| r.chamber_pressure)
            .fold(0.0, f64::max);
        let average_thrust = if burn_time > 0.0 {
            total_impulse / burn_time
        } else {
            0.0
        };

        let (mr_sum, mr_count) = self
            .records
            .iter()
            .filter(|r| !r.is_faulted())
            .fold((0.0, 0usize), |(sum, n), r| (sum + r.mixture_ratio, n + 1));
        let average_mixture_ratio = if mr_count > 0 {
            mr_sum / mr_count as f64
        } else {
            0.0
        };

        let fuel_mass_burned = annulus_volume(initial_radius, final_radius, config.grain.length_m)
            * config.grain.density_kg_m3;
        let oxidizer_mass_burned = initial_oxidizer - final_oxidizer.max(0.0);
        let propellant = fuel_mass_burned + oxidizer_mass_burned;
        let specific_impulse = if propellant > 0.0 {
            total_impulse / (propellant * G0)
        } else {
            0.0
        };

        let (hoop_stress, safety_factor) = match config.wall {
            Some(wall) => {
                let hoop = peak_pressure * final_radius / wall.thickness_m;
                let factor = if hoop > 0.0 {
                    wall.yield_strength_pa / hoop
                } else {
                    f64::INFINITY
                };
                (Some(hoop), Some(factor))
            }
            None => (None, None),
        };

        let port_area = circle_area(final_radius);
        BurnSummary {
            engine: config.name.clone(),
            steps: self.len(),
            faulted_steps: self.records.iter().filter(|r| r.is_faulted()).count(),
            clamped_steps: self.records.iter().filter(|r| r.clamped).count(),
            burn_time_s: burn_time,
            total_impulse_n_s: total_impulse,
            average_thrust_n: average_thrust,
            peak_thrust_n: peak_thrust,
            peak_pressure_pa: peak_pressure,
            average_mixture_ratio,
            fuel_mass_burned_kg: fuel_mass_burned,
            oxidizer_mass_burned_kg: oxidizer_mass_burned,
            specific_impulse_s: specific_impulse,
            final_port_radius_m: final_radius,
            pre_chamber_length_m: config.pre_chamber_volume_m3 / port_area,
            post_chamber_length_m: config.post_chamber_volume_m3 / port_area,
            hoop_stress_pa: hoop_stress,
            safety_factor,
        }
    }
}

impl<'a> IntoIterator for &'a ResultLog {
    type Item = &'a StepRecord;
    type IntoIter = std::slice::Iter<'a, StepRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Derived statistics for one burn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnSummary {
    pub engine: String,
    pub steps: usize,
    pub faulted_steps: usize,
    /// Steps whose mixture ratio was clamped into the thermo domain.
    pub clamped_steps: usize,
    pub burn_time_s: f64,
    pub total_impulse_n_s: f64,
    pub average_thrust_n: f64,
    pub peak_thrust_n: f64,
    pub peak_pressure_pa: f64,
    pub average_mixture_ratio: f64,
    pub fuel_mass_burned_kg: f64,
    pub oxidizer_mass_burned_kg: f64,
    pub specific_impulse_s: f64,
    pub final_port_radius_m: f64,
    /// Pre-combustion chamber volume expressed as a length of final port.
    pub pre_chamber_length_m: f64,
    pub post_chamber_length_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoop_stress_pa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_factor: Option<f64>,
}

impl BurnSummary {
    /// True when every reported figure is a finite number.
    pub fn is_finite(&self) -> bool {
        [
            self.burn_time_s,
            self.total_impulse_n_s,
            self.average_thrust_n,
            self.peak_thrust_n,
            self.peak_pressure_pa,
            self.average_mixture_ratio,
            self.fuel_mass_burned_kg,
            self.oxidizer_mass_burned_kg,
            self.specific_impulse_s,
            self.final_port_radius_m,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn record(time: f64, thrust: f64, pressure: f64, radius: f64, ox_left: f64) -> StepRecord {
        StepRecord {
            time,
            dt: 0.5,
            chamber_pressure: pressure,
            thrust,
            port_radius: radius,
            mixture_ratio: 4.0,
            oxidizer_mass_flow_rate: 0.2,
            oxidizer_mass_remaining: ox_left,
            fuel_mass_flow_rate: 0.05,
            nozzle_mass_flow_rate: 0.25,
            regression_rate: 1e-3,
            specific_impulse: 200.0,
            fault: None,
            clamped: false,
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::builder("summary")
            .grain_length(0.2)
            .initial_port_radius(0.01)
            .grain_density(900.0)
            .oxidizer_mass(0.2)
            .chamber_volumes(1e-4, 5e-5)
            .wall(0.005, 2.0e8)
            .build()
            .unwrap()
    }

    #[test]
    fn summary_integrates_left_riemann() {
        let mut log = ResultLog::new();
        log.push(record(0.5, 100.0, 2.0e6, 0.011, 0.1));
        log.push(record(1.0, 300.0, 3.0e6, 0.012, -0.01));
        let summary = log.summarize(&config());

        assert_eq!(summary.steps, 2);
        assert!((summary.total_impulse_n_s - 200.0).abs() < 1e-12);
        assert!((summary.average_thrust_n - 200.0).abs() < 1e-12);
        assert_eq!(summary.peak_thrust_n, 300.0);
        assert_eq!(summary.peak_pressure_pa, 3.0e6);
        assert!((summary.oxidizer_mass_burned_kg - 0.2).abs() < 1e-12);

        let fuel = PI * (0.012f64.powi(2) - 0.01f64.powi(2)) * 0.2 * 900.0;
        assert!((summary.fuel_mass_burned_kg - fuel).abs() < 1e-12);
        let isp = 200.0 / ((fuel + 0.2) * G0);
        assert!((summary.specific_impulse_s - isp).abs() < 1e-9);

        let hoop = 3.0e6 * 0.012 / 0.005;
        assert!((summary.hoop_stress_pa.unwrap() - hoop).abs() < 1e-6);
        assert!((summary.safety_factor.unwrap() - 2.0e8 / hoop).abs() < 1e-9);
        assert!((summary.pre_chamber_length_m - 1e-4 / (PI * 0.012 * 0.012)).abs() < 1e-12);
    }

    #[test]
    fn faulted_records_are_excluded_from_mixture_average() {
        let mut log = ResultLog::new();
        log.push(record(0.5, 100.0, 2.0e6, 0.011, 0.1));
        let mut faulted = record(1.0, 0.0, 2.0e6, 0.011, 0.0);
        faulted.mixture_ratio = 40.0;
        faulted.fault = Some(NumericalFault::NonPositiveFuelFlow(0.0));
        log.push(faulted);

        let summary = log.summarize(&config());
        assert_eq!(summary.average_mixture_ratio, 4.0);
        assert_eq!(summary.faulted_steps, 1);
        assert_eq!(log.first_fault().map(|(t, _)| t), Some(1.0));
    }

    #[test]
    fn clamped_records_count_toward_mixture_average() {
        let mut log = ResultLog::new();
        let mut clamped = record(0.5, 100.0, 2.0e6, 0.011, 0.1);
        clamped.mixture_ratio = 3.0;
        clamped.fault = Some(NumericalFault::MixtureOutOfRange {
            mixture_ratio: 5.5,
            min: 1.0,
            max: 3.0,
        });
        clamped.clamped = true;
        log.push(clamped);
        log.push(record(1.0, 100.0, 2.0e6, 0.011, 0.0));

        let summary = log.summarize(&config());
        assert_eq!(summary.average_mixture_ratio, 3.5);
        assert_eq!(summary.faulted_steps, 0);
        assert_eq!(summary.clamped_steps, 1);
        assert!(log.first_fault().is_none());
    }

    #[test]
    fn empty_log_summarizes_to_zero() {
        let summary = ResultLog::new().summarize(&config());
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.burn_time_s, 0.0);
        assert_eq!(summary.total_impulse_n_s, 0.0);
        assert_eq!(summary.fuel_mass_burned_kg, 0.0);
        assert_eq!(summary.oxidizer_mass_burned_kg, 0.0);
        assert!(summary.is_finite());
    }
}
