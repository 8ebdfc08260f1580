//! Time-marching driver.

use std::time::Instant;

use hybrid_core::constants::G0;
use hybrid_core::units::pa_to_bar;
use hybrid_thermo::{ThermoError, ThermoProvider, ThermoState};
use tracing::{debug, info, warn};

use crate::engine::EngineConfig;
use crate::error::{ConfigurationError, NumericalFault, SimulationError};
use crate::log::{BurnSummary, ResultLog, StepRecord};
use crate::nozzle::{choked_mass_flow, specific_gas_constant, thrust};
use crate::observer::BurnObserver;
use crate::regression::RegressionOutput;
use crate::settings::{FaultPolicy, SimulationSettings};
use crate::state::ChamberState;

/// Lifecycle of a [`BurnSimulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnStatus {
    Uninitialized,
    Running,
    /// Oxidizer depleted or the measured feed ran out of data.
    CompletedNormal,
    /// A strict-mode step faulted.
    CompletedFault,
    /// Iteration ceiling or wall-clock deadline reached first.
    CompletedMaxIterations,
}

impl BurnStatus {
    pub fn is_complete(self) -> bool {
        matches!(
            self,
            BurnStatus::CompletedNormal
                | BurnStatus::CompletedFault
                | BurnStatus::CompletedMaxIterations
        )
    }
}

/// Result of advancing one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub state: ChamberState,
    pub record: StepRecord,
    pub fault: Option<NumericalFault>,
}

/// First fault seen during a run, stamped with the burn time.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultEvent {
    pub time: f64,
    pub fault: NumericalFault,
}

#[derive(Debug, Clone)]
pub struct BurnReport {
    pub status: BurnStatus,
    pub final_state: ChamberState,
    pub log: ResultLog,
    pub summary: BurnSummary,
    pub iterations: usize,
    pub fault: Option<FaultEvent>,
}

impl BurnReport {
    /// Turn abnormal completions into errors.
    pub fn into_result(self) -> Result<Self, SimulationError> {
        match self.status {
            BurnStatus::CompletedFault => {
                let (time, fault) = match self.fault {
                    Some(event) => (event.time, event.fault),
                    None => (
                        self.final_state.time,
                        NumericalFault::NonFinite("fault record"),
                    ),
                };
                Err(SimulationError::Numerical { time, fault })
            }
            BurnStatus::CompletedMaxIterations => Err(SimulationError::ResourceExhausted {
                iterations: self.iterations,
                time: self.final_state.time,
            }),
            _ => Ok(self),
        }
    }
}

/// Successful evaluation of a step: the advanced state and its record.
struct Advance {
    state: ChamberState,
    record: StepRecord,
}

/// Advance `state` by `dt`.
///
/// Pure: the same inputs always produce the same outcome, and `state` is never touched.
/// In strict mode a faulting step returns the input state unchanged. In lenient mode an
/// out-of-range mixture ratio is clamped into the provider's domain, and any other fault
/// holds pressure, port radius and fuel flow while time and oxidizer still advance.
pub fn step(
    state: &ChamberState,
    config: &EngineConfig,
    thermo: &dyn ThermoProvider,
    policy: FaultPolicy,
    dt: f64,
) -> StepOutcome {
    let oxidizer_flow = config.oxidizer.feed.mass_flow_rate(state.time);
    let regression = config.regression.regression_rate(
        oxidizer_flow,
        state.fuel_mass_flow_rate,
        state.port_radius,
        &config.grain,
    );

    match advance(state, config, thermo, policy, oxidizer_flow, &regression, dt) {
        Ok(Advance { state, record }) => {
            let fault = record.fault.clone();
            StepOutcome {
                state,
                record,
                fault,
            }
        }
        Err(fault) => {
            let next = match policy {
                FaultPolicy::Strict => *state,
                FaultPolicy::Lenient => ChamberState {
                    time: state.time + dt,
                    oxidizer_mass_remaining: state.oxidizer_mass_remaining - oxidizer_flow * dt,
                    ..*state
                },
            };
            let mixture_ratio = if regression.fuel_mass_flow_rate > 0.0 {
                oxidizer_flow / regression.fuel_mass_flow_rate
            } else {
                f64::NAN
            };
            let record = StepRecord {
                time: next.time,
                dt,
                chamber_pressure: next.chamber_pressure,
                thrust: 0.0,
                port_radius: next.port_radius,
                mixture_ratio,
                oxidizer_mass_flow_rate: oxidizer_flow,
                oxidizer_mass_remaining: next.oxidizer_mass_remaining,
                fuel_mass_flow_rate: regression.fuel_mass_flow_rate,
                nozzle_mass_flow_rate: 0.0,
                regression_rate: regression.regression_rate,
                specific_impulse: 0.0,
                fault: Some(fault.clone()),
                clamped: false,
            };
            StepOutcome {
                state: next,
                record,
                fault: Some(fault),
            }
        }
    }
}

fn advance(
    state: &ChamberState,
    config: &EngineConfig,
    thermo: &dyn ThermoProvider,
    policy: FaultPolicy,
    oxidizer_flow: f64,
    regression: &RegressionOutput,
    dt: f64,
) -> Result<Advance, NumericalFault> {
    let fuel_flow = regression.fuel_mass_flow_rate;
    if !(fuel_flow > 0.0) {
        return Err(NumericalFault::NonPositiveFuelFlow(fuel_flow));
    }
    let mut mixture_ratio = oxidizer_flow / fuel_flow;
    if !(mixture_ratio.is_finite() && mixture_ratio > 0.0) {
        return Err(NumericalFault::NonPositiveFuelFlow(fuel_flow));
    }

    let mut clamped = None;
    if policy == FaultPolicy::Lenient {
        if let Some((min, max)) = thermo.mixture_ratio_bounds() {
            if mixture_ratio < min || mixture_ratio > max {
                clamped = Some(NumericalFault::MixtureOutOfRange {
                    mixture_ratio,
                    min,
                    max,
                });
                mixture_ratio = mixture_ratio.clamp(min, max);
            }
        }
    }

    let pressure_bar = pa_to_bar(state.chamber_pressure);
    let area_ratio = config.nozzle.area_ratio;
    let gas: ThermoState = match thermo.thermo_state(pressure_bar, mixture_ratio, area_ratio) {
        Ok(gas) => gas,
        Err(ThermoError::MixtureOutOfRange {
            mixture_ratio: requested,
            min,
            max,
        }) if policy == FaultPolicy::Lenient => {
            clamped = Some(NumericalFault::MixtureOutOfRange {
                mixture_ratio: requested,
                min,
                max,
            });
            mixture_ratio = requested.clamp(min, max);
            thermo.thermo_state(pressure_bar, mixture_ratio, area_ratio)?
        }
        Err(err) => return Err(err.into()),
    };

    let gas_constant = specific_gas_constant(gas.specific_heat_cp, gas.gamma);
    let nozzle = &config.nozzle;
    let nozzle_flow = choked_mass_flow(
        state.chamber_pressure,
        nozzle.throat_area_m2,
        gas.gamma,
        gas_constant,
        gas.chamber_temperature_k,
        nozzle.discharge_coefficient,
        config.combustion_efficiency,
    )?;

    let rt = gas_constant * gas.chamber_temperature_k;
    let volume = state.chamber_volume(config);
    let gas_density = state.chamber_pressure / rt;
    let pressure_rate = rt / volume
        * (regression.burn_area
            * regression.regression_rate
            * (config.grain.density_kg_m3 - gas_density)
            + oxidizer_flow
            - nozzle_flow);

    let chamber_pressure = state.chamber_pressure + pressure_rate * dt;
    if !chamber_pressure.is_finite() {
        return Err(NumericalFault::NonFinite("chamber pressure"));
    }
    if chamber_pressure <= 0.0 {
        return Err(NumericalFault::NonPhysicalPressure(chamber_pressure));
    }

    let mut port_radius = state.port_radius + regression.regression_rate * dt;
    if let Some(max) = config.grain.max_port_radius_m {
        port_radius = port_radius.min(max).max(state.port_radius);
    }

    let thrust = thrust(
        nozzle_flow,
        gas.characteristic_velocity_m_s,
        config.combustion_efficiency,
        nozzle.discharge_coefficient,
        nozzle.efficiency,
    );
    if !thrust.is_finite() {
        return Err(NumericalFault::NonFinite("thrust"));
    }
    let specific_impulse = if nozzle_flow > 0.0 {
        thrust / (nozzle_flow * G0)
    } else {
        0.0
    };

    let next = ChamberState {
        time: state.time + dt,
        oxidizer_mass_remaining: state.oxidizer_mass_remaining - oxidizer_flow * dt,
        port_radius,
        chamber_pressure,
        fuel_mass_flow_rate: fuel_flow,
    };

    Ok(Advance {
        state: next,
        record: StepRecord {
            time: next.time,
            dt,
            chamber_pressure,
            thrust,
            port_radius,
            mixture_ratio,
            oxidizer_mass_flow_rate: oxidizer_flow,
            oxidizer_mass_remaining: next.oxidizer_mass_remaining,
            fuel_mass_flow_rate: fuel_flow,
            nozzle_mass_flow_rate: nozzle_flow,
            regression_rate: regression.regression_rate,
            specific_impulse,
            clamped: clamped.is_some(),
            fault: clamped,
        },
    })
}

/// Drives one engine through a complete burn.
pub struct BurnSimulator<'a> {
    config: EngineConfig,
    thermo: &'a dyn ThermoProvider,
    settings: SimulationSettings,
    status: BurnStatus,
}

impl<'a> BurnSimulator<'a> {
    pub fn new(
        config: EngineConfig,
        thermo: &'a dyn ThermoProvider,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            config,
            thermo,
            settings,
            status: BurnStatus::Uninitialized,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn status(&self) -> BurnStatus {
        self.status
    }

    /// Validate the inputs and return the ignition state.
    pub fn initialize(&mut self) -> Result<ChamberState, ConfigurationError> {
        self.config.validate()?;
        self.settings.validate()?;
        self.status = BurnStatus::Running;
        Ok(ChamberState::initial(&self.config))
    }

    pub fn step(&self, state: &ChamberState, dt: f64) -> StepOutcome {
        step(
            state,
            &self.config,
            self.thermo,
            self.settings.fault_policy,
            dt,
        )
    }

    /// Run from ignition until a termination condition fires.
    ///
    /// Only configuration errors are returned as `Err`; faults and resource exhaustion are
    /// reported through [`BurnReport::status`].
    pub fn run(
        &mut self,
        observer: &mut dyn BurnObserver,
    ) -> Result<BurnReport, ConfigurationError> {
        let mut state = self.initialize()?;
        let feed_end = self.config.oxidizer.feed.end_time();
        debug!(
            engine = %self.config.name,
            oxidizer_kg = state.oxidizer_mass_remaining,
            ?feed_end,
            time_step = ?self.settings.time_step,
            policy = ?self.settings.fault_policy,
            "starting burn"
        );

        let started = Instant::now();
        let mut log = ResultLog::new();
        let mut iterations = 0usize;
        let mut first_fault: Option<FaultEvent> = None;
        let mut faulted = false;

        let status = loop {
            if state.is_depleted() {
                break BurnStatus::CompletedNormal;
            }
            if feed_end.is_some_and(|end| state.time >= end) {
                break BurnStatus::CompletedNormal;
            }
            if iterations >= self.settings.max_iterations {
                break BurnStatus::CompletedMaxIterations;
            }
            if self
                .settings
                .deadline
                .is_some_and(|deadline| started.elapsed() >= deadline)
            {
                break BurnStatus::CompletedMaxIterations;
            }

            let dt = self.settings.time_step.step_at(state.time);
            let outcome = self.step(&state, dt);
            iterations += 1;

            match &outcome.fault {
                Some(fault) => {
                    if !faulted {
                        observer.on_fault(outcome.record.time, fault);
                        faulted = true;
                    }
                    if first_fault.is_none() {
                        first_fault = Some(FaultEvent {
                            time: outcome.record.time,
                            fault: fault.clone(),
                        });
                    }
                }
                None if faulted => {
                    observer.on_fault_cleared(outcome.record.time);
                    faulted = false;
                }
                None => {}
            }

            let halt = outcome.fault.is_some() && self.settings.fault_policy == FaultPolicy::Strict;
            observer.on_step(&outcome.record);
            log.push(outcome.record);
            state = outcome.state;
            if halt {
                break BurnStatus::CompletedFault;
            }
        };

        self.status = status;
        observer.on_complete(status, &state);
        match (&status, &first_fault) {
            (BurnStatus::CompletedFault, Some(event)) => warn!(
                engine = %self.config.name,
                burn_time_s = event.time,
                fault = %event.fault,
                "burn halted by numerical fault"
            ),
            (BurnStatus::CompletedMaxIterations, _) => warn!(
                engine = %self.config.name,
                burn_time_s = state.time,
                iterations,
                "burn stopped before oxidizer depletion"
            ),
            _ => info!(
                engine = %self.config.name,
                burn_time_s = state.time,
                iterations,
                "burn complete"
            ),
        }

        let summary = log.summarize(&self.config);
        Ok(BurnReport {
            status,
            final_state: state,
            log,
            summary,
            iterations,
            fault: first_fault,
        })
    }
}
