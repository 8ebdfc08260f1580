//! Per-run integration settings.

use std::time::Duration;

use crate::error::{ConfigurationError, ensure_non_negative, ensure_positive};

/// Default iteration ceiling for a single burn.
pub const DEFAULT_MAX_ITERATIONS: usize = 200_000;

/// How the step size is chosen as the burn progresses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStepPolicy {
    Fixed(f64),
    /// `initial_dt` until `transition_time`, then `dt`.
    Staged {
        initial_dt: f64,
        transition_time: f64,
        dt: f64,
    },
}

impl TimeStepPolicy {
    /// 0.5 ms during ignition transients below 1 s, 1 ms afterwards.
    pub fn staged_default() -> Self {
        TimeStepPolicy::Staged {
            initial_dt: 5.0e-4,
            transition_time: 1.0,
            dt: 1.0e-3,
        }
    }

    pub fn step_at(&self, time: f64) -> f64 {
        match *self {
            TimeStepPolicy::Fixed(dt) => dt,
            TimeStepPolicy::Staged {
                initial_dt,
                transition_time,
                dt,
            } => {
                if time < transition_time {
                    initial_dt
                } else {
                    dt
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            TimeStepPolicy::Fixed(dt) => ensure_positive("time step", dt),
            TimeStepPolicy::Staged {
                initial_dt,
                transition_time,
                dt,
            } => {
                ensure_positive("initial time step", initial_dt)?;
                ensure_non_negative("time step transition", transition_time)?;
                ensure_positive("time step", dt)
            }
        }
    }
}

impl Default for TimeStepPolicy {
    fn default() -> Self {
        TimeStepPolicy::Fixed(1.0e-3)
    }
}

/// What to do when a step produces a [`crate::NumericalFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Reject the step and halt the run.
    #[default]
    Strict,
    /// Clamp out-of-range mixture ratios; hold the last valid state for other faults.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub time_step: TimeStepPolicy,
    pub max_iterations: usize,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
    pub fault_policy: FaultPolicy,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            time_step: TimeStepPolicy::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            deadline: None,
            fault_policy: FaultPolicy::Strict,
        }
    }
}

impl SimulationSettings {
    pub fn with_time_step(mut self, policy: TimeStepPolicy) -> Self {
        self.time_step = policy;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.time_step.validate()?;
        if self.max_iterations == 0 {
            return Err(ConfigurationError::ZeroIterationCeiling);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_policy_switches_at_transition() {
        let policy = TimeStepPolicy::staged_default();
        assert_eq!(policy.step_at(0.0), 5.0e-4);
        assert_eq!(policy.step_at(0.9995), 5.0e-4);
        assert_eq!(policy.step_at(1.0), 1.0e-3);
        assert_eq!(policy.step_at(3.2), 1.0e-3);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let settings = SimulationSettings::default().with_time_step(TimeStepPolicy::Fixed(0.0));
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::NonPositive { field: "time step", .. })
        ));
    }

    #[test]
    fn zero_iteration_ceiling_is_rejected() {
        let settings = SimulationSettings::default().with_max_iterations(0);
        assert_eq!(settings.validate(), Err(ConfigurationError::ZeroIterationCeiling));
    }
}
