use hybrid_thermo::ThermoError;
use thiserror::Error;

/// Invalid static input, detected before any stepping.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} = {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("maximum port radius {max} m is below the initial port radius {initial} m")]
    PortRadiusOrder { initial: f64, max: f64 },
    #[error("wall thickness must be positive, got {0} m")]
    WallThickness(f64),
    #[error("wall thickness and yield strength must be given together")]
    IncompleteWall,
    #[error("iteration ceiling must be at least 1")]
    ZeroIterationCeiling,
}

/// Per-step numerical condition that invalidates the step result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NumericalFault {
    #[error("fuel mass flow {0} kg/s is not positive")]
    NonPositiveFuelFlow(f64),
    #[error("mixture ratio {mixture_ratio:.4} outside chemistry domain [{min:.4}, {max:.4}]")]
    MixtureOutOfRange {
        mixture_ratio: f64,
        min: f64,
        max: f64,
    },
    #[error("ratio of specific heats {0} must exceed 1")]
    GammaOutOfRange(f64),
    #[error("chamber gas constant × temperature {0} is not positive")]
    NonPositiveGasConstant(f64),
    #[error("{0} became non-finite")]
    NonFinite(&'static str),
    #[error("chamber pressure {0} Pa is not physical")]
    NonPhysicalPressure(f64),
    #[error("thermochemical lookup failed: {0}")]
    Thermo(ThermoError),
}

impl From<ThermoError> for NumericalFault {
    fn from(err: ThermoError) -> Self {
        match err {
            ThermoError::MixtureOutOfRange {
                mixture_ratio,
                min,
                max,
            } => NumericalFault::MixtureOutOfRange {
                mixture_ratio,
                min,
                max,
            },
            other => NumericalFault::Thermo(other),
        }
    }
}

impl NumericalFault {
    /// Faults that lenient mode resolves by clamping the mixture ratio into range.
    pub fn is_mixture_range(&self) -> bool {
        matches!(self, NumericalFault::MixtureOutOfRange { .. })
    }

    /// Stable snake_case tag for tabular output.
    pub fn kind(&self) -> &'static str {
        match self {
            NumericalFault::NonPositiveFuelFlow(_) => "non_positive_fuel_flow",
            NumericalFault::MixtureOutOfRange { .. } => "mixture_out_of_range",
            NumericalFault::GammaOutOfRange(_) => "gamma_out_of_range",
            NumericalFault::NonPositiveGasConstant(_) => "non_positive_gas_constant",
            NumericalFault::NonFinite(_) => "non_finite",
            NumericalFault::NonPhysicalPressure(_) => "non_physical_pressure",
            NumericalFault::Thermo(_) => "thermo",
        }
    }
}

/// Terminal failure of a run, as surfaced by [`crate::BurnReport::into_result`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("numerical fault at {time:.4} s: {fault}")]
    Numerical { time: f64, fault: NumericalFault },
    #[error(
        "iteration ceiling reached after {iterations} steps at {time:.4} s \
         without depleting the oxidizer"
    )]
    ResourceExhausted { iterations: usize, time: f64 },
}

/// Helpers for range checks shared by config and settings validation.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_non_negative(
    field: &'static str,
    value: f64,
) -> Result<(), ConfigurationError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::Negative { field, value })
    }
}

pub(crate) fn ensure_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigurationError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
