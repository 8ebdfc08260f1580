//! Closed-form design relations used before a motor is simulated.

pub mod fit;
pub mod injector;
pub mod preliminary;

pub use fit::{
    FitError, PowerLawFit, RegressionPoint, fit_fixed_exponent, fit_log_linear, fit_power_law,
};
pub use injector::{InjectorSizing, size_injector};
pub use preliminary::{MotorSizing, NozzlePoint, SizingInputs, size_motor};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SizingError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} = {value} must lie in [0, 1)")]
    Fraction { field: &'static str, value: f64 },
    #[error("port ratio must exceed 1, got {0}")]
    PortRatio(f64),
    #[error("injector pressure drop leaves no chamber pressure (tank {tank_bar} bar)")]
    NoChamberPressure { tank_bar: f64 },
}

pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<(), SizingError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SizingError::NonPositive { field, value })
    }
}
