//! Thermochemical property providers.
//!
//! The burn simulator treats chemical equilibrium as an external collaborator. Everything it
//! needs from a combustion solver goes through [`ThermoProvider`]; this crate ships a constant
//! provider, a tabulated provider with bilinear interpolation, and a memoizing wrapper.

mod cache;
mod fixed;
mod table;

pub use cache::CachedThermo;
pub use fixed::FixedThermo;
pub use table::{TableRow, ThermoTable};

use thiserror::Error;

/// Properties returned by the equilibrium lookup at one chamber operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombustionProperties {
    pub thrust_coefficient: f64,
    pub characteristic_velocity_m_s: f64,
    pub chamber_temperature_k: f64,
    pub molar_mass: f64,
    pub gamma: f64,
}

/// Combined chamber gas state: combustion properties plus the specific heat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoState {
    pub thrust_coefficient: f64,
    pub characteristic_velocity_m_s: f64,
    pub chamber_temperature_k: f64,
    pub molar_mass: f64,
    pub gamma: f64,
    pub specific_heat_cp: f64,
}

impl ThermoState {
    pub fn new(properties: CombustionProperties, specific_heat_cp: f64) -> Self {
        Self {
            thrust_coefficient: properties.thrust_coefficient,
            characteristic_velocity_m_s: properties.characteristic_velocity_m_s,
            chamber_temperature_k: properties.chamber_temperature_k,
            molar_mass: properties.molar_mass,
            gamma: properties.gamma,
            specific_heat_cp,
        }
    }
}

/// Errors surfaced by thermochemical providers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ThermoError {
    #[error("mixture ratio {mixture_ratio:.4} outside table domain [{min:.4}, {max:.4}]")]
    MixtureOutOfRange {
        mixture_ratio: f64,
        min: f64,
        max: f64,
    },
    #[error("area ratio {requested} does not match table area ratio {table}")]
    AreaRatioMismatch { requested: f64, table: f64 },
    #[error("invalid lookup input: {0}")]
    InvalidInput(String),
    #[error("thermo table is malformed: {0}")]
    MalformedTable(String),
    #[error("failed to read thermo table: {0}")]
    Io(String),
}

impl From<csv::Error> for ThermoError {
    fn from(err: csv::Error) -> Self {
        ThermoError::Io(err.to_string())
    }
}

/// Source of combustion properties for a given chamber operating point.
///
/// Implementations may be slow (an equilibrium solve per call) and are called once per
/// simulation step. They must be shareable across sweep worker threads.
pub trait ThermoProvider: Send + Sync {
    /// Combustion properties at `(chamber pressure [bar], O/F, nozzle area ratio)`.
    fn combustion_properties(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError>;

    /// Chamber specific heat at constant pressure (J/(kg·K)).
    fn chamber_specific_heat(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<f64, ThermoError>;

    /// Valid mixture-ratio domain, when the provider has one.
    fn mixture_ratio_bounds(&self) -> Option<(f64, f64)> {
        None
    }

    /// Both lookups combined into a single [`ThermoState`].
    fn thermo_state(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<ThermoState, ThermoError> {
        let properties =
            self.combustion_properties(chamber_pressure_bar, mixture_ratio, area_ratio)?;
        let cp = self.chamber_specific_heat(chamber_pressure_bar, mixture_ratio, area_ratio)?;
        Ok(ThermoState::new(properties, cp))
    }
}

impl<T: ThermoProvider + ?Sized> ThermoProvider for &T {
    fn combustion_properties(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError> {
        (**self).combustion_properties(chamber_pressure_bar, mixture_ratio, area_ratio)
    }

    fn chamber_specific_heat(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<f64, ThermoError> {
        (**self).chamber_specific_heat(chamber_pressure_bar, mixture_ratio, area_ratio)
    }

    fn mixture_ratio_bounds(&self) -> Option<(f64, f64)> {
        (**self).mixture_ratio_bounds()
    }

    fn thermo_state(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<ThermoState, ThermoError> {
        (**self).thermo_state(chamber_pressure_bar, mixture_ratio, area_ratio)
    }
}
