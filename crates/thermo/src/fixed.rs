use crate::{CombustionProperties, ThermoError, ThermoProvider};

/// Provider returning the same properties at every operating point.
///
/// Handy for quick studies where only the ballistics matter, and as a deterministic stand-in
/// for an equilibrium solver in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedThermo {
    pub properties: CombustionProperties,
    pub specific_heat_cp: f64,
}

impl FixedThermo {
    pub fn new(
        gamma: f64,
        specific_heat_cp: f64,
        chamber_temperature_k: f64,
        characteristic_velocity_m_s: f64,
    ) -> Self {
        Self {
            properties: CombustionProperties {
                thrust_coefficient: 1.5,
                characteristic_velocity_m_s,
                chamber_temperature_k,
                molar_mass: 0.0,
                gamma,
            },
            specific_heat_cp,
        }
    }

    pub fn with_thrust_coefficient(mut self, thrust_coefficient: f64) -> Self {
        self.properties.thrust_coefficient = thrust_coefficient;
        self
    }

    pub fn with_molar_mass(mut self, molar_mass: f64) -> Self {
        self.properties.molar_mass = molar_mass;
        self
    }
}

impl ThermoProvider for FixedThermo {
    fn combustion_properties(
        &self,
        _chamber_pressure_bar: f64,
        _mixture_ratio: f64,
        _area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError> {
        Ok(self.properties)
    }

    fn chamber_specific_heat(
        &self,
        _chamber_pressure_bar: f64,
        _mixture_ratio: f64,
        _area_ratio: f64,
    ) -> Result<f64, ThermoError> {
        Ok(self.specific_heat_cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_state_ignores_operating_point() {
        let thermo = FixedThermo::new(1.2, 1800.0, 3000.0, 1500.0);
        let a = thermo.thermo_state(1.0, 2.0, 4.0).unwrap();
        let b = thermo.thermo_state(40.0, 9.0, 6.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.gamma, 1.2);
        assert_eq!(a.specific_heat_cp, 1800.0);
    }
}
