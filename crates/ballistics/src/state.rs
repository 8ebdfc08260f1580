use crate::engine::EngineConfig;

/// Mutable chamber state, replaced wholesale on every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChamberState {
    /// Elapsed burn time (s).
    pub time: f64,
    /// Oxidizer left in the tank (kg).
    pub oxidizer_mass_remaining: f64,
    /// Current port radius (m).
    pub port_radius: f64,
    /// Chamber pressure (Pa).
    pub chamber_pressure: f64,
    /// Fuel mass flow of the most recent step (kg/s).
    pub fuel_mass_flow_rate: f64,
}

impl ChamberState {
    /// State at ignition: ambient pressure, initial port, full tank, no fuel flow yet.
    pub fn initial(config: &EngineConfig) -> Self {
        Self {
            time: 0.0,
            oxidizer_mass_remaining: config.oxidizer.initial_mass_kg,
            port_radius: config.grain.initial_port_radius_m,
            chamber_pressure: config.ambient_pressure_pa,
            fuel_mass_flow_rate: 0.0,
        }
    }

    pub fn chamber_volume(&self, config: &EngineConfig) -> f64 {
        config.chamber_volume(self.port_radius)
    }

    pub fn is_depleted(&self) -> bool {
        self.oxidizer_mass_remaining <= 0.0
    }
}
