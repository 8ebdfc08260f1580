//! First-pass motor sizing from a thrust target.

use std::f64::consts::PI;

use hybrid_core::units::litres_to_m3;
use serde::Serialize;
use tracing::debug;

use crate::{SizingError, ensure_positive};

/// Design targets and propellant data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInputs {
    /// Oxidizer-to-fuel mass ratio.
    pub mixture_ratio: f64,
    pub run_tank_pressure_bar: f64,
    /// Injector pressure drop as a fraction of tank pressure.
    pub injector_pressure_drop: f64,
    pub feed_efficiency: f64,
    /// Final over initial port diameter.
    pub port_ratio: f64,
    pub desired_thrust_n: f64,
    pub oxidizer_volume_l: f64,
    pub oxidizer_density_kg_m3: f64,
    pub combustion_efficiency: f64,
    pub nozzle_efficiency: f64,
    pub discharge_coefficient: f64,
    pub fuel_density_kg_m3: f64,
    pub regression_a: f64,
    pub regression_n: f64,
}

impl Default for SizingInputs {
    /// 400 N paraffin/N₂O motor with a 9 L tank at 50 bar.
    fn default() -> Self {
        Self {
            mixture_ratio: 7.0,
            run_tank_pressure_bar: 50.0,
            injector_pressure_drop: 0.2,
            feed_efficiency: 1.0,
            port_ratio: 3.0,
            desired_thrust_n: 400.0,
            oxidizer_volume_l: 9.0,
            oxidizer_density_kg_m3: 800.0,
            combustion_efficiency: 0.9,
            nozzle_efficiency: 1.0,
            discharge_coefficient: 1.0,
            fuel_density_kg_m3: 924.0,
            regression_a: 0.000155,
            regression_n: 0.5,
        }
    }
}

/// Equilibrium results at the throat for the design operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NozzlePoint {
    pub throat_pressure_pa: f64,
    pub thrust_coefficient: f64,
    pub characteristic_velocity_m_s: f64,
}

impl Default for NozzlePoint {
    /// Paraffin/N₂O at 40 bar and O/F 7.
    fn default() -> Self {
        Self {
            throat_pressure_pa: 22.914e5,
            thrust_coefficient: 0.6630,
            characteristic_velocity_m_s: 1608.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotorSizing {
    pub oxidizer_mass_kg: f64,
    pub fuel_mass_kg: f64,
    pub chamber_pressure_bar: f64,
    pub throat_area_m2: f64,
    pub throat_diameter_m: f64,
    pub propellant_mass_flow_kg_s: f64,
    pub oxidizer_mass_flow_kg_s: f64,
    pub burn_time_s: f64,
    pub fuel_outer_diameter_m: f64,
    pub fuel_inner_diameter_m: f64,
    pub fuel_length_m: f64,
}

pub fn size_motor(inputs: &SizingInputs, nozzle: &NozzlePoint) -> Result<MotorSizing, SizingError> {
    ensure_positive("mixture ratio", inputs.mixture_ratio)?;
    ensure_positive("run tank pressure", inputs.run_tank_pressure_bar)?;
    ensure_positive("desired thrust", inputs.desired_thrust_n)?;
    ensure_positive("oxidizer volume", inputs.oxidizer_volume_l)?;
    ensure_positive("oxidizer density", inputs.oxidizer_density_kg_m3)?;
    ensure_positive("combustion efficiency", inputs.combustion_efficiency)?;
    ensure_positive("nozzle efficiency", inputs.nozzle_efficiency)?;
    ensure_positive("discharge coefficient", inputs.discharge_coefficient)?;
    ensure_positive("fuel density", inputs.fuel_density_kg_m3)?;
    ensure_positive("regression coefficient", inputs.regression_a)?;
    ensure_positive("regression exponent", inputs.regression_n)?;
    ensure_positive("throat pressure", nozzle.throat_pressure_pa)?;
    ensure_positive("thrust coefficient", nozzle.thrust_coefficient)?;
    ensure_positive("characteristic velocity", nozzle.characteristic_velocity_m_s)?;
    if !(0.0..1.0).contains(&inputs.injector_pressure_drop) {
        return Err(SizingError::Fraction {
            field: "injector pressure drop",
            value: inputs.injector_pressure_drop,
        });
    }
    if !(inputs.port_ratio > 1.0) {
        return Err(SizingError::PortRatio(inputs.port_ratio));
    }

    let oxidizer_mass = litres_to_m3(inputs.oxidizer_volume_l) * inputs.oxidizer_density_kg_m3;
    let fuel_mass = oxidizer_mass / inputs.mixture_ratio;

    let chamber_pressure_bar = inputs.run_tank_pressure_bar
        * ((1.0 - inputs.injector_pressure_drop) - (1.0 - inputs.feed_efficiency));
    if !(chamber_pressure_bar > 0.0) {
        return Err(SizingError::NoChamberPressure {
            tank_bar: inputs.run_tank_pressure_bar,
        });
    }

    let throat_area = inputs.desired_thrust_n
        / (nozzle.thrust_coefficient
            * nozzle.throat_pressure_pa
            * inputs.nozzle_efficiency
            * inputs.discharge_coefficient);
    let throat_diameter = 2.0 * (throat_area / PI).sqrt();

    let propellant_flow = nozzle.throat_pressure_pa * inputs.discharge_coefficient * throat_area
        / (inputs.combustion_efficiency * nozzle.characteristic_velocity_m_s);
    let oxidizer_flow = propellant_flow * inputs.mixture_ratio / (1.0 + inputs.mixture_ratio);
    let burn_time = oxidizer_mass / oxidizer_flow;

    // Integrated r' = a·G^n over the burn, with G from the oxidizer flow only.
    let n = inputs.regression_n;
    let j = 2.0 * n + 1.0;
    let outer = ((2.0 * j).powf(j) * inputs.regression_a / PI.powf(n)
        * (oxidizer_flow.powf(n) * burn_time / (1.0 - (1.0 / inputs.port_ratio).powf(j))))
    .powf(1.0 / j);
    let inner = outer / inputs.port_ratio;
    let annulus = outer * outer - inner * inner;
    let length = 4.0 * fuel_mass / (PI * inputs.fuel_density_kg_m3 * annulus);

    let sizing = MotorSizing {
        oxidizer_mass_kg: oxidizer_mass,
        fuel_mass_kg: fuel_mass,
        chamber_pressure_bar,
        throat_area_m2: throat_area,
        throat_diameter_m: throat_diameter,
        propellant_mass_flow_kg_s: propellant_flow,
        oxidizer_mass_flow_kg_s: oxidizer_flow,
        burn_time_s: burn_time,
        fuel_outer_diameter_m: outer,
        fuel_inner_diameter_m: inner,
        fuel_length_m: length,
    };
    debug!(?sizing, "preliminary sizing");
    Ok(sizing)
}
