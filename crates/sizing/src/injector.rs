use std::f64::consts::PI;

use serde::Serialize;

use crate::{SizingError, ensure_positive};

/// Shower-head injector geometry for a required oxidizer flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InjectorSizing {
    pub total_area_m2: f64,
    pub hole_area_m2: f64,
    /// Fractional; round up when drilling.
    pub hole_count: f64,
}

impl InjectorSizing {
    pub fn holes_to_drill(&self) -> u32 {
        self.hole_count.ceil() as u32
    }
}

/// Incompressible orifice sizing: `A = ṁ / (Cd·sqrt(2·ρ·Δp))`.
pub fn size_injector(
    oxidizer_mass_flow_kg_s: f64,
    discharge_coefficient: f64,
    oxidizer_density_kg_m3: f64,
    pressure_drop_pa: f64,
    hole_diameter_m: f64,
) -> Result<InjectorSizing, SizingError> {
    ensure_positive("oxidizer mass flow", oxidizer_mass_flow_kg_s)?;
    ensure_positive("discharge coefficient", discharge_coefficient)?;
    ensure_positive("oxidizer density", oxidizer_density_kg_m3)?;
    ensure_positive("injector pressure drop", pressure_drop_pa)?;
    ensure_positive("hole diameter", hole_diameter_m)?;

    let total_area = oxidizer_mass_flow_kg_s
        / (discharge_coefficient * (2.0 * oxidizer_density_kg_m3 * pressure_drop_pa).sqrt());
    let radius = 0.5 * hole_diameter_m;
    let hole_area = PI * radius * radius;
    Ok(InjectorSizing {
        total_area_m2: total_area,
        hole_area_m2: hole_area,
        hole_count: total_area / hole_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_motor_injector() {
        // 0.06 kg/s N₂O, 20 % of a 50 bar tank dropped across 1 mm holes.
        let sizing = size_injector(0.06, 1.0, 800.0, 0.2 * 50.0e5, 1.0e-3).unwrap();
        assert!((sizing.total_area_m2 - 1.5e-6).abs() < 1e-15);
        assert!((sizing.hole_count - 1.909_859_317_102_744_3).abs() < 1e-9);
        assert_eq!(sizing.holes_to_drill(), 2);
    }

    #[test]
    fn zero_pressure_drop_is_rejected() {
        assert!(size_injector(0.06, 1.0, 800.0, 0.0, 1.0e-3).is_err());
    }
}
