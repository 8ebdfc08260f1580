//! Solid-fuel regression: oxidizer flux → regression rate → fuel mass flow.

use hybrid_core::geometry::{circle_area, cylinder_lateral_area};
use serde::{Deserialize, Serialize};

use crate::engine::GrainGeometry;

/// Mass flow used as the flux term of the power law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluxBasis {
    /// Oxidizer mass flow over the port area.
    #[default]
    Oxidizer,
    /// Oxidizer plus (lagged) fuel mass flow over the port area.
    Propellant,
}

/// Empirical regression law `r' = a' · G^n · L^m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionLaw {
    pub a: f64,
    pub n: f64,
    pub m: f64,
    pub flux_basis: FluxBasis,
}

/// Result of one regression evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegressionOutput {
    /// Surface regression rate (m/s).
    pub regression_rate: f64,
    /// Fuel mass generated by the burning surface (kg/s).
    pub fuel_mass_flow_rate: f64,
    /// Burning surface area (m²).
    pub burn_area: f64,
    /// Mass flux through the port (kg/(s·m²)).
    pub flux: f64,
}

impl RegressionLaw {
    pub fn new(a: f64, n: f64) -> Self {
        Self {
            a,
            n,
            m: 0.0,
            flux_basis: FluxBasis::Oxidizer,
        }
    }

    /// Coefficient corrected for the fuel contribution: `a / (1 + ṁ_f/ṁ_ox)^n`.
    ///
    /// The fuel flow is the previous step's value. The exact coefficient depends on the fuel
    /// flow it produces, so this is a one-step-lagged stand-in for an implicit solve.
    pub fn corrected_coefficient(&self, oxidizer_mass_flow: f64, previous_fuel_flow: f64) -> f64 {
        self.a / (1.0 + previous_fuel_flow / oxidizer_mass_flow).powf(self.n)
    }

    /// Evaluate the law at the current port radius.
    pub fn regression_rate(
        &self,
        oxidizer_mass_flow: f64,
        previous_fuel_flow: f64,
        port_radius: f64,
        grain: &GrainGeometry,
    ) -> RegressionOutput {
        if !(oxidizer_mass_flow > 0.0 && oxidizer_mass_flow.is_finite()) {
            return RegressionOutput::default();
        }
        let previous_fuel_flow = previous_fuel_flow.max(0.0);
        let radius = grain.burning_radius(port_radius);

        let through_flow = match self.flux_basis {
            FluxBasis::Oxidizer => oxidizer_mass_flow,
            FluxBasis::Propellant => oxidizer_mass_flow + previous_fuel_flow,
        };
        let flux = through_flow / circle_area(radius);

        let coefficient = self.corrected_coefficient(oxidizer_mass_flow, previous_fuel_flow);
        let mut rate = coefficient * flux.max(0.0).powf(self.n);
        if self.m != 0.0 {
            rate *= grain.length_m.powf(self.m);
        }

        let burn_area = cylinder_lateral_area(radius, grain.length_m);
        RegressionOutput {
            regression_rate: rate,
            fuel_mass_flow_rate: grain.density_kg_m3 * burn_area * rate,
            burn_area,
            flux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn grain(max: Option<f64>) -> GrainGeometry {
        GrainGeometry {
            length_m: 0.2,
            initial_port_radius_m: 0.01,
            max_port_radius_m: max,
            density_kg_m3: 924.0,
        }
    }

    #[test]
    fn first_step_uses_uncorrected_coefficient() {
        let law = RegressionLaw::new(1.55e-4, 0.5);
        let out = law.regression_rate(0.3, 0.0, 0.01, &grain(None));
        let flux = 0.3 / (PI * 0.01 * 0.01);
        let rate = 1.55e-4 * flux.sqrt();
        assert!((out.flux - flux).abs() < 1e-9);
        assert!((out.regression_rate - rate).abs() < 1e-15);
        let area = 2.0 * PI * 0.01 * 0.2;
        assert!((out.fuel_mass_flow_rate - 924.0 * area * rate).abs() < 1e-12);
    }

    #[test]
    fn lagged_fuel_flow_reduces_rate() {
        let law = RegressionLaw::new(1.55e-4, 0.5);
        let fresh = law.regression_rate(0.3, 0.0, 0.01, &grain(None));
        let lagged = law.regression_rate(0.3, fresh.fuel_mass_flow_rate, 0.01, &grain(None));
        assert!(lagged.regression_rate < fresh.regression_rate);
        let expected = 1.55e-4 / (1.0 + fresh.fuel_mass_flow_rate / 0.3).sqrt();
        let corrected = law.corrected_coefficient(0.3, fresh.fuel_mass_flow_rate);
        assert!((corrected - expected).abs() < 1e-18);
    }

    #[test]
    fn propellant_basis_adds_fuel_to_flux() {
        let mut law = RegressionLaw::new(1.55e-4, 0.5);
        law.flux_basis = FluxBasis::Propellant;
        let out = law.regression_rate(0.3, 0.1, 0.01, &grain(None));
        assert!((out.flux - 0.4 / (PI * 1e-4)).abs() < 1e-9);
    }

    #[test]
    fn burning_area_is_capped_at_max_radius() {
        let law = RegressionLaw::new(1.55e-4, 0.5);
        let capped = law.regression_rate(0.3, 0.0, 0.05, &grain(Some(0.03)));
        let at_max = law.regression_rate(0.3, 0.0, 0.03, &grain(Some(0.03)));
        assert_eq!(capped, at_max);
        assert!((capped.burn_area - 2.0 * PI * 0.03 * 0.2).abs() < 1e-15);
    }

    #[test]
    fn zero_oxidizer_flow_gives_no_regression() {
        let law = RegressionLaw::new(1.55e-4, 0.5);
        let out = law.regression_rate(0.0, 0.05, 0.01, &grain(None));
        assert_eq!(out, RegressionOutput::default());
    }

    #[test]
    fn length_exponent_scales_rate() {
        let mut law = RegressionLaw::new(1.55e-4, 0.5);
        let base = law.regression_rate(0.3, 0.0, 0.01, &grain(None));
        law.m = 1.0;
        let scaled = law.regression_rate(0.3, 0.0, 0.01, &grain(None));
        assert!((scaled.regression_rate - base.regression_rate * 0.2).abs() < 1e-15);
    }
}
