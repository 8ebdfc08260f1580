//! Choked nozzle flow and the thrust proxy.

use crate::error::NumericalFault;

/// Specific gas constant from the chamber specific heat: `R = Cp − Cp/γ`.
#[inline]
pub fn specific_gas_constant(specific_heat_cp: f64, gamma: f64) -> f64 {
    specific_heat_cp - specific_heat_cp / gamma
}

/// Mass flow through a choked throat.
///
/// `ṁ = (Cd·A_t·Pc·γ) / (ηc·sqrt(γ·R·Tc)) · (2/(γ+1))^((γ+1)/(2(γ−1)))`
///
/// Flow is always assumed sonic at the throat; there is no subsonic branch.
pub fn choked_mass_flow(
    chamber_pressure: f64,
    throat_area: f64,
    gamma: f64,
    r_specific: f64,
    chamber_temperature: f64,
    discharge_coeff: f64,
    combustion_efficiency: f64,
) -> Result<f64, NumericalFault> {
    if !(gamma > 1.0) {
        return Err(NumericalFault::GammaOutOfRange(gamma));
    }
    let rt = r_specific * chamber_temperature;
    if !(rt > 0.0) {
        return Err(NumericalFault::NonPositiveGasConstant(rt));
    }

    let exponent = (gamma + 1.0) / (2.0 * (gamma - 1.0));
    let choke_factor = (2.0 / (gamma + 1.0)).powf(exponent);
    let mass_flow = (discharge_coeff * throat_area * chamber_pressure * gamma)
        / (combustion_efficiency * (gamma * rt).sqrt())
        * choke_factor;

    if mass_flow.is_finite() {
        Ok(mass_flow)
    } else {
        Err(NumericalFault::NonFinite("nozzle mass flow"))
    }
}

/// Thrust estimate `F = ṁ_out · C* · ηc · Cd · ηnoz`.
///
/// Uses the characteristic velocity rather than exit momentum plus pressure thrust, which
/// keeps results comparable with historical runs but omits the pressure term.
#[inline]
pub fn thrust(
    nozzle_mass_flow: f64,
    characteristic_velocity: f64,
    combustion_efficiency: f64,
    discharge_coeff: f64,
    nozzle_efficiency: f64,
) -> f64 {
    nozzle_mass_flow
        * characteristic_velocity
        * combustion_efficiency
        * discharge_coeff
        * nozzle_efficiency
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choked_flow_matches_reference_value() {
        let mdot = choked_mass_flow(4.0e6, 1.0e-4, 1.2, 280.0, 3000.0, 1.0, 1.0).unwrap();

        // Hand evaluation: 480 / sqrt(1.008e6) * (2/2.2)^5.5
        assert!((mdot - 0.283_042_207_647_609_6).abs() < 1e-12);

        let closed_form = (1.0e-4 * 4.0e6 * 1.2) / (1.2_f64 * 280.0 * 3000.0).sqrt()
            * (2.0_f64 / 2.2).powf(2.2 / 0.4);
        assert!((mdot - closed_form).abs() < 1e-14);
    }

    #[test]
    fn efficiency_and_discharge_scale_flow() {
        let base = choked_mass_flow(2.0e6, 1.0e-4, 1.25, 300.0, 2800.0, 1.0, 1.0).unwrap();
        let scaled = choked_mass_flow(2.0e6, 1.0e-4, 1.25, 300.0, 2800.0, 0.9, 0.9).unwrap();
        assert!((base - scaled).abs() < 1e-12);
        let half = choked_mass_flow(2.0e6, 1.0e-4, 1.25, 300.0, 2800.0, 0.5, 1.0).unwrap();
        assert!((half - 0.5 * base).abs() < 1e-12);
    }

    #[test]
    fn gamma_at_or_below_one_faults() {
        let err = choked_mass_flow(2.0e6, 1.0e-4, 1.0, 300.0, 2800.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err, NumericalFault::GammaOutOfRange(1.0));
        assert!(choked_mass_flow(2.0e6, 1.0e-4, f64::NAN, 300.0, 2800.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn non_positive_gas_constant_faults() {
        let err = choked_mass_flow(2.0e6, 1.0e-4, 1.2, 0.0, 2800.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, NumericalFault::NonPositiveGasConstant(_)));
    }

    #[test]
    fn gas_constant_from_specific_heat() {
        assert!((specific_gas_constant(1800.0, 1.2) - 300.0).abs() < 1e-9);
    }
}
