//! Core units, constants, and shared primitives for the hybrid motor simulator workspace.

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Standard sea-level atmospheric pressure (Pa).
    pub const ATMOSPHERIC_PRESSURE_PA: f64 = 101_325.0;
    /// Pascals per bar.
    pub const PA_PER_BAR: f64 = 100_000.0;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::PA_PER_BAR;

    /// Convert bar to pascals.
    #[inline]
    pub fn bar_to_pa(v: f64) -> f64 {
        v * PA_PER_BAR
    }

    /// Convert pascals to bar.
    #[inline]
    pub fn pa_to_bar(v: f64) -> f64 {
        v / PA_PER_BAR
    }

    /// Convert litres to cubic metres.
    #[inline]
    pub fn litres_to_m3(v: f64) -> f64 {
        v * 0.001
    }

    /// Convert metres to millimetres.
    #[inline]
    pub fn m_to_mm(v: f64) -> f64 {
        v * 1_000.0
    }
}

/// Cylinder and circle helpers used for grain and chamber geometry.
pub mod geometry {
    use std::f64::consts::PI;

    /// Area of a circle of the given radius.
    #[inline]
    pub fn circle_area(radius: f64) -> f64 {
        PI * radius * radius
    }

    /// Lateral (side) surface area of a cylinder.
    #[inline]
    pub fn cylinder_lateral_area(radius: f64, length: f64) -> f64 {
        2.0 * PI * radius * length
    }

    /// Volume of a cylinder.
    #[inline]
    pub fn cylinder_volume(radius: f64, length: f64) -> f64 {
        circle_area(radius) * length
    }

    /// Volume of the annulus between two radii over a given length.
    #[inline]
    pub fn annulus_volume(inner_radius: f64, outer_radius: f64, length: f64) -> f64 {
        (circle_area(outer_radius) - circle_area(inner_radius)) * length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_round_trip() {
        assert_eq!(units::pa_to_bar(units::bar_to_pa(42.0)), 42.0);
    }

    #[test]
    fn annulus_matches_difference_of_cylinders() {
        let v = geometry::annulus_volume(0.01, 0.03, 0.2);
        let expected =
            geometry::cylinder_volume(0.03, 0.2) - geometry::cylinder_volume(0.01, 0.2);
        assert!((v - expected).abs() < 1e-15);
    }
}
