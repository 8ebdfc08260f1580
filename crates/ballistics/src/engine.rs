//! Immutable engine description and its builder.

use std::fmt;
use std::sync::Arc;

use hybrid_core::constants::ATMOSPHERIC_PRESSURE_PA;
use hybrid_core::geometry::{circle_area, cylinder_volume};

use crate::error::{ConfigurationError, ensure_non_negative, ensure_positive, ensure_range};
use crate::feed::{ConstantFeed, OxidizerFeed};
use crate::regression::{FluxBasis, RegressionLaw};

/// Cylindrical single-port fuel grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainGeometry {
    pub length_m: f64,
    pub initial_port_radius_m: f64,
    /// Port radius at which the burning area stops growing (typically the charge radius).
    pub max_port_radius_m: Option<f64>,
    pub density_kg_m3: f64,
}

impl GrainGeometry {
    /// Radius used for burning area and flux, capped at the maximum port radius.
    #[inline]
    pub fn burning_radius(&self, port_radius: f64) -> f64 {
        match self.max_port_radius_m {
            Some(max) => port_radius.min(max),
            None => port_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NozzleGeometry {
    pub throat_area_m2: f64,
    pub area_ratio: f64,
    pub discharge_coefficient: f64,
    pub efficiency: f64,
}

/// Case wall used for the hoop-stress safety factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometry {
    pub thickness_m: f64,
    pub yield_strength_pa: f64,
}

#[derive(Clone)]
pub struct OxidizerSupply {
    pub density_kg_m3: f64,
    pub initial_mass_kg: f64,
    pub feed: Arc<dyn OxidizerFeed>,
}

impl fmt::Debug for OxidizerSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OxidizerSupply")
            .field("density_kg_m3", &self.density_kg_m3)
            .field("initial_mass_kg", &self.initial_mass_kg)
            .field("feed", &self.feed)
            .finish()
    }
}

/// Everything the simulator needs to know about one motor. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub name: String,
    pub grain: GrainGeometry,
    pub regression: RegressionLaw,
    pub nozzle: NozzleGeometry,
    pub combustion_efficiency: f64,
    pub pre_chamber_volume_m3: f64,
    pub post_chamber_volume_m3: f64,
    pub oxidizer: OxidizerSupply,
    pub ambient_pressure_pa: f64,
    pub wall: Option<WallGeometry>,
}

impl EngineConfig {
    pub fn builder(name: impl Into<String>) -> EngineConfigBuilder {
        EngineConfigBuilder::new(name)
    }

    /// Free chamber volume for a given port radius: port + pre- and post-combustion chambers.
    pub fn chamber_volume(&self, port_radius: f64) -> f64 {
        cylinder_volume(port_radius, self.grain.length_m)
            + self.pre_chamber_volume_m3
            + self.post_chamber_volume_m3
    }

    /// Check every static input. Called by the builder and again at simulator initialization.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let grain = &self.grain;
        ensure_positive("grain length", grain.length_m)?;
        ensure_positive("initial port radius", grain.initial_port_radius_m)?;
        ensure_positive("grain density", grain.density_kg_m3)?;
        if let Some(max) = grain.max_port_radius_m {
            if !(max >= grain.initial_port_radius_m) {
                return Err(ConfigurationError::PortRadiusOrder {
                    initial: grain.initial_port_radius_m,
                    max,
                });
            }
        }

        ensure_range("regression coefficient a", self.regression.a, 1e-9, 1e-2)?;
        ensure_range("regression exponent n", self.regression.n, 0.05, 1.5)?;
        ensure_range("regression exponent m", self.regression.m, -1.0, 1.0)?;

        ensure_positive("throat area", self.nozzle.throat_area_m2)?;
        ensure_positive("nozzle area ratio", self.nozzle.area_ratio)?;
        ensure_range("discharge coefficient", self.nozzle.discharge_coefficient, 1e-3, 1.5)?;
        ensure_range("nozzle efficiency", self.nozzle.efficiency, 1e-3, 1.5)?;
        ensure_range("combustion efficiency", self.combustion_efficiency, 1e-3, 1.5)?;

        ensure_non_negative("pre-combustion chamber volume", self.pre_chamber_volume_m3)?;
        ensure_non_negative("post-combustion chamber volume", self.post_chamber_volume_m3)?;
        ensure_positive("oxidizer density", self.oxidizer.density_kg_m3)?;
        ensure_non_negative("initial oxidizer mass", self.oxidizer.initial_mass_kg)?;
        ensure_positive("ambient pressure", self.ambient_pressure_pa)?;

        if let Some(wall) = &self.wall {
            if !(wall.thickness_m > 0.0 && wall.thickness_m.is_finite()) {
                return Err(ConfigurationError::WallThickness(wall.thickness_m));
            }
            ensure_positive("wall yield strength", wall.yield_strength_pa)?;
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
///
/// Defaults follow the small-scale polyethylene/N₂O design scripts: 90 % combustion
/// efficiency, ideal nozzle, 50 cm³ pre- and 25 cm³ post-combustion chambers.
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
    oxidizer_volume_m3: Option<f64>,
}

impl EngineConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: EngineConfig {
                name: name.into(),
                grain: GrainGeometry {
                    length_m: 0.17,
                    initial_port_radius_m: 0.0075,
                    max_port_radius_m: None,
                    density_kg_m3: 924.0,
                },
                regression: RegressionLaw::new(1.16e-4, 0.331),
                nozzle: NozzleGeometry {
                    throat_area_m2: circle_area(0.003),
                    area_ratio: 20.0,
                    discharge_coefficient: 1.0,
                    efficiency: 1.0,
                },
                combustion_efficiency: 0.9,
                pre_chamber_volume_m3: 5.0e-5,
                post_chamber_volume_m3: 2.5e-5,
                oxidizer: OxidizerSupply {
                    density_kg_m3: 800.0,
                    initial_mass_kg: 0.4,
                    feed: Arc::new(ConstantFeed(0.06)),
                },
                ambient_pressure_pa: ATMOSPHERIC_PRESSURE_PA,
                wall: None,
            },
            oxidizer_volume_m3: None,
        }
    }

    pub fn grain_length(mut self, length_m: f64) -> Self {
        self.config.grain.length_m = length_m;
        self
    }

    pub fn initial_port_radius(mut self, radius_m: f64) -> Self {
        self.config.grain.initial_port_radius_m = radius_m;
        self
    }

    pub fn max_port_radius(mut self, radius_m: Option<f64>) -> Self {
        self.config.grain.max_port_radius_m = radius_m;
        self
    }

    pub fn grain_density(mut self, density_kg_m3: f64) -> Self {
        self.config.grain.density_kg_m3 = density_kg_m3;
        self
    }

    pub fn regression(mut self, a: f64, n: f64, m: f64) -> Self {
        self.config.regression.a = a;
        self.config.regression.n = n;
        self.config.regression.m = m;
        self
    }

    pub fn flux_basis(mut self, basis: FluxBasis) -> Self {
        self.config.regression.flux_basis = basis;
        self
    }

    pub fn throat_area(mut self, area_m2: f64) -> Self {
        self.config.nozzle.throat_area_m2 = area_m2;
        self
    }

    pub fn throat_radius(self, radius_m: f64) -> Self {
        self.throat_area(circle_area(radius_m))
    }

    pub fn area_ratio(mut self, area_ratio: f64) -> Self {
        self.config.nozzle.area_ratio = area_ratio;
        self
    }

    pub fn discharge_coefficient(mut self, cd: f64) -> Self {
        self.config.nozzle.discharge_coefficient = cd;
        self
    }

    pub fn nozzle_efficiency(mut self, efficiency: f64) -> Self {
        self.config.nozzle.efficiency = efficiency;
        self
    }

    pub fn combustion_efficiency(mut self, efficiency: f64) -> Self {
        self.config.combustion_efficiency = efficiency;
        self
    }

    pub fn chamber_volumes(mut self, pre_m3: f64, post_m3: f64) -> Self {
        self.config.pre_chamber_volume_m3 = pre_m3;
        self.config.post_chamber_volume_m3 = post_m3;
        self
    }

    pub fn oxidizer_density(mut self, density_kg_m3: f64) -> Self {
        self.config.oxidizer.density_kg_m3 = density_kg_m3;
        self
    }

    pub fn oxidizer_mass(mut self, mass_kg: f64) -> Self {
        self.config.oxidizer.initial_mass_kg = mass_kg;
        self.oxidizer_volume_m3 = None;
        self
    }

    /// Set the loaded oxidizer by tank volume; the mass follows from the oxidizer density.
    pub fn oxidizer_volume(mut self, volume_m3: f64) -> Self {
        self.oxidizer_volume_m3 = Some(volume_m3);
        self
    }

    pub fn constant_oxidizer_flow(self, mass_flow_kg_s: f64) -> Self {
        self.oxidizer_feed(Arc::new(ConstantFeed(mass_flow_kg_s)))
    }

    pub fn oxidizer_feed(mut self, feed: Arc<dyn OxidizerFeed>) -> Self {
        self.config.oxidizer.feed = feed;
        self
    }

    pub fn ambient_pressure(mut self, pressure_pa: f64) -> Self {
        self.config.ambient_pressure_pa = pressure_pa;
        self
    }

    pub fn wall(mut self, thickness_m: f64, yield_strength_pa: f64) -> Self {
        self.config.wall = Some(WallGeometry {
            thickness_m,
            yield_strength_pa,
        });
        self
    }

    pub fn build(mut self) -> Result<EngineConfig, ConfigurationError> {
        if let Some(volume) = self.oxidizer_volume_m3 {
            ensure_non_negative("oxidizer volume", volume)?;
            self.config.oxidizer.initial_mass_kg = volume * self.config.oxidizer.density_kg_m3;
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::builder("default").build().unwrap();
        assert_eq!(config.name, "default");
        assert!((config.oxidizer.initial_mass_kg - 0.4).abs() < 1e-12);
    }

    #[test]
    fn oxidizer_volume_uses_density() {
        let config = EngineConfig::builder("tank")
            .oxidizer_density(800.0)
            .oxidizer_volume(0.5e-3)
            .build()
            .unwrap();
        assert!((config.oxidizer.initial_mass_kg - 0.4).abs() < 1e-12);
    }

    #[test]
    fn negative_geometry_is_rejected() {
        let err = EngineConfig::builder("bad")
            .grain_length(-0.1)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NonPositive {
                field: "grain length",
                value: -0.1
            }
        );
    }

    #[test]
    fn zero_wall_thickness_is_rejected() {
        let err = EngineConfig::builder("bad")
            .wall(0.0, 2.0e8)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::WallThickness(0.0));
    }

    #[test]
    fn insane_regression_coefficients_are_rejected() {
        let err = EngineConfig::builder("bad")
            .regression(0.5, 0.5, 0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::OutOfRange { .. }));
    }

    #[test]
    fn max_radius_must_exceed_initial() {
        let err = EngineConfig::builder("bad")
            .initial_port_radius(0.02)
            .max_port_radius(Some(0.01))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::PortRadiusOrder { .. }));
    }

    #[test]
    fn chamber_volume_adds_dead_volumes() {
        let config = EngineConfig::builder("vol")
            .grain_length(0.2)
            .chamber_volumes(1e-4, 2e-4)
            .build()
            .unwrap();
        let v = config.chamber_volume(0.01);
        assert!((v - (std::f64::consts::PI * 1e-4 * 0.2 + 3e-4)).abs() < 1e-15);
    }
}
