//! Turn persisted engine files into runtime values.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use hybrid_ballistics::{
    ConfigurationError, EngineConfig, FaultPolicy, FeedError, MeasuredFeed,
    SimulationSettings, TimeStepPolicy,
};
use hybrid_config::{ConfigError, EngineFile, load_engine_catalog, load_engine_file};
use hybrid_core::units::litres_to_m3;
use hybrid_thermo::{
    CachedThermo, CombustionProperties, FixedThermo, ThermoError, ThermoProvider, ThermoTable,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine '{engine}': {source}")]
    Configuration {
        engine: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("thermochemistry: {0}")]
    Thermo(#[from] ThermoError),
    #[error("oxidizer feed: {0}")]
    Feed(#[from] FeedError),
    #[error("engine '{0}' has neither a thermo table nor a complete set of fixed thermo values")]
    MissingThermo(String),
    #[error("engine '{0}' not found in catalog")]
    UnknownEngine(String),
    #[error("catalog holds several engines; pick one by name")]
    NameRequired,
    #[error("unknown sweep parameter '{0}'")]
    UnknownParameter(String),
}

/// An engine file together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedEngine {
    pub file: EngineFile,
    pub base_dir: PathBuf,
}

impl LoadedEngine {
    pub fn config(&self) -> Result<EngineConfig, ScenarioError> {
        engine_from_file(&self.file).map_err(|source| ScenarioError::Configuration {
            engine: self.file.name.clone(),
            source,
        })
    }

    pub fn settings(&self) -> SimulationSettings {
        settings_from_file(&self.file)
    }

    pub fn thermo(&self) -> Result<ThermoSource, ScenarioError> {
        thermo_from_file(&self.file, &self.base_dir)
    }
}

/// Load one engine from a single TOML file, or by name from a catalog.
pub fn load_engine(path: &Path, name: Option<&str>) -> Result<LoadedEngine, ScenarioError> {
    let base_dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let is_single_file = path.extension().is_some_and(|ext| ext == "toml") && path.is_file();
    let file = match (is_single_file, name) {
        (true, None) => load_engine_file(path)?,
        (_, Some(name)) => select(&load_engine_catalog(path)?, name)?.clone(),
        (false, None) => {
            let mut engines = load_engine_catalog(path)?;
            if engines.len() != 1 {
                return Err(ScenarioError::NameRequired);
            }
            engines.remove(0)
        }
    };
    debug!(engine = %file.name, base = %base_dir.display(), "loaded engine file");
    Ok(LoadedEngine { file, base_dir })
}

/// Find an engine by name, ignoring ASCII case.
pub fn select<'a>(engines: &'a [EngineFile], name: &str) -> Result<&'a EngineFile, ScenarioError> {
    engines
        .iter()
        .find(|engine| engine.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ScenarioError::UnknownEngine(name.to_string()))
}

/// Build a validated engine from its file form. The feed is the file's constant flow.
pub fn engine_from_file(file: &EngineFile) -> Result<EngineConfig, ConfigurationError> {
    let mut builder = EngineConfig::builder(file.name.clone())
        .grain_length(file.grain_length_m)
        .initial_port_radius(file.initial_port_radius_m)
        .max_port_radius(file.max_port_radius_m)
        .grain_density(file.grain_density_kg_m3)
        .regression(file.regression_a, file.regression_n, file.regression_m)
        .flux_basis(file.regression_flux_basis)
        .throat_radius(file.throat_radius_m)
        .area_ratio(file.area_ratio)
        .combustion_efficiency(file.combustion_efficiency)
        .nozzle_efficiency(file.nozzle_efficiency)
        .discharge_coefficient(file.discharge_coefficient)
        .chamber_volumes(file.pre_chamber_volume_m3, file.post_chamber_volume_m3)
        .oxidizer_density(file.oxidizer_density_kg_m3)
        .oxidizer_volume(litres_to_m3(file.oxidizer_volume_l))
        .constant_oxidizer_flow(file.oxidizer_mass_flow_kg_s);

    if let Some(ambient) = file.ambient_pressure_pa {
        builder = builder.ambient_pressure(ambient);
    }
    match (file.wall_thickness_m, file.wall_yield_strength_pa) {
        (Some(thickness), Some(strength)) => builder = builder.wall(thickness, strength),
        (None, None) => {}
        _ => return Err(ConfigurationError::IncompleteWall),
    }
    builder.build()
}

/// Integration settings: staged stepping when an initial step is given, lenient faults when
/// out-of-range mixture ratios are suppressed.
pub fn settings_from_file(file: &EngineFile) -> SimulationSettings {
    let time_step = match file.initial_time_step_s {
        Some(initial_dt) => TimeStepPolicy::Staged {
            initial_dt,
            transition_time: file.time_step_transition_s.unwrap_or(1.0),
            dt: file.time_step_s,
        },
        None => TimeStepPolicy::Fixed(file.time_step_s),
    };
    let mut settings = SimulationSettings::default().with_time_step(time_step);
    if let Some(max) = file.max_iterations {
        settings = settings.with_max_iterations(max);
    }
    if file.suppress_mixture_out_of_range {
        settings = settings.with_fault_policy(FaultPolicy::Lenient);
    }
    settings
}

/// Replace the engine's constant feed with measured data from a hotfire CSV.
pub fn with_measured_feed(
    mut config: EngineConfig,
    csv_path: &Path,
    floor: f64,
) -> Result<EngineConfig, ScenarioError> {
    let feed = MeasuredFeed::from_csv_path(csv_path, floor)?;
    debug!(samples = feed.len(), mass_kg = feed.total_mass(), "loaded measured oxidizer feed");
    config.oxidizer.feed = Arc::new(feed);
    Ok(config)
}

/// Thermochemistry configured by an engine file.
#[derive(Debug)]
pub enum ThermoSource {
    Fixed(FixedThermo),
    Table(CachedThermo<ThermoTable>),
}

impl ThermoSource {
    pub fn describe(&self) -> String {
        match self {
            ThermoSource::Fixed(fixed) => format!(
                "fixed (gamma {}, Tc {} K, C* {} m/s)",
                fixed.properties.gamma,
                fixed.properties.chamber_temperature_k,
                fixed.properties.characteristic_velocity_m_s
            ),
            ThermoSource::Table(table) => {
                format!("table (area ratio {})", table.inner().area_ratio())
            }
        }
    }
}

impl ThermoProvider for ThermoSource {
    fn combustion_properties(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError> {
        match self {
            ThermoSource::Fixed(p) => {
                p.combustion_properties(chamber_pressure_bar, mixture_ratio, area_ratio)
            }
            ThermoSource::Table(p) => {
                p.combustion_properties(chamber_pressure_bar, mixture_ratio, area_ratio)
            }
        }
    }

    fn chamber_specific_heat(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<f64, ThermoError> {
        match self {
            ThermoSource::Fixed(p) => {
                p.chamber_specific_heat(chamber_pressure_bar, mixture_ratio, area_ratio)
            }
            ThermoSource::Table(p) => {
                p.chamber_specific_heat(chamber_pressure_bar, mixture_ratio, area_ratio)
            }
        }
    }

    fn mixture_ratio_bounds(&self) -> Option<(f64, f64)> {
        match self {
            ThermoSource::Fixed(p) => p.mixture_ratio_bounds(),
            ThermoSource::Table(p) => p.mixture_ratio_bounds(),
        }
    }
}

/// Build the thermo provider: a cached table when `thermo_table` is set (relative paths
/// resolve against `base_dir`), otherwise fixed values from the `thermo_*` keys.
pub fn thermo_from_file(file: &EngineFile, base_dir: &Path) -> Result<ThermoSource, ScenarioError> {
    if let Some(table_path) = &file.thermo_table {
        let path = if table_path.is_absolute() {
            table_path.clone()
        } else {
            base_dir.join(table_path)
        };
        let table = ThermoTable::from_csv_path(file.area_ratio, &path)?;
        return Ok(ThermoSource::Table(CachedThermo::new(table)));
    }

    match (
        file.thermo_gamma,
        file.thermo_cp_j_kg_k,
        file.thermo_chamber_temperature_k,
        file.thermo_cstar_m_s,
    ) {
        (Some(gamma), Some(cp), Some(tc), Some(cstar)) => {
            let mut fixed = FixedThermo::new(gamma, cp, tc, cstar);
            if let Some(cf) = file.thermo_thrust_coefficient {
                fixed = fixed.with_thrust_coefficient(cf);
            }
            if let Some(molar_mass) = file.thermo_molar_mass {
                fixed = fixed.with_molar_mass(molar_mass);
            }
            Ok(ThermoSource::Fixed(fixed))
        }
        _ => Err(ScenarioError::MissingThermo(file.name.clone())),
    }
}

/// Engine-file keys that a sweep may vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParameter {
    GrainLength,
    InitialPortRadius,
    GrainDensity,
    RegressionA,
    RegressionN,
    ThroatRadius,
    AreaRatio,
    CombustionEfficiency,
    PreChamberVolume,
    PostChamberVolume,
    OxidizerVolume,
    OxidizerMassFlow,
    TimeStep,
}

impl SweepParameter {
    pub const ALL: [SweepParameter; 13] = [
        SweepParameter::GrainLength,
        SweepParameter::InitialPortRadius,
        SweepParameter::GrainDensity,
        SweepParameter::RegressionA,
        SweepParameter::RegressionN,
        SweepParameter::ThroatRadius,
        SweepParameter::AreaRatio,
        SweepParameter::CombustionEfficiency,
        SweepParameter::PreChamberVolume,
        SweepParameter::PostChamberVolume,
        SweepParameter::OxidizerVolume,
        SweepParameter::OxidizerMassFlow,
        SweepParameter::TimeStep,
    ];

    /// The engine-file key this parameter overwrites.
    pub fn key(self) -> &'static str {
        match self {
            SweepParameter::GrainLength => "grain_length_m",
            SweepParameter::InitialPortRadius => "initial_port_radius_m",
            SweepParameter::GrainDensity => "grain_density_kg_m3",
            SweepParameter::RegressionA => "regression_a",
            SweepParameter::RegressionN => "regression_n",
            SweepParameter::ThroatRadius => "throat_radius_m",
            SweepParameter::AreaRatio => "area_ratio",
            SweepParameter::CombustionEfficiency => "combustion_efficiency",
            SweepParameter::PreChamberVolume => "pre_chamber_volume_m3",
            SweepParameter::PostChamberVolume => "post_chamber_volume_m3",
            SweepParameter::OxidizerVolume => "oxidizer_volume_l",
            SweepParameter::OxidizerMassFlow => "oxidizer_mass_flow_kg_s",
            SweepParameter::TimeStep => "time_step_s",
        }
    }

    pub fn apply(self, file: &mut EngineFile, value: f64) {
        let slot = match self {
            SweepParameter::GrainLength => &mut file.grain_length_m,
            SweepParameter::InitialPortRadius => &mut file.initial_port_radius_m,
            SweepParameter::GrainDensity => &mut file.grain_density_kg_m3,
            SweepParameter::RegressionA => &mut file.regression_a,
            SweepParameter::RegressionN => &mut file.regression_n,
            SweepParameter::ThroatRadius => &mut file.throat_radius_m,
            SweepParameter::AreaRatio => &mut file.area_ratio,
            SweepParameter::CombustionEfficiency => &mut file.combustion_efficiency,
            SweepParameter::PreChamberVolume => &mut file.pre_chamber_volume_m3,
            SweepParameter::PostChamberVolume => &mut file.post_chamber_volume_m3,
            SweepParameter::OxidizerVolume => &mut file.oxidizer_volume_l,
            SweepParameter::OxidizerMassFlow => &mut file.oxidizer_mass_flow_kg_s,
            SweepParameter::TimeStep => &mut file.time_step_s,
        };
        *slot = value;
    }
}

impl FromStr for SweepParameter {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SweepParameter::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScenarioError::UnknownParameter(s.to_string()))
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
