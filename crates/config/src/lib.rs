//! Engine file models and loaders for the hybrid motor simulator.
//!
//! An engine file is a flat TOML document: one `key = value` per line, no tables. A catalog
//! is either a directory of engine files (sorted by file name) or a YAML list of records.

use std::fs::File;
use std::path::{Path, PathBuf};

use hybrid_ballistics::FluxBasis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One engine as persisted on disk. SI units unless the key says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFile {
    pub name: String,

    // Grain
    pub grain_length_m: f64,
    pub initial_port_radius_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_port_radius_m: Option<f64>,
    pub grain_density_kg_m3: f64,
    pub regression_a: f64,
    pub regression_n: f64,
    #[serde(default)]
    pub regression_m: f64,
    /// `"oxidizer"` or `"propellant"`.
    #[serde(default)]
    pub regression_flux_basis: FluxBasis,

    // Nozzle and chamber
    pub throat_radius_m: f64,
    pub area_ratio: f64,
    #[serde(default = "default_combustion_efficiency")]
    pub combustion_efficiency: f64,
    #[serde(default = "unity")]
    pub nozzle_efficiency: f64,
    #[serde(default = "unity")]
    pub discharge_coefficient: f64,
    #[serde(default = "default_pre_chamber_volume")]
    pub pre_chamber_volume_m3: f64,
    #[serde(default = "default_post_chamber_volume")]
    pub post_chamber_volume_m3: f64,

    // Oxidizer
    #[serde(default = "default_oxidizer_density")]
    pub oxidizer_density_kg_m3: f64,
    pub oxidizer_volume_l: f64,
    pub oxidizer_mass_flow_kg_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_pressure_pa: Option<f64>,

    // Case wall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_thickness_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_yield_strength_pa: Option<f64>,

    // Integration
    #[serde(default = "default_time_step")]
    pub time_step_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_time_step_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_step_transition_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub suppress_mixture_out_of_range: bool,

    // Thermochemistry: either a table path or fixed properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_table: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_cp_j_kg_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_chamber_temperature_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_cstar_m_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_molar_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermo_thrust_coefficient: Option<f64>,
}

fn default_combustion_efficiency() -> f64 {
    0.9
}

fn unity() -> f64 {
    1.0
}

fn default_pre_chamber_volume() -> f64 {
    5.0e-5
}

fn default_post_chamber_volume() -> f64 {
    2.5e-5
}

fn default_oxidizer_density() -> f64 {
    800.0
}

fn default_time_step() -> f64 {
    1.0e-3
}

/// Errors that can occur while loading or writing engine files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access engine file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("no engine files found in {0}")]
    EmptyCatalog(PathBuf),
}

/// Load a single flat TOML engine file.
pub fn load_engine_file<P: AsRef<Path>>(path: P) -> Result<EngineFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Write an engine file back out as flat TOML, creating parent directories.
pub fn write_engine_file<P: AsRef<Path>>(path: P, engine: &EngineFile) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, toml::to_string(engine)?)?;
    Ok(())
}

/// Load every engine in a catalog: a directory of TOML files, a single TOML file, or a YAML list.
pub fn load_engine_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<EngineFile>, ConfigError> {
    let path = path.as_ref();
    let engines: Vec<EngineFile> = load_records(path)?;
    if engines.is_empty() {
        return Err(ConfigError::EmptyCatalog(path.to_path_buf()));
    }
    Ok(engines)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    let mut records = Vec::with_capacity(entries.len());
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        records.push(toml::from_str(&contents)?);
    }
    Ok(records)
}
