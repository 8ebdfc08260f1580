use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CombustionProperties, ThermoError, ThermoProvider};

const AREA_RATIO_TOLERANCE: f64 = 1e-6;

/// One row of a tabulated equilibrium dataset.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TableRow {
    pub pressure_bar: f64,
    pub mixture_ratio: f64,
    pub thrust_coefficient: f64,
    pub cstar_m_s: f64,
    pub chamber_temperature_k: f64,
    pub molar_mass: f64,
    pub gamma: f64,
    pub cp_j_kg_k: f64,
}

/// Equilibrium properties tabulated over chamber pressure × mixture ratio at one area ratio.
///
/// Lookups interpolate bilinearly. Pressures beyond the table are clamped to its edge; mixture
/// ratios beyond it are rejected so the caller can decide whether to clamp.
#[derive(Debug, Clone)]
pub struct ThermoTable {
    area_ratio: f64,
    pressures_bar: Vec<f64>,
    mixture_ratios: Vec<f64>,
    // row-major: pressure index, then mixture ratio index
    cells: Vec<TableRow>,
}

impl ThermoTable {
    /// Build a table from rows covering a full rectangular grid (any order).
    pub fn from_rows(area_ratio: f64, rows: Vec<TableRow>) -> Result<Self, ThermoError> {
        if !(area_ratio.is_finite() && area_ratio > 0.0) {
            return Err(ThermoError::MalformedTable(format!(
                "area ratio must be positive, got {area_ratio}"
            )));
        }
        if rows.is_empty() {
            return Err(ThermoError::MalformedTable("table has no rows".into()));
        }

        let pressures_bar = sorted_unique(rows.iter().map(|r| r.pressure_bar));
        let mixture_ratios = sorted_unique(rows.iter().map(|r| r.mixture_ratio));
        if pressures_bar.len() < 2 || mixture_ratios.len() < 2 {
            return Err(ThermoError::MalformedTable(
                "need at least two pressures and two mixture ratios".into(),
            ));
        }
        let expected = pressures_bar.len() * mixture_ratios.len();
        if rows.len() != expected {
            return Err(ThermoError::MalformedTable(format!(
                "expected {expected} rows for a {}x{} grid, found {}",
                pressures_bar.len(),
                mixture_ratios.len(),
                rows.len()
            )));
        }

        let mut slots: Vec<Option<TableRow>> = vec![None; expected];
        for row in rows {
            let p_idx = index_of(&pressures_bar, row.pressure_bar);
            let m_idx = index_of(&mixture_ratios, row.mixture_ratio);
            let slot = &mut slots[p_idx * mixture_ratios.len() + m_idx];
            if slot.is_some() {
                return Err(ThermoError::MalformedTable(format!(
                    "duplicate entry at {} bar, O/F {}",
                    row.pressure_bar, row.mixture_ratio
                )));
            }
            *slot = Some(row);
        }
        let cells = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ThermoError::MalformedTable("grid has gaps".into()))?;

        Ok(Self {
            area_ratio,
            pressures_bar,
            mixture_ratios,
            cells,
        })
    }

    /// Read a table from CSV with a `pressure_bar,mixture_ratio,...` header.
    pub fn from_reader<R: Read>(area_ratio: f64, reader: R) -> Result<Self, ThermoError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = rdr
            .deserialize::<TableRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(area_ratio, rows)
    }

    pub fn from_csv_path<P: AsRef<Path>>(area_ratio: f64, path: P) -> Result<Self, ThermoError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|err| ThermoError::Io(format!("{}: {err}", path.display())))?;
        let table = Self::from_reader(area_ratio, file)?;
        tracing::debug!(
            path = %path.display(),
            pressures = table.pressures_bar.len(),
            mixture_ratios = table.mixture_ratios.len(),
            "loaded thermo table"
        );
        Ok(table)
    }

    pub fn area_ratio(&self) -> f64 {
        self.area_ratio
    }

    fn check_area_ratio(&self, area_ratio: f64) -> Result<(), ThermoError> {
        if (area_ratio - self.area_ratio).abs() > AREA_RATIO_TOLERANCE * self.area_ratio {
            return Err(ThermoError::AreaRatioMismatch {
                requested: area_ratio,
                table: self.area_ratio,
            });
        }
        Ok(())
    }

    fn interpolate<F>(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
        field: F,
    ) -> Result<f64, ThermoError>
    where
        F: Fn(&TableRow) -> f64,
    {
        if !chamber_pressure_bar.is_finite() || !mixture_ratio.is_finite() {
            return Err(ThermoError::InvalidInput(format!(
                "non-finite operating point ({chamber_pressure_bar} bar, O/F {mixture_ratio})"
            )));
        }
        self.check_area_ratio(area_ratio)?;

        let (min_mr, max_mr) = self.bounds();
        if mixture_ratio < min_mr || mixture_ratio > max_mr {
            return Err(ThermoError::MixtureOutOfRange {
                mixture_ratio,
                min: min_mr,
                max: max_mr,
            });
        }

        let (p0, p1, tp) = bracket(&self.pressures_bar, chamber_pressure_bar);
        let (m0, m1, tm) = bracket(&self.mixture_ratios, mixture_ratio);
        let width = self.mixture_ratios.len();
        let at = |p: usize, m: usize| field(&self.cells[p * width + m]);

        let low = at(p0, m0) + tm * (at(p0, m1) - at(p0, m0));
        let high = at(p1, m0) + tm * (at(p1, m1) - at(p1, m0));
        Ok(low + tp * (high - low))
    }

    fn bounds(&self) -> (f64, f64) {
        (
            self.mixture_ratios[0],
            self.mixture_ratios[self.mixture_ratios.len() - 1],
        )
    }
}

impl ThermoProvider for ThermoTable {
    fn combustion_properties(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError> {
        let lookup = |field: fn(&TableRow) -> f64| {
            self.interpolate(chamber_pressure_bar, mixture_ratio, area_ratio, field)
        };
        Ok(CombustionProperties {
            thrust_coefficient: lookup(|r| r.thrust_coefficient)?,
            characteristic_velocity_m_s: lookup(|r| r.cstar_m_s)?,
            chamber_temperature_k: lookup(|r| r.chamber_temperature_k)?,
            molar_mass: lookup(|r| r.molar_mass)?,
            gamma: lookup(|r| r.gamma)?,
        })
    }

    fn chamber_specific_heat(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<f64, ThermoError> {
        self.interpolate(chamber_pressure_bar, mixture_ratio, area_ratio, |r| {
            r.cp_j_kg_k
        })
    }

    fn mixture_ratio_bounds(&self) -> Option<(f64, f64)> {
        Some(self.bounds())
    }
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

fn index_of(axis: &[f64], value: f64) -> usize {
    axis.partition_point(|v| *v < value)
}

/// Lower/upper indices around `value` and the interpolation weight, clamped to the axis ends.
fn bracket(axis: &[f64], value: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if value <= axis[0] {
        return (0, 1, 0.0);
    }
    if value >= axis[last] {
        return (last - 1, last, 1.0);
    }
    let upper = axis.partition_point(|v| *v <= value).min(last);
    let lower = upper - 1;
    let t = (value - axis[lower]) / (axis[upper] - axis[lower]);
    (lower, upper, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pressure_bar: f64, mixture_ratio: f64, gamma: f64, cstar: f64) -> TableRow {
        TableRow {
            pressure_bar,
            mixture_ratio,
            thrust_coefficient: 1.4,
            cstar_m_s: cstar,
            chamber_temperature_k: 3000.0,
            molar_mass: 26.0,
            gamma,
            cp_j_kg_k: 2000.0,
        }
    }

    fn sample_table() -> ThermoTable {
        ThermoTable::from_rows(
            5.0,
            vec![
                row(10.0, 4.0, 1.20, 1500.0),
                row(10.0, 8.0, 1.24, 1550.0),
                row(30.0, 4.0, 1.22, 1520.0),
                row(30.0, 8.0, 1.26, 1590.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn grid_points_are_reproduced() {
        let table = sample_table();
        let props = table.combustion_properties(30.0, 8.0, 5.0).unwrap();
        assert_eq!(props.gamma, 1.26);
        assert_eq!(props.characteristic_velocity_m_s, 1590.0);
    }

    #[test]
    fn midpoint_is_average_of_corners() {
        let table = sample_table();
        let props = table.combustion_properties(20.0, 6.0, 5.0).unwrap();
        let expected = (1500.0 + 1550.0 + 1520.0 + 1590.0) / 4.0;
        assert!((props.characteristic_velocity_m_s - expected).abs() < 1e-9);
    }

    #[test]
    fn pressure_beyond_table_is_clamped() {
        let table = sample_table();
        let high = table.combustion_properties(90.0, 4.0, 5.0).unwrap();
        assert_eq!(high.gamma, 1.22);
    }

    #[test]
    fn mixture_ratio_outside_domain_is_rejected() {
        let table = sample_table();
        let err = table.combustion_properties(20.0, 12.0, 5.0).unwrap_err();
        assert!(matches!(err, ThermoError::MixtureOutOfRange { .. }));
        assert_eq!(table.mixture_ratio_bounds(), Some((4.0, 8.0)));
    }

    #[test]
    fn area_ratio_mismatch_is_rejected() {
        let table = sample_table();
        let err = table.chamber_specific_heat(20.0, 6.0, 6.0).unwrap_err();
        assert!(matches!(err, ThermoError::AreaRatioMismatch { .. }));
    }

    #[test]
    fn incomplete_grid_is_malformed() {
        let err = ThermoTable::from_rows(
            5.0,
            vec![
                row(10.0, 4.0, 1.2, 1500.0),
                row(10.0, 8.0, 1.2, 1500.0),
                row(30.0, 4.0, 1.2, 1500.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ThermoError::MalformedTable(_)));
    }

    #[test]
    fn csv_reader_parses_rows() {
        let csv = "pressure_bar,mixture_ratio,thrust_coefficient,cstar_m_s,\
                   chamber_temperature_k,molar_mass,gamma,cp_j_kg_k\n\
                   10,4,1.4,1500,3000,26,1.2,2000\n\
                   10,8,1.4,1550,3000,26,1.24,2000\n\
                   30,4,1.4,1520,3000,26,1.22,2000\n\
                   30,8,1.4,1590,3000,26,1.26,2000\n";
        let table = ThermoTable::from_reader(5.0, csv.as_bytes()).unwrap();
        let cp = table.chamber_specific_heat(15.0, 5.0, 5.0).unwrap();
        assert_eq!(cp, 2000.0);
    }
}
