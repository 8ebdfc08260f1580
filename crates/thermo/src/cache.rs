use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CombustionProperties, ThermoError, ThermoProvider, ThermoState};

type Key = (i64, i64, i64);

/// Memoizing wrapper around a slow provider.
///
/// Operating points are quantized before lookup, so adjacent simulation steps whose pressure
/// and mixture ratio fall in the same bucket reuse the first stored result. The cache belongs
/// to one wrapper instance; wrap each propellant definition separately.
#[derive(Debug)]
pub struct CachedThermo<P> {
    inner: P,
    pressure_resolution_bar: f64,
    mixture_ratio_resolution: f64,
    area_ratio_resolution: f64,
    entries: Mutex<HashMap<Key, ThermoState>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: ThermoProvider> CachedThermo<P> {
    /// Wrap `inner` with a default resolution of 0.01 bar and 0.001 O/F.
    pub fn new(inner: P) -> Self {
        Self::with_resolution(inner, 0.01, 0.001)
    }

    pub fn with_resolution(
        inner: P,
        pressure_resolution_bar: f64,
        mixture_ratio_resolution: f64,
    ) -> Self {
        Self {
            inner,
            pressure_resolution_bar: pressure_resolution_bar.max(f64::MIN_POSITIVE),
            mixture_ratio_resolution: mixture_ratio_resolution.max(f64::MIN_POSITIVE),
            area_ratio_resolution: 1e-6,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, chamber_pressure_bar: f64, mixture_ratio: f64, area_ratio: f64) -> Option<Key> {
        if !(chamber_pressure_bar.is_finite()
            && mixture_ratio.is_finite()
            && area_ratio.is_finite())
        {
            return None;
        }
        Some((
            (chamber_pressure_bar / self.pressure_resolution_bar).round() as i64,
            (mixture_ratio / self.mixture_ratio_resolution).round() as i64,
            (area_ratio / self.area_ratio_resolution).round() as i64,
        ))
    }

    fn cached_state(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<ThermoState, ThermoError> {
        let Some(key) = self.key(chamber_pressure_bar, mixture_ratio, area_ratio) else {
            return self
                .inner
                .thermo_state(chamber_pressure_bar, mixture_ratio, area_ratio);
        };

        if let Some(state) = self.entries.lock().ok().and_then(|e| e.get(&key).copied()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(state);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let state = self
            .inner
            .thermo_state(chamber_pressure_bar, mixture_ratio, area_ratio)?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, state);
        }
        Ok(state)
    }
}

impl<P: ThermoProvider> ThermoProvider for CachedThermo<P> {
    fn combustion_properties(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<CombustionProperties, ThermoError> {
        let state = self.cached_state(chamber_pressure_bar, mixture_ratio, area_ratio)?;
        Ok(CombustionProperties {
            thrust_coefficient: state.thrust_coefficient,
            characteristic_velocity_m_s: state.characteristic_velocity_m_s,
            chamber_temperature_k: state.chamber_temperature_k,
            molar_mass: state.molar_mass,
            gamma: state.gamma,
        })
    }

    fn chamber_specific_heat(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<f64, ThermoError> {
        self.cached_state(chamber_pressure_bar, mixture_ratio, area_ratio)
            .map(|s| s.specific_heat_cp)
    }

    fn mixture_ratio_bounds(&self) -> Option<(f64, f64)> {
        self.inner.mixture_ratio_bounds()
    }

    fn thermo_state(
        &self,
        chamber_pressure_bar: f64,
        mixture_ratio: f64,
        area_ratio: f64,
    ) -> Result<ThermoState, ThermoError> {
        self.cached_state(chamber_pressure_bar, mixture_ratio, area_ratio)
    }
}
