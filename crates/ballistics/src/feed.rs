//! Oxidizer feed strategies injected into an engine configuration.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default floor applied to negative measured mass-flow samples (kg/s).
pub const DEFAULT_MEASURED_FLOOR: f64 = 0.001;

/// Source of the oxidizer mass flow entering the chamber.
pub trait OxidizerFeed: Send + Sync + fmt::Debug {
    /// Oxidizer mass flow (kg/s) at the given burn time.
    fn mass_flow_rate(&self, time: f64) -> f64;

    /// Burn time after which the feed has no more data, if any.
    fn end_time(&self) -> Option<f64> {
        None
    }
}

/// Constant mass flow for the whole burn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFeed(pub f64);

impl OxidizerFeed for ConstantFeed {
    fn mass_flow_rate(&self, _time: f64) -> f64 {
        self.0
    }
}

/// Mass flow given by a function of burn time.
pub struct ScheduledFeed<F> {
    schedule: F,
}

impl<F> ScheduledFeed<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    pub fn new(schedule: F) -> Self {
        Self { schedule }
    }
}

impl<F> fmt::Debug for ScheduledFeed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledFeed").finish_non_exhaustive()
    }
}

impl<F> OxidizerFeed for ScheduledFeed<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn mass_flow_rate(&self, time: f64) -> f64 {
        (self.schedule)(time)
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("measured feed needs at least two samples, got {0}")]
    TooFewSamples(usize),
    #[error("sample times must be finite and strictly increasing (index {0})")]
    UnorderedTimes(usize),
    #[error("time and flow series differ in length ({times} vs {flows})")]
    LengthMismatch { times: usize, flows: usize },
    #[error("no samples inside the window [{start}, {end}] s")]
    EmptyWindow { start: f64, end: f64 },
    #[error("failed to read measured feed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct FeedRow {
    time_s: f64,
    mass_flow_kg_s: f64,
}

/// Mass flow interpolated from a measured time series (hotfire replay).
///
/// Between samples the flow is linear; outside the series it holds the end values. Negative
/// samples (sensor noise around zero flow) are replaced by a small positive floor.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredFeed {
    times: Vec<f64>,
    flows: Vec<f64>,
}

impl MeasuredFeed {
    pub fn new(times: Vec<f64>, flows: Vec<f64>, floor: f64) -> Result<Self, FeedError> {
        if times.len() != flows.len() {
            return Err(FeedError::LengthMismatch {
                times: times.len(),
                flows: flows.len(),
            });
        }
        if times.len() < 2 {
            return Err(FeedError::TooFewSamples(times.len()));
        }
        for (idx, pair) in times.windows(2).enumerate() {
            if !(pair[0].is_finite() && pair[1] > pair[0]) {
                return Err(FeedError::UnorderedTimes(idx + 1));
            }
        }
        let flows = flows
            .into_iter()
            .map(|v| if v < 0.0 || !v.is_finite() { floor } else { v })
            .collect();
        Ok(Self { times, flows })
    }

    /// Load `time_s,mass_flow_kg_s` rows from CSV.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, floor: f64) -> Result<Self, FeedError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut times = Vec::new();
        let mut flows = Vec::new();
        for row in rdr.deserialize::<FeedRow>() {
            let row = row?;
            times.push(row.time_s);
            flows.push(row.mass_flow_kg_s);
        }
        Self::new(times, flows, floor)
    }

    /// Samples inside `[start, end]`, re-based so the first kept sample is at t = 0.
    pub fn window(&self, start: f64, end: f64) -> Result<Self, FeedError> {
        let kept: Vec<(f64, f64)> = self
            .times
            .iter()
            .zip(&self.flows)
            .filter(|(t, _)| **t >= start && **t <= end)
            .map(|(t, f)| (*t, *f))
            .collect();
        let Some(&(t0, _)) = kept.first() else {
            return Err(FeedError::EmptyWindow { start, end });
        };
        if kept.len() < 2 {
            return Err(FeedError::TooFewSamples(kept.len()));
        }
        Ok(Self {
            times: kept.iter().map(|(t, _)| t - t0).collect(),
            flows: kept.iter().map(|(_, f)| *f).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Oxidizer mass delivered over the whole series (trapezoidal).
    pub fn total_mass(&self) -> f64 {
        self.times
            .windows(2)
            .zip(self.flows.windows(2))
            .map(|(t, f)| 0.5 * (f[0] + f[1]) * (t[1] - t[0]))
            .sum()
    }
}

impl OxidizerFeed for MeasuredFeed {
    fn mass_flow_rate(&self, time: f64) -> f64 {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return self.flows[0];
        }
        if time >= self.times[last] {
            return self.flows[last];
        }
        let upper = self.times.partition_point(|t| *t <= time);
        let lower = upper - 1;
        let t = (time - self.times[lower]) / (self.times[upper] - self.times[lower]);
        self.flows[lower] + t * (self.flows[upper] - self.flows[lower])
    }

    fn end_time(&self) -> Option<f64> {
        self.times.last().copied()
    }
}
