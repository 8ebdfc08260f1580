//! Hybrid rocket motor burn simulation.
//!
//! The member crates do the work; this facade re-exports them and hosts the `scenario`
//! module that turns engine files into runtime values for the binaries.

pub use hybrid_ballistics as ballistics;
pub use hybrid_config as config;
pub use hybrid_core as core;
pub use hybrid_export as export;
pub use hybrid_sizing as sizing;
pub use hybrid_sweep as sweep;
pub use hybrid_thermo as thermo;

pub mod scenario;
