//! Internal ballistics of a single-port hybrid rocket motor.
//!
//! The simulator marches chamber state forward with explicit Euler steps: a regression law
//! turns oxidizer flux into fuel mass flow, a thermochemical provider supplies gas properties,
//! and a quasi-steady chamber mass balance with choked nozzle outflow drives the pressure.
//! Each run owns its [`ChamberState`]; configurations are immutable [`EngineConfig`] values,
//! so independent runs can execute on separate threads.

pub mod engine;
pub mod error;
pub mod feed;
pub mod log;
pub mod nozzle;
pub mod observer;
pub mod regression;
pub mod settings;
pub mod simulator;
pub mod state;

pub use engine::{
    EngineConfig, EngineConfigBuilder, GrainGeometry, NozzleGeometry, OxidizerSupply,
    WallGeometry,
};
pub use error::{ConfigurationError, NumericalFault, SimulationError};
pub use feed::{ConstantFeed, FeedError, MeasuredFeed, OxidizerFeed, ScheduledFeed};
pub use log::{BurnSummary, ResultLog, StepRecord};
pub use observer::{BurnObserver, NullObserver, TracingObserver};
pub use regression::{FluxBasis, RegressionLaw, RegressionOutput};
pub use settings::{FaultPolicy, SimulationSettings, TimeStepPolicy};
pub use simulator::{BurnReport, BurnSimulator, BurnStatus, FaultEvent, StepOutcome, step};
pub use state::ChamberState;
