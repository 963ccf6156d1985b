//! Porpoise Bycatch Simulation Library
//!
//! Individual-based simulation of harbour porpoises foraging, dispersing
//! and breeding on a gridded seascape, with gillnets set from sampled
//! historical fishing effort.

pub mod agent;
pub mod config;
pub mod error;
pub mod gear;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod output;
pub mod simulation;
pub mod systems;

pub use agent::{Agent, AgentFate};
pub use config::{SimConfig, SimParams};
pub use error::{ConfigError, LandscapeError, SimError, SinkError};
pub use gear::{EffortSampler, HistoricalEffort, NoEffort};
pub use grid::{Landscape, LandscapeDescriptor};
pub use output::{EventSink, JsonlSink, MemorySink, NullSink, RunStats};
pub use simulation::{RunOutcome, Simulation};
pub use systems::SimRng;
