//! Shared calendar and record types for the bycatch simulation.
//!
//! This crate contains pure data structures with no simulation logic.

pub mod record;
pub mod timestamp;

pub use record::{
    AgeStructure, AgentTrack, BycatchEvent, GearRetired, GearSet, MovementMode,
    PopulationReport, RegionDemography, SimRecord, TickSummary,
};
pub use timestamp::{
    month_of_day, quarter_of_month, wrap_day_of_year, ParseDateError, Season, SimClock, SimDate,
    SimTimestamp, DAYS_PER_YEAR, TICKS_PER_DAY, TICKS_PER_YEAR,
};
