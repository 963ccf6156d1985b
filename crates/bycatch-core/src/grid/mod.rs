//! Spatial grid: cells, aggregates, food and path geometry.

pub mod food;
pub mod landscape;
pub mod paths;

pub use food::{clamp_food, regrow, seasonal_capacity};
pub use landscape::{
    Block, Cell, CellDescriptor, FisheryZone, Landscape, LandscapeDescriptor, Region,
};
pub use paths::{sweep_angles, MoveProposal};
