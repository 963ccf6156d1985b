//! Gear engine: placement, entanglement, soak and the per-cell index.

pub mod effort;
pub mod net;
pub mod registry;

pub use effort::{EffortSampler, EffortSource, GearEffort, HistoricalEffort, NoEffort};
pub use net::{decay_probability, entanglement_probability, Gear, MeshType, SOAK_PER_TICK};
pub use registry::{gear_id_to_u64, GearId, GearRegistry};
