//! Output records emitted by the simulation.
//!
//! Every record serializes to one JSON object tagged with a `record` field,
//! so a single JSONL stream can carry all of them.

use serde::{Deserialize, Serialize};

use crate::timestamp::SimTimestamp;

/// Movement state of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Correlated random walk with memory attraction.
    #[default]
    Foraging,
    /// Heading towards a distant block.
    DirectedDispersal,
    /// Heading back towards an earlier daily position.
    ReturningDispersal,
    /// Following the coast at constant distance.
    CoastalDispersal,
}

impl MovementMode {
    pub fn is_dispersing(self) -> bool {
        !matches!(self, MovementMode::Foraging)
    }
}

/// Per-tick state of one tracked animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTrack {
    pub step: u64,
    pub agent_id: u64,
    pub age: f32,
    pub x: f32,
    pub y: f32,
    pub cell: u32,
    pub heading: f32,
    pub prev_move: f32,
    pub energy: f32,
    pub mode: MovementMode,
    pub pregnant: bool,
    pub nursing: bool,
}

/// An animal entangled in a gear set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BycatchEvent {
    pub timestamp: SimTimestamp,
    pub agent_id: u64,
    pub gear_id: u64,
    pub gear_type: u8,
    pub x: f32,
    pub y: f32,
    pub age: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fishery_zone: Option<u32>,
}

/// A gear set placed in a fishery zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearSet {
    pub timestamp: SimTimestamp,
    pub gear_id: u64,
    pub gear_type: u8,
    pub fishery_zone: u32,
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub max_soak_days: f32,
    pub pinger: bool,
}

/// A gear set hauled after reaching its soak time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearRetired {
    pub timestamp: SimTimestamp,
    pub gear_id: u64,
    pub gear_type: u8,
    pub fishery_zone: u32,
    pub soak_days: f32,
    pub catch: u32,
}

/// Counters for one simulation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub step: u64,
    pub population: u32,
    pub births: u32,
    pub deaths_age: u32,
    pub deaths_starvation: u32,
    pub bycatch: u32,
    pub gear_active: u32,
    pub gear_retired: u32,
    /// Catch tallied from the gear retired this step.
    pub hauled_catch: u32,
}

/// Monthly population-level report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationReport {
    pub timestamp: SimTimestamp,
    pub population: u32,
    pub total_food: f64,
    /// Seasonal food capacity summed over the food patches.
    pub total_capacity: f64,
    pub mean_energy: f32,
    pub gear_sets: u32,
    pub bycatch: u32,
}

/// Monthly age-class counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeStructure {
    pub timestamp: SimTimestamp,
    /// Younger than 4 years.
    pub juvenile: u32,
    /// 4 to 10 years.
    pub adult: u32,
    /// 10 years and older.
    pub old: u32,
}

/// Monthly per-region demography; counters cover the month since the last report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDemography {
    pub timestamp: SimTimestamp,
    pub region: u32,
    pub population: u32,
    pub births: u32,
    pub deaths: u32,
    pub bycatch: u32,
}

/// Any record written to an output sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum SimRecord {
    AgentTrack(AgentTrack),
    Bycatch(BycatchEvent),
    GearSet(GearSet),
    GearRetired(GearRetired),
    TickSummary(TickSummary),
    PopulationReport(PopulationReport),
    AgeStructure(AgeStructure),
    RegionDemography(RegionDemography),
}

impl SimRecord {
    /// Short name of the record kind, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            SimRecord::AgentTrack(_) => "agent_track",
            SimRecord::Bycatch(_) => "bycatch",
            SimRecord::GearSet(_) => "gear_set",
            SimRecord::GearRetired(_) => "gear_retired",
            SimRecord::TickSummary(_) => "tick_summary",
            SimRecord::PopulationReport(_) => "population_report",
            SimRecord::AgeStructure(_) => "age_structure",
            SimRecord::RegionDemography(_) => "region_demography",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_summary_tag() {
        let record = SimRecord::TickSummary(TickSummary {
            step: 12,
            population: 300,
            bycatch: 1,
            ..Default::default()
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"record":"tick_summary","step":12"#));
        assert_eq!(record.kind(), "tick_summary");
    }

    #[test]
    fn test_bycatch_skips_missing_region() {
        let record = SimRecord::Bycatch(BycatchEvent {
            timestamp: SimTimestamp::new(100, 1, 3),
            agent_id: 7,
            gear_id: 42,
            gear_type: 1,
            x: 10.5,
            y: 3.25,
            age: 2.5,
            region: None,
            fishery_zone: Some(2),
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"region\""));
        assert!(json.contains(r#""fishery_zone":2"#));
        assert!(json.contains(r#""date":"year_1.day_003""#));

        let parsed: SimRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_movement_mode_names() {
        let json = serde_json::to_string(&MovementMode::CoastalDispersal).unwrap();
        assert_eq!(json, r#""coastal_dispersal""#);
        assert!(MovementMode::DirectedDispersal.is_dispersing());
        assert!(!MovementMode::default().is_dispersing());
    }
}
