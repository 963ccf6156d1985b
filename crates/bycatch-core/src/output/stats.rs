//! Run statistics
//!
//! Totals accumulated over a whole run, written once at the end.

use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::Serialize;

use crate::error::SinkError;

/// Statistics output file name
pub const STATS_FILE_NAME: &str = "stats.json";

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub steps: u64,
    pub initial_population: u32,
    pub final_population: u32,
    pub peak_population: u32,
    pub births: u32,
    pub deaths_age: u32,
    pub deaths_starvation: u32,
    pub bycatch: u32,
    pub gear_deployed: u32,
    pub gear_retired: u32,
    /// Sets dropped because no valid placement was found
    pub gear_discarded: u32,
    /// Catch tallied from retired gear
    pub hauled_catch: u32,
    /// Agent steps skipped for lack of a valid cell
    pub skipped_steps: u64,
    pub sink_failures: u64,
}

impl RunStats {
    pub fn natural_deaths(&self) -> u32 {
        self.deaths_age + self.deaths_starvation
    }

    /// Population expected from the recorded births and deaths.
    pub fn expected_population(&self) -> i64 {
        self.initial_population as i64 + self.births as i64
            - self.natural_deaths() as i64
            - self.bycatch as i64
    }

    pub fn observe_population(&mut self, population: u32) {
        self.final_population = population;
        self.peak_population = self.peak_population.max(population);
    }

    /// Write the statistics as pretty JSON
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_expected_population() {
        let stats = RunStats {
            initial_population: 100,
            births: 10,
            deaths_age: 3,
            deaths_starvation: 2,
            bycatch: 1,
            ..Default::default()
        };
        assert_eq!(stats.natural_deaths(), 5);
        assert_eq!(stats.expected_population(), 104);
    }

    #[test]
    fn test_peak_population() {
        let mut stats = RunStats::default();
        stats.observe_population(50);
        stats.observe_population(70);
        stats.observe_population(60);
        assert_eq!(stats.peak_population, 70);
        assert_eq!(stats.final_population, 60);
    }

    #[test]
    fn test_write_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATS_FILE_NAME);
        let stats = RunStats {
            steps: 48,
            gear_discarded: 2,
            ..Default::default()
        };
        stats.write(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"gear_discarded\": 2"));
    }
}
