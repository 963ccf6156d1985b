//! Historical fishing effort.
//!
//! The sampler decides how many nets go out in a fishery zone on a given day
//! and with what soak time, length and deterrent setting. The historical
//! implementation resamples recorded haul counts and effort measurements.

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use bycatch_events::{Season, DAYS_PER_YEAR};

use super::net::MeshType;

/// Effort attached to one set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearEffort {
    /// Soak time until hauling, in days
    pub soak_days: f32,
    /// Net length in map units
    pub length: f32,
    pub pinger: bool,
}

/// Source of daily gear deployments.
pub trait EffortSampler: Send + Sync {
    /// Effort for every net set in `zone` on `day_of_year` (1-based) with
    /// the given mesh. Empty when nothing is fished.
    fn sample_sets(
        &self,
        zone: u32,
        day_of_year: u16,
        season: Season,
        mesh: MeshType,
        rng: &mut SmallRng,
    ) -> Vec<GearEffort>;
}

/// Sampler that never deploys gear.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffort;

impl EffortSampler for NoEffort {
    fn sample_sets(&self, _: u32, _: u16, _: Season, _: MeshType, _: &mut SmallRng) -> Vec<GearEffort> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct HaulSample {
    count: u32,
    pinger: bool,
}

/// Haul counts per sampled historical year and effort measurements,
/// resampled uniformly.
#[derive(Debug, Clone)]
pub struct HistoricalEffort {
    sample_years: usize,
    /// (zone, zero-based day, mesh) -> one entry per historical year
    hauls: HashMap<(u32, u16, MeshType), Vec<HaulSample>>,
    /// (zone, season, mesh) -> (soak days, length)
    effort: HashMap<(u32, Season, MeshType), Vec<(f32, f32)>>,
}

impl HistoricalEffort {
    pub fn new(sample_years: usize) -> Self {
        Self {
            sample_years: sample_years.max(1),
            hauls: HashMap::new(),
            effort: HashMap::new(),
        }
    }

    /// Records `count` hauls for a zero-based `day` in historical `year`.
    /// Returns false when the day or year is out of range.
    pub fn add_hauls(
        &mut self,
        zone: u32,
        year: usize,
        day: u16,
        mesh: MeshType,
        count: u32,
        pinger: bool,
    ) -> bool {
        if year >= self.sample_years || day >= DAYS_PER_YEAR {
            return false;
        }
        let years = self
            .hauls
            .entry((zone, day, mesh))
            .or_insert_with(|| vec![HaulSample::default(); self.sample_years]);
        years[year] = HaulSample { count, pinger };
        true
    }

    pub fn add_effort(&mut self, zone: u32, season: Season, mesh: MeshType, soak_days: f32, length: f32) {
        self.effort
            .entry((zone, season, mesh))
            .or_default()
            .push((soak_days, length));
    }

    pub fn is_empty(&self) -> bool {
        self.hauls.is_empty() || self.effort.is_empty()
    }
}

impl EffortSampler for HistoricalEffort {
    fn sample_sets(
        &self,
        zone: u32,
        day_of_year: u16,
        season: Season,
        mesh: MeshType,
        rng: &mut SmallRng,
    ) -> Vec<GearEffort> {
        let day = day_of_year.saturating_sub(1);
        let (Some(years), Some(effort)) = (
            self.hauls.get(&(zone, day, mesh)),
            self.effort.get(&(zone, season, mesh)),
        ) else {
            return Vec::new();
        };
        if years.is_empty() || effort.is_empty() {
            return Vec::new();
        }
        let sample = years[rng.gen_range(0..years.len())];
        (0..sample.count)
            .map(|_| {
                let (soak_days, length) = effort[rng.gen_range(0..effort.len())];
                GearEffort {
                    soak_days,
                    length,
                    pinger: sample.pinger,
                }
            })
            .collect()
    }
}

/// The active effort sampler.
#[derive(Resource)]
pub struct EffortSource(pub Box<dyn EffortSampler>);

impl Default for EffortSource {
    fn default() -> Self {
        Self(Box::new(NoEffort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_no_effort_is_empty() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(NoEffort
            .sample_sets(0, 100, Season::Spring, MeshType::Small, &mut rng)
            .is_empty());
    }

    #[test]
    fn test_counts_come_from_sampled_years() {
        let mut effort = HistoricalEffort::new(2);
        assert!(effort.add_hauls(3, 0, 9, MeshType::Medium, 4, true));
        effort.add_effort(3, Season::Winter, MeshType::Medium, 0.5, 2.0);
        let mut rng = SmallRng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let sets = effort.sample_sets(3, 10, Season::Winter, MeshType::Medium, &mut rng);
            seen.insert(sets.len());
            for set in sets {
                assert_eq!(set, GearEffort { soak_days: 0.5, length: 2.0, pinger: true });
            }
        }
        // year 1 recorded nothing
        assert_eq!(seen, [0, 4].into_iter().collect());
    }

    #[test]
    fn test_missing_effort_yields_nothing() {
        let mut effort = HistoricalEffort::new(1);
        effort.add_hauls(0, 0, 0, MeshType::Small, 5, false);
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(effort
            .sample_sets(0, 1, Season::Winter, MeshType::Small, &mut rng)
            .is_empty());
        assert!(effort.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_hauls() {
        let mut effort = HistoricalEffort::new(3);
        assert!(!effort.add_hauls(0, 3, 0, MeshType::Small, 1, false));
        assert!(!effort.add_hauls(0, 0, 365, MeshType::Small, 1, false));
    }
}
