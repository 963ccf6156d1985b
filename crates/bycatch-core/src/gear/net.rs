//! Gillnet instances and the entanglement model.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use bycatch_events::TICKS_PER_DAY;

use crate::config::GearConfig;
use crate::geometry::Segment;
use crate::grid::{FisheryZone, Landscape};

use super::effort::GearEffort;

/// Soak time added per half-hour step, in days.
pub const SOAK_PER_TICK: f32 = 1.0 / TICKS_PER_DAY as f32;

/// Map distance to table index: 800 half-meter slots per 400 m cell.
const TABLE_SLOTS_PER_UNIT: f32 = 800.0;

/// Exponential decay rate of the distance-decay model, per map unit.
const DECAY_PER_UNIT: f32 = 30.0;

/// Mesh size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshType {
    Small,
    Medium,
    Large,
}

impl MeshType {
    pub const ALL: [MeshType; 3] = [MeshType::Small, MeshType::Medium, MeshType::Large];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One deployed net.
#[derive(Debug)]
pub struct Gear {
    pub zone: u32,
    pub mesh: MeshType,
    pub segment: Segment,
    /// Cells the segment crosses, sorted and unique
    pub cells: Vec<usize>,
    pub catchability: f32,
    pub pinger: bool,
    /// Elapsed soak time in days
    pub soak_days: f32,
    pub max_soak_days: f32,
    catch: AtomicU32,
}

impl Gear {
    /// Samples a placement inside `zone`, giving up after the configured
    /// number of attempts.
    ///
    /// A placement is valid when its anchor lies on the map and the whole
    /// segment runs through traversable water.
    pub fn place<R: Rng + ?Sized>(
        landscape: &Landscape,
        zone: &FisheryZone,
        mesh: MeshType,
        effort: &GearEffort,
        config: &GearConfig,
        rng: &mut R,
    ) -> Option<Gear> {
        if zone.cells.is_empty() {
            return None;
        }
        for _ in 0..config.placement_attempts {
            let cell = zone.cells[rng.gen_range(0..zone.cells.len())];
            let start = landscape.random_point_in_cell(cell, rng);
            let theta = rng.gen::<f32>() * std::f32::consts::TAU;
            let end = start + effort.length * Vec2::new(theta.cos(), theta.sin());

            if !landscape.contains(start) || !landscape.is_path_traversable(start, end) {
                continue;
            }
            let mut cells: Vec<usize> = landscape
                .cells_crossed(start, end)
                .into_iter()
                .flatten()
                .collect();
            cells.sort_unstable();
            cells.dedup();

            let mut catchability = config.catchability[mesh.index()];
            if effort.pinger {
                catchability *= config.pinger_effect;
            }
            return Some(Gear {
                zone: zone.id,
                mesh,
                segment: Segment::new(start, end),
                cells,
                catchability,
                pinger: effort.pinger,
                soak_days: 0.0,
                max_soak_days: effort.soak_days,
                catch: AtomicU32::new(0),
            });
        }
        None
    }

    pub fn catch(&self) -> u32 {
        self.catch.load(Ordering::Relaxed)
    }

    fn record_catch(&self) {
        self.catch.fetch_add(1, Ordering::Relaxed);
    }

    /// Nearest-point interaction check for an agent at `pos`. Counts the
    /// catch on entanglement.
    pub fn check_entanglement<R: Rng + ?Sized>(
        &self,
        pos: Vec2,
        table: &[f32],
        cutoff_sq: f32,
        rng: &mut R,
    ) -> bool {
        let dist_sq = self.segment.distance_squared_to_point(pos);
        let p = entanglement_probability(dist_sq, table, self.catchability, cutoff_sq);
        if p > 0.0 && rng.gen::<f32>() < p {
            self.record_catch();
            return true;
        }
        false
    }

    /// Entanglement when the agent's last travel vector crosses the net.
    pub fn check_path_crossing<R: Rng + ?Sized>(&self, path: &Segment, rng: &mut R) -> bool {
        if self.segment.intersects(path) && rng.gen::<f32>() < self.catchability {
            self.record_catch();
            return true;
        }
        false
    }

    /// Entanglement with probability decaying in the distance between the
    /// travel vector and the net.
    pub fn check_distance_decay<R: Rng + ?Sized>(&self, path: &Segment, rng: &mut R) -> bool {
        let p = decay_probability(self.segment.distance_to_segment(path), self.catchability);
        if rng.gen::<f32>() < p {
            self.record_catch();
            return true;
        }
        false
    }

    /// Advances soak time by one step.
    pub fn soak(&mut self) {
        self.soak_days += SOAK_PER_TICK;
    }

    pub fn is_haulable(&self) -> bool {
        self.soak_days >= self.max_soak_days
    }
}

/// Entanglement probability at squared map distance `dist_sq` from a net.
/// Zero beyond the cutoff.
pub fn entanglement_probability(
    dist_sq: f32,
    table: &[f32],
    catchability: f32,
    cutoff_sq: f32,
) -> f32 {
    if dist_sq > cutoff_sq || table.is_empty() {
        return 0.0;
    }
    let slot = (dist_sq.sqrt() * TABLE_SLOTS_PER_UNIT).round() as usize / 2;
    table[slot.min(table.len() - 1)] * catchability
}

/// Catchability decaying exponentially with map distance.
pub fn decay_probability(distance: f32, catchability: f32) -> f32 {
    if distance > 0.0 {
        catchability * (-DECAY_PER_UNIT * distance).exp()
    } else {
        catchability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_interaction_table, SimConfig};
    use crate::grid::landscape::tests::open_water;
    use bycatch_events::Season;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn effort(length: f32) -> GearEffort {
        GearEffort {
            soak_days: 1.0,
            length,
            pinger: false,
        }
    }

    #[test]
    fn test_probability_monotone_and_cut_off() {
        let table = default_interaction_table();
        let cutoff = 0.015_625;
        let mut last = f32::INFINITY;
        for i in 0..200 {
            let d = i as f32 * 0.001;
            let p = entanglement_probability(d * d, &table, 1.0, cutoff);
            assert!(p <= last);
            last = p;
            if d * d > cutoff {
                assert_eq!(p, 0.0);
            }
        }
        assert_eq!(entanglement_probability(0.0, &table, 0.5, cutoff), 0.5);
    }

    #[test]
    fn test_decay_probability() {
        assert_eq!(decay_probability(0.0, 0.8), 0.8);
        assert!(decay_probability(0.1, 0.8) < 0.8 * 0.06);
    }

    #[test]
    fn test_place_in_open_water() {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(10, 10), &config, Season::Winter).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let gear = Gear::place(
            &land,
            &land.fishery_zones[0],
            MeshType::Medium,
            &effort(2.0),
            &config.gear,
            &mut rng,
        )
        .unwrap();
        assert!((gear.segment.length() - 2.0).abs() < 1e-4);
        assert!(!gear.cells.is_empty());
        assert!(gear.cells.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(gear.catch(), 0);
    }

    #[test]
    fn test_pinger_scales_catchability() {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(10, 10), &config, Season::Winter).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);
        let pingered = GearEffort {
            pinger: true,
            ..effort(1.0)
        };
        let gear = Gear::place(
            &land,
            &land.fishery_zones[0],
            MeshType::Small,
            &pingered,
            &config.gear,
            &mut rng,
        )
        .unwrap();
        assert!((gear.catchability - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_entanglement_counts_catch() {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(10, 10), &config, Season::Winter).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let gear = Gear::place(
            &land,
            &land.fishery_zones[0],
            MeshType::Large,
            &effort(1.0),
            &config.gear,
            &mut rng,
        )
        .unwrap();
        // on the net with catchability 1 and table[0] == 1
        let on_net = gear.segment.start;
        let table = &config.gear.interaction_probability;
        assert!(gear.check_entanglement(on_net, table, 0.015_625, &mut rng));
        assert_eq!(gear.catch(), 1);
        let dir = (gear.segment.end - gear.segment.start).normalize();
        let far = on_net + dir.perp() * 0.2;
        assert!(!gear.check_entanglement(far, table, 0.015_625, &mut rng));
        assert_eq!(gear.catch(), 1);
    }

    fn large_mesh_net(seed: u64) -> (Gear, SmallRng) {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(10, 10), &config, Season::Winter).unwrap();
        let mut rng = SmallRng::seed_from_u64(seed);
        let gear = Gear::place(
            &land,
            &land.fishery_zones[0],
            MeshType::Large,
            &effort(1.0),
            &config.gear,
            &mut rng,
        )
        .unwrap();
        assert_eq!(gear.catchability, 1.0);
        (gear, rng)
    }

    #[test]
    fn test_path_crossing_counts_catch() {
        let (gear, mut rng) = large_mesh_net(5);
        let mid = (gear.segment.start + gear.segment.end) * 0.5;
        let across = (gear.segment.end - gear.segment.start).normalize().perp() * 0.3;

        assert!(gear.check_path_crossing(&Segment::new(mid - across, mid + across), &mut rng));
        assert_eq!(gear.catch(), 1);

        // a parallel track beside the net never crosses it
        let beside = Segment::new(gear.segment.start + across, gear.segment.end + across);
        for _ in 0..100 {
            assert!(!gear.check_path_crossing(&beside, &mut rng));
        }
        assert_eq!(gear.catch(), 1);
    }

    #[test]
    fn test_distance_decay_near_and_far() {
        let (gear, mut rng) = large_mesh_net(6);
        let along = Segment::new(gear.segment.start, gear.segment.end);
        for _ in 0..20 {
            assert!(gear.check_distance_decay(&along, &mut rng));
        }
        assert_eq!(gear.catch(), 20);

        let far = Segment::new(
            gear.segment.start + Vec2::new(50.0, 50.0),
            gear.segment.end + Vec2::new(50.0, 50.0),
        );
        for _ in 0..100 {
            assert!(!gear.check_distance_decay(&far, &mut rng));
        }
        assert_eq!(gear.catch(), 20);
    }

    #[test]
    fn test_soak_until_haulable() {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(10, 10), &config, Season::Winter).unwrap();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut gear = Gear::place(
            &land,
            &land.fishery_zones[0],
            MeshType::Small,
            &effort(1.0),
            &config.gear,
            &mut rng,
        )
        .unwrap();
        for _ in 0..47 {
            gear.soak();
            assert!(!gear.is_haulable());
        }
        gear.soak();
        gear.soak();
        assert!(gear.is_haulable());
    }
}
