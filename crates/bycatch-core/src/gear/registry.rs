//! Arena of deployed gear with a per-cell index.
//!
//! Every gear id listed under a cell refers to a live entry in the arena.
//! Insertion and removal update both sides together.

use bevy_ecs::prelude::*;
use slotmap::{new_key_type, Key, SlotMap};

use super::net::Gear;

new_key_type! {
    /// Stable handle of a deployed net.
    pub struct GearId;
}

/// Stable numeric form of a gear id for output records.
pub fn gear_id_to_u64(id: GearId) -> u64 {
    id.data().as_ffi()
}

#[derive(Resource, Debug, Default)]
pub struct GearRegistry {
    gear: SlotMap<GearId, Gear>,
    by_cell: Vec<Vec<GearId>>,
}

impl GearRegistry {
    pub fn new(cell_count: usize) -> Self {
        Self {
            gear: SlotMap::with_key(),
            by_cell: vec![Vec::new(); cell_count],
        }
    }

    pub fn insert(&mut self, gear: Gear) -> GearId {
        let cells = gear.cells.clone();
        let id = self.gear.insert(gear);
        for cell in cells {
            if let Some(list) = self.by_cell.get_mut(cell) {
                list.push(id);
            }
        }
        id
    }

    pub fn remove(&mut self, id: GearId) -> Option<Gear> {
        let gear = self.gear.remove(id)?;
        for &cell in &gear.cells {
            if let Some(list) = self.by_cell.get_mut(cell) {
                list.retain(|&g| g != id);
            }
        }
        Some(gear)
    }

    pub fn get(&self, id: GearId) -> Option<&Gear> {
        self.gear.get(id)
    }

    /// Gear crossing a cell.
    pub fn in_cell(&self, cell: usize) -> &[GearId] {
        self.by_cell.get(cell).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.gear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gear.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GearId, &Gear)> {
        self.gear.iter()
    }

    /// Soaks every net one step and removes those due for hauling.
    pub fn soak_and_retire(&mut self) -> Vec<(GearId, Gear)> {
        let mut due = Vec::new();
        for (id, gear) in self.gear.iter_mut() {
            gear.soak();
            if gear.is_haulable() {
                due.push(id);
            }
        }
        due.into_iter()
            .filter_map(|id| self.remove(id).map(|gear| (id, gear)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::gear::{GearEffort, MeshType};
    use crate::grid::landscape::tests::open_water;
    use crate::grid::Landscape;
    use bycatch_events::Season;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn setup() -> (Landscape, SimConfig) {
        let config = SimConfig::default();
        let land = Landscape::build(open_water(8, 8), &config, Season::Winter).unwrap();
        (land, config)
    }

    fn place(land: &Landscape, config: &SimConfig, soak_days: f32, rng: &mut SmallRng) -> Gear {
        let effort = GearEffort {
            soak_days,
            length: 1.5,
            pinger: false,
        };
        Gear::place(land, &land.fishery_zones[0], MeshType::Small, &effort, &config.gear, rng)
            .unwrap()
    }

    #[test]
    fn test_index_tracks_insert_and_remove() {
        let (land, config) = setup();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut registry = GearRegistry::new(land.cell_count());

        let gear = place(&land, &config, 1.0, &mut rng);
        let cells = gear.cells.clone();
        let id = registry.insert(gear);
        for &cell in &cells {
            assert_eq!(registry.in_cell(cell), &[id]);
        }

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        for cell in 0..land.cell_count() {
            assert!(registry.in_cell(cell).is_empty());
        }
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_retire_after_soak() {
        let (land, config) = setup();
        let mut rng = SmallRng::seed_from_u64(10);
        let mut registry = GearRegistry::new(land.cell_count());
        let short = registry.insert(place(&land, &config, 0.5, &mut rng));
        let long = registry.insert(place(&land, &config, 2.0, &mut rng));

        let mut retired = Vec::new();
        for _ in 0..30 {
            retired.extend(registry.soak_and_retire());
        }
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].0, short);
        assert!(registry.get(long).is_some());
        assert!(registry.in_cell(land.cell_count()).is_empty());
    }

    #[test]
    fn test_ids_are_unique_numbers() {
        let (land, config) = setup();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut registry = GearRegistry::new(land.cell_count());
        let a = registry.insert(place(&land, &config, 1.0, &mut rng));
        let b = registry.insert(place(&land, &config, 1.0, &mut rng));
        assert_ne!(gear_id_to_u64(a), gear_id_to_u64(b));
    }
}
