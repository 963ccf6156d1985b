//! The per-tick agent pipeline.

use crate::config::SimParams;
use crate::gear::{GearId, GearRegistry};
use crate::grid::Landscape;

use super::Agent;

/// Outcome of one agent step, applied after the parallel pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFate {
    Alive,
    DiedOfAge,
    Entangled { gear: GearId },
    Starved,
    /// The agent has no valid cell and was left untouched this tick.
    Skipped,
}

impl AgentFate {
    pub fn is_dead(self) -> bool {
        matches!(
            self,
            AgentFate::DiedOfAge | AgentFate::Entangled { .. } | AgentFate::Starved
        )
    }
}

/// Read-only world state shared by all agents during a step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub params: &'a SimParams,
    pub landscape: &'a Landscape,
    pub gear: &'a GearRegistry,
    pub month: u8,
}

impl Agent {
    /// Runs one half-hour step: move, gear check, feeding, dispersal,
    /// energy use and survival.
    pub fn step(&mut self, ctx: &StepContext<'_>) -> AgentFate {
        let StepContext {
            params,
            landscape,
            gear,
            month,
        } = *ctx;
        if self.cell.is_none() {
            tracing::warn!(agent = self.id, pos = ?self.pos, "agent has no cell, skipping");
            return AgentFate::Skipped;
        }

        self.dispersed = false;
        if self.age >= params.config.population.max_age {
            return AgentFate::DiedOfAge;
        }

        self.intrinsic_move(landscape, params);

        if let Some(id) = self.check_gear(gear, params) {
            return AgentFate::Entangled { gear: id };
        }

        self.consume_food(landscape);
        if self.mode.is_dispersing() {
            self.disperse(landscape, params);
        }
        self.dispersal_steps = if self.dispersed {
            self.dispersal_steps + 1
        } else {
            0
        };

        let energy = &params.config.energy;
        self.use_energy(energy, params.config.dispersal.mean_distance);
        if self.survives(energy, month) {
            AgentFate::Alive
        } else {
            AgentFate::Starved
        }
    }

    /// First gear set in the current cell that entangles the agent.
    fn check_gear(&mut self, registry: &GearRegistry, params: &SimParams) -> Option<GearId> {
        let cell = self.cell?;
        let cfg = &params.config.gear;
        registry.in_cell(cell).iter().copied().find(|&id| {
            registry.get(id).is_some_and(|gear| {
                gear.check_entanglement(
                    self.pos,
                    &cfg.interaction_probability,
                    cfg.interaction_cutoff_sq,
                    &mut self.rng,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{agent_at, landscape, params};
    use crate::gear::{Gear, GearEffort, MeshType};
    use glam::Vec2;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_old_agent_dies() {
        let params = params();
        let land = landscape(6, 6);
        let gear = GearRegistry::new(land.cell_count());
        let mut agent = agent_at(&land, &params, Vec2::new(3.0, 3.0), 1);
        agent.age = 30.5;
        let ctx = StepContext { params: &params, landscape: &land, gear: &gear, month: 1 };
        assert_eq!(agent.step(&ctx), AgentFate::DiedOfAge);
    }

    #[test]
    fn test_agent_without_cell_is_skipped() {
        let params = params();
        let land = landscape(6, 6);
        let gear = GearRegistry::new(land.cell_count());
        let mut agent = agent_at(&land, &params, Vec2::new(3.0, 3.0), 1);
        agent.cell = None;
        let ctx = StepContext { params: &params, landscape: &land, gear: &gear, month: 1 };
        assert_eq!(agent.step(&ctx), AgentFate::Skipped);
        assert_eq!(agent.pos, Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_starving_agent_dies() {
        let params = params();
        let land = landscape(6, 6);
        for cell in &land.cells {
            *cell.food.lock() = 0.0;
        }
        let gear = GearRegistry::new(land.cell_count());
        let mut agent = agent_at(&land, &params, Vec2::new(3.0, 3.0), 1);
        agent.age = 5.0;
        agent.nursing = false;
        agent.energy = 0.001;
        let ctx = StepContext { params: &params, landscape: &land, gear: &gear, month: 1 };
        assert_eq!(agent.step(&ctx), AgentFate::Starved);
    }

    #[test]
    fn test_healthy_agent_survives_and_moves() {
        let params = params();
        let land = landscape(20, 20);
        let gear = GearRegistry::new(land.cell_count());
        let mut agent = agent_at(&land, &params, Vec2::new(10.0, 10.0), 1);
        agent.age = 5.0;
        agent.energy = 15.0;
        let ctx = StepContext { params: &params, landscape: &land, gear: &gear, month: 1 };
        let start = agent.pos;
        let mut moved = false;
        for _ in 0..20 {
            assert!(!agent.step(&ctx).is_dead());
            moved |= agent.pos != start;
        }
        assert!(moved);
        assert_eq!(agent.dispersal_steps, 0);
    }

    #[test]
    fn test_certain_gear_entangles() {
        let mut params = params();
        params.config.gear.interaction_probability = vec![1.0; 100];
        params.config.gear.interaction_cutoff_sq = 100.0;
        params.config.gear.placement_attempts = 1000;
        // a single cell, so the net shares the agent's cell wherever it moves
        let land = landscape(1, 1);
        let mut registry = GearRegistry::new(land.cell_count());

        let effort = GearEffort { soak_days: 1.0, length: 0.2, pinger: false };
        let mut rng = SmallRng::seed_from_u64(5);
        let zone = &land.fishery_zones[0];
        let gear = Gear::place(&land, zone, MeshType::Small, &effort, &params.config.gear, &mut rng)
            .expect("open water accepts gear");
        let id = registry.insert(gear);

        let mut agent = agent_at(&land, &params, Vec2::new(0.5, 0.5), 1);
        agent.age = 5.0;
        let ctx = StepContext { params: &params, landscape: &land, gear: &registry, month: 1 };
        assert_eq!(agent.step(&ctx), AgentFate::Entangled { gear: id });
        assert_eq!(registry.get(id).unwrap().catch(), 1);
    }
}
