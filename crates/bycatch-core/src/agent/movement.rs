//! Foraging movement: correlated random walk plus memory attraction.

use glam::Vec2;
use rand::Rng;

use crate::config::{MovementConfig, SimParams};
use crate::geometry::{heading_to_vector, vector_to_heading, wrap_heading, wrap_turn};
use crate::grid::{Landscape, MoveProposal};

use super::{sample_normal, Agent, MemorySlot};

/// Map units per 100 m move unit (400 m cells).
pub const MOVE_TO_MAP: f32 = 0.25;

/// Redraw cap for the rejection loops of the random walk.
const MAX_REDRAWS: usize = 200;

/// Attraction weight used for remembered positions closer than this.
const MIN_ATTRACTION_DISTANCE: f32 = 0.001;
const CLOSE_ATTRACTION: f32 = 9999.0;

/// One draw of the correlated random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkStep {
    /// Unit vector along the new heading
    pub direction: Vec2,
    /// Turning angle in degrees
    pub turn: f32,
    /// Move length in 100 m units
    pub length: f32,
    pub log_length: f32,
}

impl Agent {
    /// Draws the next turning angle and move length.
    ///
    /// Turns are negatively correlated with the previous turn and, for
    /// short previous moves, shrink with the distance moved. Log move length
    /// is autoregressive and capped at `max_logmove`.
    pub fn correlated_random_walk(&mut self, cfg: &MovementConfig) -> WalkStep {
        let rng = &mut self.rng;
        let bias = if self.prev_angle < 0.0 { 24.0 } else { -24.0 };

        let mut angle = 0.0f32;
        for attempt in 1..=MAX_REDRAWS {
            angle = -bias * cfg.corr_angle + sample_normal(rng, 0.0, 38.0);
            if angle.abs() <= 180.0 {
                break;
            }
            if attempt == MAX_REDRAWS {
                angle = 90.0f32.copysign(angle);
            }
        }

        let sign = if angle < 0.0 { -1.0 } else { 1.0 };
        let mut magnitude = angle.abs();
        let m = cfg.turn_move_threshold;
        for attempt in 1..=MAX_REDRAWS {
            let rnd = sample_normal(rng, 96.0, 28.0);
            if self.prev_move <= m {
                magnitude += rnd - rnd * self.prev_move / m;
            }
            if magnitude < 180.0 {
                break;
            }
            if attempt == MAX_REDRAWS {
                magnitude = 90.0 + rng.gen_range(0..=20) as f32;
            }
        }
        let turn = magnitude * sign;

        let mut log_length = cfg.max_logmove;
        for _ in 0..MAX_REDRAWS {
            let candidate = cfg.corr_logmove * self.prev_logmove + sample_normal(rng, 0.42, 0.48);
            if candidate <= cfg.max_logmove {
                log_length = candidate;
                break;
            }
        }
        let mut length = 10f32.powf(log_length);

        if length > 10.0 && turn.abs() > 90.0 {
            length /= 5.0;
        } else if length > 7.0 && turn.abs() > 50.0 {
            length /= 2.0;
        }

        WalkStep {
            direction: heading_to_vector(self.heading + turn),
            turn,
            length,
            log_length,
        }
    }

    /// Food expected from recent memory, weighted by working-memory decay.
    pub fn expected_energy(&self, working_memory: &[f32]) -> f32 {
        self.memory
            .iter()
            .zip(working_memory)
            .map(|(slot, w)| w * slot.food)
            .sum()
    }

    /// Sum over remembered food locations (excluding the current one) of a
    /// unit vector towards each, weighted by food, reference-memory decay
    /// and inverse distance.
    pub fn food_attraction(&self, reference_memory: &[f32]) -> Vec2 {
        self.memory
            .iter()
            .zip(reference_memory)
            .skip(1)
            .filter(|(slot, _)| slot.food != 0.0)
            .map(|(slot, w)| {
                let towards = slot.pos - self.pos;
                let len = towards.length();
                if len < MIN_ATTRACTION_DISTANCE {
                    towards / MIN_ATTRACTION_DISTANCE * CLOSE_ATTRACTION
                } else {
                    towards / len * (slot.food * w / len)
                }
            })
            .sum()
    }

    /// One foraging step: random walk blended with memory attraction,
    /// bent around shallow water, then executed.
    pub fn intrinsic_move(&mut self, landscape: &Landscape, params: &SimParams) {
        let cfg = &params.config.movement;
        let expected = self.expected_energy(&params.working_memory);
        let walk_weight = cfg.inertia_const + self.prev_move * expected;
        let attraction = self.food_attraction(&params.reference_memory);
        let walk = self.correlated_random_walk(cfg);

        let distance = MOVE_TO_MAP * walk.length;
        let mov = (walk.direction * walk_weight + attraction)
            .try_normalize()
            .unwrap_or(walk.direction)
            * distance;
        let turn = wrap_turn(vector_to_heading(mov) - self.heading);

        let mut proposal = MoveProposal {
            target: self.pos + mov,
            turn,
            distance,
        };
        let fallback = (self.memory.len() > 1).then_some(self.last_pos);
        let (pos, heading) = (self.pos, self.heading);
        landscape.avoid_shallow_water(pos, heading, fallback, &mut proposal, &mut self.rng);

        self.prev_move = proposal.distance / MOVE_TO_MAP;
        self.prev_logmove = self.prev_move.max(0.001).log10();
        self.prev_angle = proposal.turn;
        self.execute_move(landscape, params, proposal.target, heading + proposal.turn, true);
    }

    /// Commits a move. Targets outside the map or in shallow water are
    /// dropped and the agent stays put. Returns whether the move happened.
    pub fn execute_move(
        &mut self,
        landscape: &Landscape,
        params: &SimParams,
        target: Vec2,
        heading: f32,
        remember: bool,
    ) -> bool {
        let Some(cell) = landscape
            .cell_index(target)
            .filter(|&c| landscape.is_traversable_cell(c))
        else {
            tracing::debug!(agent = self.id, ?target, "move target not traversable, move dropped");
            return false;
        };
        self.cell = Some(cell);
        self.last_pos = self.pos;
        self.pos = target;
        if remember {
            self.memory.push_front(MemorySlot {
                pos: target,
                food: 0.0,
            });
            self.memory.truncate(params.config.movement.memory_max);
        }
        self.heading = wrap_heading(heading);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{agent_at, landscape, params};
    use crate::config::SimConfig;
    use crate::grid::landscape::tests::open_water;
    use bycatch_events::Season;

    #[test]
    fn test_walk_respects_bounds() {
        let params = params();
        let land = landscape(10, 10);
        let mut agent = agent_at(&land, &params, Vec2::new(5.0, 5.0), 3);
        let cfg = &params.config.movement;
        for _ in 0..1000 {
            let step = agent.correlated_random_walk(cfg);
            assert!(step.turn.abs() < 180.0);
            assert!(step.log_length <= cfg.max_logmove);
            assert!(step.length <= 10f32.powf(cfg.max_logmove));
            assert!((step.direction.length() - 1.0).abs() < 1e-4);
            agent.prev_angle = step.turn;
            agent.prev_move = step.length;
            agent.prev_logmove = step.log_length;
        }
    }

    #[test]
    fn test_sharp_turns_slow_down() {
        let params = params();
        let land = landscape(10, 10);
        let mut agent = agent_at(&land, &params, Vec2::new(5.0, 5.0), 8);
        for _ in 0..2000 {
            let step = agent.correlated_random_walk(&params.config.movement);
            if step.turn.abs() > 90.0 {
                assert!(step.length <= 10.0);
            }
        }
    }

    #[test]
    fn test_attraction_points_to_each_remembered_location() {
        let params = params();
        let land = landscape(10, 10);
        let mut agent = agent_at(&land, &params, Vec2::new(5.0, 5.0), 1);
        agent.memory.clear();
        agent.memory.push_back(MemorySlot { pos: agent.pos, food: 1.0 });
        agent.memory.push_back(MemorySlot { pos: Vec2::new(5.0, 7.0), food: 0.0 });
        agent.memory.push_back(MemorySlot { pos: Vec2::new(7.0, 5.0), food: 0.5 });
        let v = agent.food_attraction(&params.reference_memory);
        // only the third slot contributes: east, 0.5 * 0.81 / 2
        assert!(v.y.abs() < 1e-6);
        assert!((v.x - 0.5 * 0.81 / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_expected_energy_weights() {
        let params = params();
        let land = landscape(10, 10);
        let mut agent = agent_at(&land, &params, Vec2::new(5.0, 5.0), 1);
        agent.memory.clear();
        agent.memory.push_back(MemorySlot { pos: agent.pos, food: 1.0 });
        agent.memory.push_back(MemorySlot { pos: agent.pos, food: 1.0 });
        assert!((agent.expected_energy(&params.working_memory) - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_moves_stay_in_water() {
        let params = params();
        let mut desc = open_water(12, 12);
        // island in the middle and a shallow border column
        for row in 4..8 {
            for col in 4..8 {
                desc.cells[row * 12 + col].bathymetry = 2.0;
            }
        }
        for row in 0..12 {
            desc.cells[row * 12].bathymetry = 0.0;
        }
        let land = Landscape::build(desc, &SimConfig::default(), Season::Winter).unwrap();
        let mut agent = agent_at(&land, &params, Vec2::new(2.5, 2.5), 17);
        for _ in 0..2000 {
            agent.intrinsic_move(&land, &params);
            assert!(land.contains(agent.pos));
            let cell = land.cell_index(agent.pos).unwrap();
            assert!(land.is_traversable_cell(cell));
            assert_eq!(agent.cell, Some(cell));
            assert!(agent.memory.len() <= params.config.movement.memory_max);
        }
    }

    #[test]
    fn test_execute_move_rejects_shallow_target() {
        let params = params();
        let mut desc = open_water(3, 1);
        desc.cells[2].bathymetry = 3.0;
        let land = Landscape::build(desc, &SimConfig::default(), Season::Winter).unwrap();
        let mut agent = agent_at(&land, &params, Vec2::new(0.5, 0.5), 2);
        assert!(!agent.execute_move(&land, &params, Vec2::new(2.5, 0.5), 90.0, true));
        assert_eq!(agent.pos, Vec2::new(0.5, 0.5));
        assert!(agent.execute_move(&land, &params, Vec2::new(1.5, 0.5), 450.0, false));
        assert_eq!(agent.cell, Some(1));
        assert_eq!(agent.last_pos, Vec2::new(0.5, 0.5));
        assert!((agent.heading - 90.0).abs() < 1e-4);
        assert_eq!(agent.memory.len(), 1);
    }
}
