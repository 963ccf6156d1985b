//! Dispersal state machine.
//!
//! `Foraging -> DirectedDispersal -> (ReturningDispersal) -> CoastalDispersal
//! -> Foraging`. Decisions are taken once a day from the daily energy
//! record; movement happens every step while dispersing.

use glam::Vec2;
use rand::Rng;

use bycatch_events::{MovementMode, Season, TICKS_PER_DAY};

use crate::config::{DispersalConfig, SimParams};
use crate::geometry::{heading_to_vector, vector_to_heading};
use crate::grid::Landscape;

use super::{Agent, DispersalTarget, DAILY_HISTORY};

/// Steps of dispersal after which less than [`DAY_STALL_DISTANCE`] covered
/// since yesterday counts as stalled.
const DAY_STALL_STEPS: u32 = TICKS_PER_DAY;
const DAY_STALL_DISTANCE: f32 = 2.0;
const WEEK_STALL_STEPS: u32 = 9 * TICKS_PER_DAY;
const WEEK_STALL_DISTANCE: f32 = 6.0;

/// Angular budget (degrees) and sweep step of the directed heading search.
const DIRECTED_OFFSET: f32 = 30.0;
const DIRECTED_STEP: f32 = 10.0;
/// Move lengths of clear water required ahead of a directed move.
const DIRECTED_LOOK_AHEAD: f32 = 8.0;
const COASTAL_OFFSET: f32 = 80.0;
const COASTAL_STEP: f32 = 10.0;

/// A block considered as a dispersal destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersalCandidate {
    pub block: usize,
    pub distance: f32,
    /// Seasonal block value per unit distance
    pub score: f32,
}

/// Blocks strictly between the minimum and maximum dispersal distance from
/// `pos`, best first, limited to the candidate pool.
pub fn dispersal_candidates(
    landscape: &Landscape,
    pos: Vec2,
    current_block: Option<usize>,
    exclude: Option<usize>,
    season: Season,
    cfg: &DispersalConfig,
) -> Vec<DispersalCandidate> {
    let min_sq = cfg.min_distance * cfg.min_distance;
    let max_sq = cfg.max_distance * cfg.max_distance;
    let s = season.index();

    let mut candidates: Vec<DispersalCandidate> = landscape
        .blocks
        .iter()
        .filter(|b| Some(b.id) != current_block && Some(b.id) != exclude)
        .filter_map(|b| {
            let dist_sq = pos.distance_squared(b.center);
            (dist_sq > min_sq && dist_sq < max_sq).then(|| {
                let distance = dist_sq.sqrt();
                DispersalCandidate {
                    block: b.id,
                    distance,
                    score: b.value[s] / distance,
                }
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(cfg.candidate_pool);
    candidates
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

impl Agent {
    /// Daily dispersal decision.
    pub fn consider_dispersing(&mut self, landscape: &Landscape, params: &SimParams, season: Season) {
        self.record_daily_energy();
        self.daily_positions.copy_within(0..DAILY_HISTORY - 1, 1);
        self.daily_positions[0] = self.pos;

        let cfg = &params.config.dispersal;
        match self.mode {
            MovementMode::Foraging => {
                let inertia = cfg.inertia.min(DAILY_HISTORY - 1);
                let declining = self
                    .daily_energy
                    .windows(2)
                    .take(inertia)
                    .all(|w| w[0] < w[1]);
                if declining && self.pick_dispersal_target(landscape, cfg, season, None) {
                    self.mode = MovementMode::DirectedDispersal;
                    tracing::debug!(agent = self.id, target = ?self.target, "starting dispersal");
                }
            }
            mode => {
                let week_best = self.daily_energy[..7]
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max);
                if self.daily_energy[0] >= week_best {
                    self.target = None;
                    self.mode = MovementMode::Foraging;
                    tracing::debug!(agent = self.id, "energy recovered, foraging");
                    return;
                }
                if mode == MovementMode::DirectedDispersal
                    && mean(&self.daily_energy[6..9]) > mean(&self.daily_energy[0..3])
                {
                    let back = self.daily_positions[7];
                    if let Some(cell) = landscape.cell_index(back) {
                        self.target = Some(DispersalTarget {
                            block: landscape.cells[cell].block,
                            pos: back,
                            distance: self.pos.distance(back),
                        });
                        self.mode = MovementMode::ReturningDispersal;
                        tracing::debug!(agent = self.id, "returning to last week's area");
                    }
                }
            }
        }
    }

    /// Chooses a destination uniformly among the best-ranked blocks.
    /// Returns false when no block is in range.
    pub fn pick_dispersal_target(
        &mut self,
        landscape: &Landscape,
        cfg: &DispersalConfig,
        season: Season,
        exclude: Option<usize>,
    ) -> bool {
        let candidates =
            dispersal_candidates(landscape, self.pos, self.block(landscape), exclude, season, cfg);
        if candidates.is_empty() {
            return false;
        }
        let chosen = candidates[self.rng.gen_range(0..candidates.len())];
        self.target = Some(DispersalTarget {
            block: Some(chosen.block),
            pos: landscape.blocks[chosen.block].center,
            distance: chosen.distance,
        });
        true
    }

    /// Per-step dispersal movement for the current mode.
    pub fn disperse(&mut self, landscape: &Landscape, params: &SimParams) {
        match self.mode {
            MovementMode::DirectedDispersal | MovementMode::ReturningDispersal => {
                self.disperse_towards_target(landscape, params)
            }
            MovementMode::CoastalDispersal => self.disperse_along_coast(landscape, params),
            MovementMode::Foraging => {}
        }
    }

    fn disperse_towards_target(&mut self, landscape: &Landscape, params: &SimParams) {
        let Some(target) = self.target else {
            return;
        };
        let cfg = &params.config.dispersal;

        let stalled_day = self.dispersal_steps > DAY_STALL_STEPS
            && self.pos.distance(self.daily_positions[1]) < DAY_STALL_DISTANCE;
        let stalled_week = self.dispersal_steps > WEEK_STALL_STEPS
            && self.pos.distance(self.daily_positions[8]) < WEEK_STALL_DISTANCE;
        let arrived = self.pos.distance(target.pos) < cfg.arrival_radius;
        if stalled_day || stalled_week || arrived {
            tracing::debug!(agent = self.id, arrived, "switching to coastal dispersal");
            self.target = None;
            self.mode = MovementMode::CoastalDispersal;
            self.disperse_along_coast(landscape, params);
            return;
        }

        let Some(dir) = (target.pos - self.pos).try_normalize() else {
            return;
        };
        let pos = self.pos;
        let mov = landscape.find_path_deepest(
            pos,
            dir * cfg.mean_distance,
            DIRECTED_OFFSET,
            DIRECTED_STEP,
            DIRECTED_LOOK_AHEAD,
        );
        let mov = landscape.find_path_farthest_from_shore(pos, mov, DIRECTED_OFFSET, DIRECTED_STEP);
        let next = pos + mov;
        if !landscape.is_path_traversable(pos, next) {
            // keep the target, follow the coast for now
            self.disperse_along_coast(landscape, params);
            return;
        }
        if self.execute_move(landscape, params, next, vector_to_heading(mov), false) {
            self.dispersed = true;
        }
    }

    fn disperse_along_coast(&mut self, landscape: &Landscape, params: &SimParams) {
        if self.mode == MovementMode::Foraging {
            return;
        }
        let cfg = &params.config.dispersal;
        let pos = self.pos;
        let dir = (pos - self.daily_positions[1])
            .try_normalize()
            .unwrap_or_else(|| heading_to_vector(self.heading));
        let mov = landscape.find_path_parallel_to_coast(
            pos,
            dir * cfg.mean_distance,
            COASTAL_OFFSET,
            COASTAL_STEP,
            cfg.coast_band_min,
            cfg.coast_band_max,
        );
        let next = pos + mov;
        if !landscape.is_path_traversable(pos, next) {
            tracing::debug!(agent = self.id, "no coastal path, foraging");
            self.mode = MovementMode::Foraging;
            self.target = None;
            return;
        }
        if self.execute_move(landscape, params, next, vector_to_heading(mov), false) {
            self.dispersed = true;
        }
    }
}
