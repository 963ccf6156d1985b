//! Path shaping and shallow-water avoidance.
//!
//! The directional searches sweep outward from the proposed direction,
//! alternating left and right, so the smallest deviation meeting the
//! objective wins ties.

use glam::Vec2;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::geometry::{heading_to_vector, rotate_clockwise, wrap_turn};

use super::landscape::Landscape;

/// Candidate turns tried, in both directions, when a move hits shallow water.
pub const AVOIDANCE_ANGLES: [f32; 7] = [10.0, 25.0, 50.0, 75.0, 100.0, 125.0, 150.0];

/// Standard deviation of the noise added to avoidance turns.
const AVOIDANCE_NOISE_SD: f32 = 2.5;

/// Sweep order `0, -step, +step, -2*step, +2*step, ...` up to `max_offset`.
pub fn sweep_angles(max_offset: f32, step: f32) -> impl Iterator<Item = f32> {
    let steps = if step > 0.0 {
        (max_offset / step + 1e-4).floor() as i32
    } else {
        0
    };
    std::iter::once(0.0).chain((1..=steps).flat_map(move |k| {
        let a = k as f32 * step;
        [-a, a]
    }))
}

impl Landscape {
    /// Direction within `max_offset` degrees of `mov` whose next cell is the
    /// deepest, considering only directions traversable for `look_ahead`
    /// move lengths.
    pub fn find_path_deepest(
        &self,
        pos: Vec2,
        mov: Vec2,
        max_offset: f32,
        step: f32,
        look_ahead: f32,
    ) -> Vec2 {
        let mut best_depth = 0.0;
        let mut best = mov;
        for angle in sweep_angles(max_offset, step) {
            let candidate = rotate_clockwise(mov, angle);
            if !self.is_path_traversable(pos, pos + candidate * look_ahead) {
                continue;
            }
            if let Some(cell) = self.cell_index(pos + candidate) {
                let depth = self.cells[cell].bathymetry;
                if depth < best_depth {
                    best_depth = depth;
                    best = candidate;
                }
            }
        }
        best
    }

    /// Direction within `max_offset` degrees of `mov` whose next cell lies
    /// farthest from the coast.
    pub fn find_path_farthest_from_shore(
        &self,
        pos: Vec2,
        mov: Vec2,
        max_offset: f32,
        step: f32,
    ) -> Vec2 {
        let mut best_dist = f32::NEG_INFINITY;
        let mut best = mov;
        for angle in sweep_angles(max_offset, step) {
            let candidate = rotate_clockwise(mov, angle);
            if !self.is_path_traversable(pos, pos + candidate) {
                continue;
            }
            if let Some(cell) = self.cell_index(pos + candidate) {
                let dist = self.cells[cell].distance_to_coast;
                if dist > best_dist {
                    best_dist = dist;
                    best = candidate;
                }
            }
        }
        best
    }

    /// Direction within `max_offset` degrees of `mov` that returns towards,
    /// or keeps to, the coast-distance band `[band_min, band_max]`.
    pub fn find_path_parallel_to_coast(
        &self,
        pos: Vec2,
        mov: Vec2,
        max_offset: f32,
        step: f32,
        band_min: f32,
        band_max: f32,
    ) -> Vec2 {
        let Some(current) = self.cell_index(pos) else {
            return mov;
        };
        let current_dist = self.cells[current].distance_to_coast;
        let score = |dist: f32| {
            if current_dist > band_max {
                dist
            } else if current_dist < band_min {
                -dist
            } else {
                (dist - current_dist).abs()
            }
        };

        let mut best: Option<(f32, Vec2)> = None;
        for angle in sweep_angles(max_offset, step) {
            let candidate = rotate_clockwise(mov, angle);
            if !self.is_path_traversable(pos, pos + candidate) {
                continue;
            }
            let Some(cell) = self.cell_index(pos + candidate) else {
                continue;
            };
            let s = score(self.cells[cell].distance_to_coast);
            if best.map_or(true, |(b, _)| s < b) {
                best = Some((s, candidate));
            }
        }
        best.map_or(mov, |(_, candidate)| candidate)
    }

    /// Bends a proposed move away from shallow water.
    ///
    /// Leaves the proposal untouched when it stays in the current cell or
    /// its path is already traversable. Otherwise tries increasingly sharp
    /// turns in random order of side; when none works the move goes back to
    /// `fallback` (the last visited position) or, without one, jitters
    /// inside the current cell.
    pub fn avoid_shallow_water<R: Rng + ?Sized>(
        &self,
        from: Vec2,
        heading: f32,
        fallback: Option<Vec2>,
        proposal: &mut MoveProposal,
        rng: &mut R,
    ) {
        let from_cell = self.cell_index(from);
        if self.cell_index(proposal.target) == from_cell
            || self.is_path_traversable(from, proposal.target)
        {
            return;
        }

        let noise = Normal::new(0.0, AVOIDANCE_NOISE_SD).ok();
        let last = AVOIDANCE_ANGLES.len() - 1;
        for (i, &angle) in AVOIDANCE_ANGLES.iter().enumerate() {
            let first_sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            for sign in [first_sign, -first_sign] {
                let mut turn = sign * angle;
                if i < last {
                    turn += noise.as_ref().map_or(0.0, |n| n.sample(rng));
                }
                let candidate =
                    from + heading_to_vector(heading + proposal.turn + turn) * proposal.distance;
                if self.is_path_traversable(from, candidate) {
                    proposal.target = candidate;
                    proposal.turn = wrap_turn(proposal.turn + turn);
                    return;
                }
            }
        }

        match fallback {
            Some(back) => {
                proposal.target = back;
                proposal.distance = from.distance(back);
                proposal.turn = 180.0;
            }
            None => {
                proposal.target = match from_cell {
                    Some(cell) => self.random_point_in_cell(cell, rng),
                    None => from,
                };
                proposal.distance = from.distance(proposal.target);
            }
        }
        tracing::trace!(?from, target = ?proposal.target, "no traversable turn, falling back");
    }
}

/// A pending move: end point, turn relative to the current heading, and
/// length in map units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveProposal {
    pub target: Vec2,
    pub turn: f32,
    pub distance: f32,
}
