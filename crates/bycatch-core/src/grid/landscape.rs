//! Landscape Model
//!
//! Static cell topology, the block/region/fishery-zone aggregates built on
//! top of it, and the coordinate mapping and ray traversal every movement
//! decision is validated against.
//!
//! Map coordinates run from (0, 0) at the bottom-left corner to
//! (width, height) at the top-right; one map unit is one cell. Cell indices
//! are row-major from the top-left cell.

use bevy_ecs::prelude::*;
use glam::Vec2;
use parking_lot::Mutex;
use rand::Rng;

use bycatch_events::Season;

use crate::config::SimConfig;
use crate::error::LandscapeError;

use super::food::{clamp_food, seasonal_capacity};

/// Hard cap on traversal iterations for degenerate segments.
pub const MAX_TRAVERSAL_STEPS: usize = 200;

/// Slack on the segment parameter so an end exactly on a grid line is reached.
const TRAVERSAL_SLACK: f32 = 1e-4;

/// Largest offset from a cell center used when scattering points in a cell.
pub const CELL_JITTER: f32 = 0.49;

/// One input cell, as read from a landscape file.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDescriptor {
    pub bathymetry: f32,
    pub distance_to_coast: f32,
    /// Zero-based indices; `None` when the cell belongs to none
    pub region: Option<u32>,
    pub fishery_zone: Option<u32>,
    pub block: Option<u32>,
    pub food_capacity: f32,
    /// Relative food abundance per season
    pub abundance: [f32; 4],
}

/// Fully-read landscape input.
#[derive(Debug, Clone, PartialEq)]
pub struct LandscapeDescriptor {
    pub width: u32,
    pub height: u32,
    pub regions: u32,
    pub fishery_zones: u32,
    pub blocks: u32,
    /// Landscape-wide mean abundance per season
    pub mean_abundance: [f32; 4],
    /// Row-major from the top-left cell
    pub cells: Vec<CellDescriptor>,
}

/// A grid cell. Everything except the food level is fixed after setup.
#[derive(Debug)]
pub struct Cell {
    pub bathymetry: f32,
    pub distance_to_coast: f32,
    pub distance_to_edge: f32,
    pub block: Option<usize>,
    pub region: Option<usize>,
    pub fishery_zone: Option<u32>,
    /// Food capacity before the seasonal adjustment
    pub food_capacity: f32,
    pub abundance: [f32; 4],
    /// Food capacity in the current season
    pub seasonal_capacity: f32,
    pub food: Mutex<f32>,
}

impl Cell {
    pub fn food_level(&self) -> f32 {
        *self.food.lock()
    }
}

/// Aggregate of traversable cells used for dispersal targeting.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: usize,
    pub cells: Vec<usize>,
    pub center: Vec2,
    /// Mean seasonal abundance over member cells
    pub density: [f32; 4],
    /// Density relative to the landscape mean, per season
    pub value: [f32; 4],
}

/// Demographic accounting area; counters cover the current report period.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: usize,
    /// Index in the landscape input
    pub source_id: u32,
    pub cells: Vec<usize>,
    pub births: u32,
    pub deaths: u32,
    pub bycatch: u32,
}

impl Region {
    pub fn reset_counters(&mut self) {
        self.births = 0;
        self.deaths = 0;
        self.bycatch = 0;
    }
}

/// Cells where gear may be set.
#[derive(Debug, Clone)]
pub struct FisheryZone {
    /// Zone index used by the effort tables
    pub id: u32,
    pub cells: Vec<usize>,
}

/// The spatial grid.
#[derive(Resource, Debug)]
pub struct Landscape {
    pub width: u32,
    pub height: u32,
    pub min_traversable_depth: f32,
    pub food_growth_rate: f32,
    pub min_food: f32,
    pub mean_abundance: [f32; 4],
    pub cells: Vec<Cell>,
    pub traversable: Vec<usize>,
    /// Traversable cells with food capacity
    pub patches: Vec<usize>,
    pub blocks: Vec<Block>,
    pub regions: Vec<Region>,
    pub fishery_zones: Vec<FisheryZone>,
    season: Season,
}

struct BlockBuilder {
    cells: Vec<usize>,
    total_abundance: [f32; 4],
    min: Vec2,
    max: Vec2,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            cells: Vec::new(),
            total_abundance: [0.0; 4],
            min: Vec2::splat(f32::INFINITY),
            max: Vec2::splat(f32::NEG_INFINITY),
        }
    }

    fn add(&mut self, cell: usize, center: Vec2, abundance: &[f32; 4]) {
        self.cells.push(cell);
        for (total, a) in self.total_abundance.iter_mut().zip(abundance) {
            *total += a;
        }
        self.min = self.min.min(center);
        self.max = self.max.max(center);
    }
}

impl Landscape {
    /// Builds the grid from validated input, dropping empty blocks,
    /// regions and fishery zones.
    pub fn build(
        desc: LandscapeDescriptor,
        config: &SimConfig,
        season: Season,
    ) -> Result<Self, LandscapeError> {
        let (width, height) = (desc.width, desc.height);
        if width == 0 || height == 0 {
            return Err(LandscapeError::Dimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if desc.cells.len() != expected {
            return Err(LandscapeError::CellCount {
                expected,
                actual: desc.cells.len(),
            });
        }
        for (season, &value) in desc.mean_abundance.iter().enumerate() {
            if !(value > 0.0) {
                return Err(LandscapeError::MeanAbundance { season, value });
            }
        }

        let land = &config.landscape;
        let gear = &config.gear;
        let s = season.index();

        let mut landscape = Landscape {
            width,
            height,
            min_traversable_depth: land.min_traversable_depth,
            food_growth_rate: land.food_growth_rate,
            min_food: land.min_food,
            mean_abundance: desc.mean_abundance,
            cells: Vec::with_capacity(expected),
            traversable: Vec::new(),
            patches: Vec::new(),
            blocks: Vec::new(),
            regions: Vec::new(),
            fishery_zones: Vec::new(),
            season,
        };

        let mut blocks: Vec<BlockBuilder> = (0..desc.blocks).map(|_| BlockBuilder::new()).collect();
        let mut region_cells: Vec<Vec<usize>> = vec![Vec::new(); desc.regions as usize];
        let mut zone_cells: Vec<Vec<usize>> = vec![Vec::new(); desc.fishery_zones as usize];

        for (idx, cd) in desc.cells.into_iter().enumerate() {
            let center = landscape.cell_center(idx);
            let traversable = cd.bathymetry <= land.min_traversable_depth;
            let food_capacity = if traversable && cd.food_capacity > 0.0 {
                cd.food_capacity * land.max_food
            } else {
                0.0
            };
            let seasonal_capacity =
                seasonal_capacity(food_capacity, cd.abundance[s], desc.mean_abundance[s]);
            let initial_food = clamp_food(
                food_capacity / desc.mean_abundance[s],
                seasonal_capacity,
                land.min_food,
            );

            let distance_to_edge = (center.x - 0.5)
                .min(center.y - 0.5)
                .min(width as f32 - center.x + 0.5)
                .min(height as f32 - center.y + 0.5);

            if traversable {
                let block = cd
                    .block
                    .filter(|&b| b < desc.blocks)
                    .ok_or(LandscapeError::BlockIndex {
                        cell: idx,
                        block: cd.block,
                        count: desc.blocks,
                    })?;
                blocks[block as usize].add(idx, center, &cd.abundance);
                landscape.traversable.push(idx);
                if food_capacity > 0.0 {
                    landscape.patches.push(idx);
                }
                if let Some(cells) = cd.region.and_then(|r| region_cells.get_mut(r as usize)) {
                    cells.push(idx);
                }
                let fishable = cd.distance_to_coast > gear.min_coast_distance
                    && cd.bathymetry >= gear.max_depth;
                if fishable {
                    if let Some(cells) = cd.fishery_zone.and_then(|z| zone_cells.get_mut(z as usize)) {
                        cells.push(idx);
                    }
                }
            }

            landscape.cells.push(Cell {
                bathymetry: cd.bathymetry,
                distance_to_coast: cd.distance_to_coast,
                distance_to_edge,
                block: None,
                region: None,
                fishery_zone: cd.fishery_zone.filter(|&z| z < desc.fishery_zones),
                food_capacity,
                abundance: cd.abundance,
                seasonal_capacity,
                food: Mutex::new(initial_food),
            });
        }

        if landscape.traversable.is_empty() {
            return Err(LandscapeError::NoTraversableCells);
        }

        for builder in blocks.into_iter().filter(|b| !b.cells.is_empty()) {
            let id = landscape.blocks.len();
            let n = builder.cells.len() as f32;
            let mut density = [0.0; 4];
            let mut value = [0.0; 4];
            for season in 0..4 {
                density[season] = builder.total_abundance[season] / n;
                value[season] = density[season] / desc.mean_abundance[season];
            }
            for &cell in &builder.cells {
                landscape.cells[cell].block = Some(id);
            }
            landscape.blocks.push(Block {
                id,
                center: (builder.min + builder.max) * 0.5,
                cells: builder.cells,
                density,
                value,
            });
        }

        for (source_id, cells) in region_cells.into_iter().enumerate() {
            if cells.is_empty() {
                continue;
            }
            let id = landscape.regions.len();
            for &cell in &cells {
                landscape.cells[cell].region = Some(id);
            }
            landscape.regions.push(Region {
                id,
                source_id: source_id as u32,
                cells,
                births: 0,
                deaths: 0,
                bycatch: 0,
            });
        }

        landscape.fishery_zones = zone_cells
            .into_iter()
            .enumerate()
            .filter(|(_, cells)| !cells.is_empty())
            .map(|(id, cells)| FisheryZone {
                id: id as u32,
                cells,
            })
            .collect();

        tracing::info!(
            width,
            height,
            traversable = landscape.traversable.len(),
            patches = landscape.patches.len(),
            blocks = landscape.blocks.len(),
            regions = landscape.regions.len(),
            fishery_zones = landscape.fishery_zones.len(),
            "landscape built"
        );

        Ok(landscape)
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    /// Whether a point lies within the landscape, edges included.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width as f32 && p.y >= 0.0 && p.y <= self.height as f32
    }

    /// Index of the cell containing `p`. Points on the outer edges resolve
    /// to the adjacent interior cell.
    pub fn cell_index(&self, p: Vec2) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let (w, h) = (self.width as i64, self.height as i64);
        let row = ((h as f32 - p.y).floor() as i64).min(h - 1);
        let col = (p.x.floor() as i64).min(w - 1);
        let idx = row * w + col;
        (0..w * h).contains(&idx).then_some(idx as usize)
    }

    /// Center of a cell in map coordinates.
    pub fn cell_center(&self, idx: usize) -> Vec2 {
        let w = self.width as usize;
        let row = (idx / w) as f32;
        let col = (idx % w) as f32;
        Vec2::new(col + 0.5, self.height as f32 - (row + 0.5))
    }

    /// A uniformly jittered point inside a cell.
    pub fn random_point_in_cell<R: Rng + ?Sized>(&self, idx: usize, rng: &mut R) -> Vec2 {
        self.cell_center(idx)
            + Vec2::new(
                rng.gen_range(-CELL_JITTER..=CELL_JITTER),
                rng.gen_range(-CELL_JITTER..=CELL_JITTER),
            )
    }

    /// A random point in a random traversable cell, optionally restricted
    /// to one region.
    pub fn random_point<R: Rng + ?Sized>(&self, region: Option<usize>, rng: &mut R) -> Option<Vec2> {
        let cells = match region.and_then(|r| self.regions.get(r)) {
            Some(region) => &region.cells,
            None => &self.traversable,
        };
        if cells.is_empty() {
            return None;
        }
        let cell = cells[rng.gen_range(0..cells.len())];
        Some(self.random_point_in_cell(cell, rng))
    }

    pub fn is_traversable_cell(&self, idx: usize) -> bool {
        self.cells
            .get(idx)
            .is_some_and(|c| c.bathymetry <= self.min_traversable_depth)
    }

    /// Cells crossed by the segment `from -> to`, in order, starting with
    /// the cell containing `from`. Consecutive entries share an edge;
    /// `None` marks a position outside the grid.
    pub fn cells_crossed(&self, from: Vec2, to: Vec2) -> Vec<Option<usize>> {
        let (w, h) = (self.width as i64, self.height as i64);
        // walk in (column, row-from-top) space so bins agree with `cell_index`
        let from = Vec2::new(from.x, h as f32 - from.y);
        let to = Vec2::new(to.x, h as f32 - to.y);
        // points on the far edges belong to the last column/row
        let bin = |v: f32, n: i64| {
            let b = v.floor() as i64;
            if b == n && v == n as f32 {
                n - 1
            } else {
                b
            }
        };
        let mut cx = bin(from.x, w);
        let mut cy = bin(from.y, h);
        let ex = bin(to.x, w);
        let ey = bin(to.y, h);

        let d = to - from;
        let step_x: i64 = if d.x > 0.0 { 1 } else if d.x < 0.0 { -1 } else { 0 };
        let step_y: i64 = if d.y > 0.0 { 1 } else if d.y < 0.0 { -1 } else { 0 };
        let t_delta_x = if step_x != 0 { 1.0 / d.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { 1.0 / d.y.abs() } else { f32::INFINITY };
        let mut t_max_x = match step_x {
            1 => ((cx + 1) as f32 - from.x) * t_delta_x,
            -1 => (from.x - cx as f32) * t_delta_x,
            _ => f32::INFINITY,
        };
        let mut t_max_y = match step_y {
            1 => ((cy + 1) as f32 - from.y) * t_delta_y,
            -1 => (from.y - cy as f32) * t_delta_y,
            _ => f32::INFINITY,
        };

        let index = |col: i64, row: i64| {
            ((0..w).contains(&col) && (0..h).contains(&row)).then(|| (row * w + col) as usize)
        };

        let mut cells = vec![index(cx, cy)];
        for _ in 0..MAX_TRAVERSAL_STEPS {
            if (cx == ex && cy == ey)
                || (t_max_x > 1.0 + TRAVERSAL_SLACK && t_max_y > 1.0 + TRAVERSAL_SLACK)
            {
                break;
            }
            if t_max_x < t_max_y {
                cx += step_x;
                t_max_x += t_delta_x;
            } else {
                cy += step_y;
                t_max_y += t_delta_y;
            }
            cells.push(index(cx, cy));
        }
        cells
    }

    /// A path is traversable when its end lies on the map and every crossed
    /// cell exists and is deep enough.
    pub fn is_path_traversable(&self, from: Vec2, to: Vec2) -> bool {
        if !self.contains(to) {
            return false;
        }
        let cells = self.cells_crossed(from, to);
        !cells.is_empty()
            && cells
                .iter()
                .all(|c| c.is_some_and(|idx| self.is_traversable_cell(idx)))
    }

    /// Switches season, recomputing seasonal capacity and clamping food.
    pub fn set_season(&mut self, season: Season) {
        self.season = season;
        let s = season.index();
        let mean = self.mean_abundance[s];
        let min_food = self.min_food;
        for &idx in &self.patches {
            let cell = &mut self.cells[idx];
            cell.seasonal_capacity = seasonal_capacity(cell.food_capacity, cell.abundance[s], mean);
            let food = cell.food.get_mut();
            *food = clamp_food(*food, cell.seasonal_capacity, min_food);
        }
    }

    pub fn total_food(&self) -> f64 {
        self.patches
            .iter()
            .map(|&idx| self.cells[idx].food_level() as f64)
            .sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.patches
            .iter()
            .map(|&idx| self.cells[idx].seasonal_capacity as f64)
            .sum()
    }
}
