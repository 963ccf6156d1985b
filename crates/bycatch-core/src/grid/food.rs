//! Food patch dynamics.

use super::landscape::Landscape;

/// Upper bound on logistic sub-steps per regrowth call.
pub const MAX_REGROWTH_SUBSTEPS: usize = 48;

/// Sub-step increments at or below this stop the regrowth early.
pub const REGROWTH_EPSILON: f32 = 0.001;

/// Capacity scaled by the cell's seasonal abundance relative to the mean.
pub fn seasonal_capacity(capacity: f32, abundance: f32, mean_abundance: f32) -> f32 {
    if capacity <= 0.0 || mean_abundance <= 0.0 {
        0.0
    } else {
        (capacity * abundance / mean_abundance).max(0.0)
    }
}

/// Keeps food within `[min_food, capacity]`, and at zero without capacity.
pub fn clamp_food(food: f32, capacity: f32, min_food: f32) -> f32 {
    if capacity <= 0.0 {
        0.0
    } else {
        food.clamp(min_food.min(capacity), capacity)
    }
}

/// Discretized logistic growth of `food` towards `capacity`.
pub fn regrow(food: f32, capacity: f32, rate: f32) -> f32 {
    if capacity <= 0.0 {
        return 0.0;
    }
    if food >= capacity {
        return capacity;
    }
    let mut f = food;
    for _ in 0..MAX_REGROWTH_SUBSTEPS {
        let inc = rate * f * (1.0 - f / capacity);
        f += inc;
        if inc <= REGROWTH_EPSILON {
            break;
        }
    }
    f.min(capacity)
}

impl Landscape {
    /// Regrows every food patch one day's worth.
    pub fn regrow_food(&mut self) {
        let rate = self.food_growth_rate;
        for &idx in &self.patches {
            let cell = &mut self.cells[idx];
            let food = cell.food.get_mut();
            *food = regrow(*food, cell.seasonal_capacity, rate);
        }
    }
}
