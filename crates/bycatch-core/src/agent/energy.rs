//! Food intake, energy expenditure and survival.

use rand::Rng;

use bycatch_events::{TICKS_PER_DAY, TICKS_PER_YEAR};

use crate::config::EnergyConfig;
use crate::grid::Landscape;

use super::{Agent, DAILY_HISTORY};

/// Energy level of a satiated agent.
pub const MAX_ENERGY: f32 = 20.0;

/// Largest share of a patch eaten in one step.
const MAX_BITE: f32 = 0.99;

/// Per-step survival probability at `energy`, from a yearly survival of
/// `1 - m * exp(-x * energy)`.
pub fn step_survival_probability(energy: f32, mortality_const: f32, survival_const: f32) -> f32 {
    let yearly = 1.0 - mortality_const * (-energy * survival_const).exp();
    if yearly <= 0.0 {
        return 0.0;
    }
    yearly.powf(1.0 / TICKS_PER_YEAR as f32)
}

impl Agent {
    /// Eats from the current cell's food in proportion to the energy
    /// deficit, and remembers the food found here.
    pub fn consume_food(&mut self, landscape: &Landscape) {
        let Some(idx) = self.cell else {
            return;
        };
        let cell = &landscape.cells[idx];
        let mut food = cell.food.lock();
        if let Some(slot) = self.memory.front_mut() {
            slot.food = *food;
        }
        if *food > 0.0 && self.energy < MAX_ENERGY {
            let share = ((MAX_ENERGY - self.energy) / 10.0).min(MAX_BITE);
            let mut eaten = share * *food;
            self.energy += eaten;
            if self.energy > MAX_ENERGY {
                eaten -= self.energy - MAX_ENERGY;
                self.energy = MAX_ENERGY;
            }
            let floor = landscape.min_food.min(cell.seasonal_capacity);
            *food = (*food - eaten).max(floor);
        }
    }

    /// Sets the energy-use multiplier for `month` (1-12) and nursing state.
    pub fn refresh_energy_use(&mut self, cfg: &EnergyConfig, month: u8) {
        let idx = (month.clamp(1, 12) - 1) as usize;
        let mut energy_use = cfg.monthly_multiplier.get(idx).copied().unwrap_or(1.0);
        if self.nursing {
            energy_use *= cfg.nursing_multiplier;
        }
        self.energy_use = energy_use;
    }

    /// Pays the baseline and distance cost of this step.
    pub fn use_energy(&mut self, cfg: &EnergyConfig, dispersal_distance: f32) {
        let mut distance = self.prev_move * 2.5;
        if self.dispersed {
            distance += dispersal_distance;
        }
        self.energy -=
            0.001 * self.energy_use * (cfg.step_multiplier + distance * cfg.distance_multiplier);
        self.cumulative_energy += self.energy;
    }

    /// Stochastic survival at the current energy. A nursing agent that fails
    /// the draw survives by abandoning its calf.
    pub fn survives(&mut self, cfg: &EnergyConfig, month: u8) -> bool {
        if self.energy <= 0.0 {
            return false;
        }
        let p = step_survival_probability(self.energy, cfg.mortality_const, cfg.survival_const);
        if self.rng.gen::<f32>() < p {
            return true;
        }
        if self.nursing {
            self.abandon_calf(cfg, month);
            return true;
        }
        false
    }

    /// Closes a day of energy accounting once a full day of positions has
    /// been remembered.
    pub fn record_daily_energy(&mut self) {
        if self.memory.len() < TICKS_PER_DAY as usize {
            return;
        }
        self.daily_energy.copy_within(0..DAILY_HISTORY - 1, 1);
        self.daily_energy[0] = self.cumulative_energy / TICKS_PER_DAY as f32;
        self.cumulative_energy = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{agent_at, landscape, params};
    use crate::agent::MemorySlot;
    use glam::Vec2;

    #[test]
    fn test_survival_probability_shape() {
        let low = step_survival_probability(1.0, 1.0, 0.4);
        let high = step_survival_probability(5.0, 1.0, 0.4);
        assert!(low < high);
        assert!(high < 1.0 && low > 0.99);
        assert_eq!(step_survival_probability(0.0, 1.0, 0.4), 0.0);
    }

    #[test]
    fn test_zero_energy_dies() {
        let params = params();
        let land = landscape(4, 4);
        let mut agent = agent_at(&land, &params, Vec2::new(2.0, 2.0), 6);
        agent.nursing = false;
        agent.energy = 0.0;
        assert!(!agent.survives(&params.config.energy, 1));
    }

    #[test]
    fn test_nursing_agent_abandons_calf_instead_of_dying() {
        let mut params = params();
        params.config.energy.mortality_const = 1000.0;
        let land = landscape(4, 4);
        let mut agent = agent_at(&land, &params, Vec2::new(2.0, 2.0), 6);
        agent.nursing = true;
        agent.weaning_day = Some(200);
        agent.energy = 0.5;
        assert!(agent.survives(&params.config.energy, 1));
        assert!(!agent.nursing);
        assert_eq!(agent.weaning_day, None);
        assert!(!agent.survives(&params.config.energy, 1));
    }

    #[test]
    fn test_consumption_caps_energy_and_keeps_food() {
        let params = params();
        let land = landscape(4, 4);
        let mut agent = agent_at(&land, &params, Vec2::new(2.5, 2.5), 6);
        let cell = agent.cell.unwrap();
        *land.cells[cell].food.lock() = 1.0;

        agent.energy = 19.0;
        agent.consume_food(&land);
        assert!((agent.energy - 19.1).abs() < 1e-5);
        assert!((land.cells[cell].food_level() - 0.9).abs() < 1e-5);
        assert_eq!(agent.memory[0].food, 1.0);

        // never eats past satiation
        *land.cells[cell].food.lock() = 15.0;
        agent.energy = 19.0;
        agent.consume_food(&land);
        assert_eq!(agent.energy, MAX_ENERGY);
        assert!((land.cells[cell].food_level() - 14.0).abs() < 1e-4);

        // a patch is never emptied
        *land.cells[cell].food.lock() = 1.0;
        agent.energy = 0.0;
        agent.consume_food(&land);
        assert!((land.cells[cell].food_level() - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_energy_use() {
        let params = params();
        let land = landscape(4, 4);
        let mut agent = agent_at(&land, &params, Vec2::new(2.0, 2.0), 6);
        agent.energy = 10.0;
        agent.energy_use = 1.0;
        agent.prev_move = 4.0;
        agent.cumulative_energy = 0.0;
        agent.dispersed = false;
        agent.use_energy(&params.config.energy, 1.6);
        // 0.001 * (4.5 + 10 * 0.1)
        assert!((agent.energy - (10.0 - 0.0055)).abs() < 1e-5);
        assert_eq!(agent.cumulative_energy, agent.energy);
    }

    #[test]
    fn test_daily_energy_waits_for_full_day() {
        let params = params();
        let land = landscape(4, 4);
        let mut agent = agent_at(&land, &params, Vec2::new(2.0, 2.0), 6);
        agent.cumulative_energy = 480.0;
        agent.record_daily_energy();
        assert_eq!(agent.daily_energy[0], 10.0);

        for _ in 0..48 {
            agent.memory.push_front(MemorySlot { pos: agent.pos, food: 0.0 });
        }
        agent.cumulative_energy = 96.0;
        agent.record_daily_energy();
        assert_eq!(agent.daily_energy[0], 2.0);
        assert_eq!(agent.daily_energy[1], 10.0);
        assert_eq!(agent.cumulative_energy, 0.0);
    }
}
