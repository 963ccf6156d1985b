//! Mating, birth and weaning calendar.

use rand::Rng;

use bycatch_events::wrap_day_of_year;

use crate::config::{EnergyConfig, ReproductionConfig, SimParams};
use crate::grid::Landscape;

use super::{normal_day, Agent};

impl Agent {
    /// Draws this year's mating day.
    pub fn draw_mating_day(&mut self, cfg: &ReproductionConfig) {
        let day = normal_day(&mut self.rng, cfg.mating_day_mean, cfg.mating_day_sd);
        self.mating_day = wrap_day_of_year(day);
    }

    pub fn is_mature(&self, params: &SimParams) -> bool {
        self.age >= params.config.population.age_of_maturity
    }

    /// Ends nursing without producing a calf.
    pub fn abandon_calf(&mut self, cfg: &EnergyConfig, month: u8) {
        self.nursing = false;
        self.weaning_day = None;
        self.refresh_energy_use(cfg, month);
    }

    fn try_mating(&mut self, params: &SimParams, day_of_year: u16) {
        let repro = &params.config.reproduction;
        if day_of_year != self.mating_day || self.pregnant || !self.is_mature(params) {
            return;
        }
        if self.rng.gen::<f32>() < repro.pregnancy_prob {
            self.pregnant = true;
            self.birth_day = Some(wrap_day_of_year(
                day_of_year as i32 - repro.gestation_offset_days,
            ));
        }
    }

    fn give_birth(&mut self, params: &SimParams, day_of_year: u16, month: u8) {
        if !self.pregnant || self.birth_day != Some(day_of_year) {
            return;
        }
        if self.nursing {
            tracing::trace!(agent = self.id, "previous calf lost at birth");
        }
        self.pregnant = false;
        self.birth_day = None;
        self.nursing = true;
        self.weaning_day = Some(wrap_day_of_year(
            day_of_year as i32 + params.config.reproduction.nursing_days,
        ));
        self.refresh_energy_use(&params.config.energy, month);
    }

    fn wean(
        &mut self,
        landscape: &Landscape,
        params: &SimParams,
        day_of_year: u16,
        month: u8,
    ) -> Option<Agent> {
        if !self.nursing || self.weaning_day != Some(day_of_year) {
            return None;
        }
        self.abandon_calf(&params.config.energy, month);
        // only female calves are modelled
        if self.rng.gen::<f32>() < params.config.reproduction.calf_retention {
            Some(Agent::calf_of(self, landscape, params, month))
        } else {
            None
        }
    }

    /// Runs the day's reproduction events and returns a weaned calf, if any.
    pub(crate) fn daily_demography(
        &mut self,
        landscape: &Landscape,
        params: &SimParams,
        day_of_year: u16,
        month: u8,
    ) -> Option<Agent> {
        self.try_mating(params, day_of_year);
        self.give_birth(params, day_of_year, month);
        self.wean(landscape, params, day_of_year, month)
    }
}
