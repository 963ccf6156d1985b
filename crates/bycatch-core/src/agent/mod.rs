//! Agent Behavior Engine
//!
//! One [`Agent`] type covers every individual. Initial agents and weaned
//! calves only differ in how they are constructed. Each agent owns its own
//! random stream so agents can be stepped in parallel without sharing a
//! generator.

pub mod demography;
pub mod dispersal;
pub mod energy;
pub mod movement;
pub mod step;

use std::collections::VecDeque;

use glam::Vec2;
use rand::distributions::WeightedIndex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use bycatch_events::{MovementMode, DAYS_PER_YEAR};

use crate::config::SimParams;
use crate::grid::Landscape;

pub use dispersal::{dispersal_candidates, DispersalCandidate};
pub use energy::step_survival_probability;
pub use step::{AgentFate, StepContext};

/// Days of history kept for daily energy and positions.
pub const DAILY_HISTORY: usize = 10;

/// Daily energy assumed before any day has been recorded.
pub const INITIAL_DAILY_ENERGY: f32 = 10.0;

/// Move length (100 m units) assumed before the first step; 10^0.8.
pub const INITIAL_MOVE: f32 = 6.309_573;
pub const INITIAL_LOGMOVE: f32 = 0.8;

/// Fraction of a year added per simulated day.
pub const AGE_PER_DAY: f32 = 1.0 / DAYS_PER_YEAR as f32;

/// A remembered position and the food found there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySlot {
    pub pos: Vec2,
    pub food: f32,
}

/// Where a dispersing agent is heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersalTarget {
    pub block: Option<usize>,
    pub pos: Vec2,
    /// Distance from the agent when the target was chosen
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: u64,
    /// Age in years
    pub age: f32,
    pub pos: Vec2,
    pub last_pos: Vec2,
    pub cell: Option<usize>,
    /// Compass heading in degrees
    pub heading: f32,
    pub energy: f32,
    /// Current energy-use multiplier
    pub energy_use: f32,
    /// Sum of end-of-step energy levels since the last daily record
    pub cumulative_energy: f32,
    /// Mean energy of the last days, most recent first
    pub daily_energy: [f32; DAILY_HISTORY],
    /// Position at the start of each of the last days, most recent first
    pub daily_positions: [Vec2; DAILY_HISTORY],
    /// Most recent first, at most `movement.memory_max` entries
    pub memory: VecDeque<MemorySlot>,
    pub pregnant: bool,
    pub nursing: bool,
    pub mating_day: u16,
    pub birth_day: Option<u16>,
    pub weaning_day: Option<u16>,
    pub mode: MovementMode,
    pub target: Option<DispersalTarget>,
    /// Whether a dispersal move happened this step
    pub dispersed: bool,
    /// Consecutive steps with a dispersal move
    pub dispersal_steps: u32,
    /// Previous move length, in 100 m units
    pub prev_move: f32,
    pub prev_logmove: f32,
    /// Previous turning angle in degrees
    pub prev_angle: f32,
    pub(crate) rng: SmallRng,
}

impl Agent {
    fn blank(id: u64, pos: Vec2, heading: f32, params: &SimParams, rng: SmallRng) -> Self {
        Self {
            id,
            age: 0.0,
            pos,
            last_pos: pos,
            cell: None,
            heading,
            energy: params.config.population.initial_energy_mean,
            energy_use: 1.0,
            cumulative_energy: 0.0,
            daily_energy: [INITIAL_DAILY_ENERGY; DAILY_HISTORY],
            daily_positions: [pos; DAILY_HISTORY],
            memory: VecDeque::with_capacity(params.config.movement.memory_max),
            pregnant: false,
            nursing: false,
            mating_day: 0,
            birth_day: None,
            weaning_day: None,
            mode: MovementMode::Foraging,
            target: None,
            dispersed: false,
            dispersal_steps: 0,
            prev_move: INITIAL_MOVE,
            prev_logmove: INITIAL_LOGMOVE,
            prev_angle: 0.0,
            rng,
        }
    }

    /// An agent of the starting population at `pos`, with a random age and
    /// reproductive state consistent with `day_of_year`.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_initial(
        id: u64,
        pos: Vec2,
        age_classes: &WeightedIndex<u32>,
        landscape: &Landscape,
        params: &SimParams,
        day_of_year: u16,
        month: u8,
        master: &mut SmallRng,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(master.gen());
        let pop = &params.config.population;
        let repro = &params.config.reproduction;

        let heading = rng.gen_range(0.0..359.9);
        let mut agent = Self::blank(id, pos, heading, params, rng);

        let birthday = normal_day(&mut agent.rng, repro.birthday_mean, repro.birthday_sd);
        let yday = day_of_year as i32;
        let days_since_birthday = if yday >= birthday {
            yday - birthday
        } else {
            DAYS_PER_YEAR as i32 - birthday + yday
        };
        agent.age = age_classes.sample(&mut agent.rng) as f32
            + days_since_birthday as f32 * AGE_PER_DAY;
        agent.energy = sample_normal(&mut agent.rng, pop.initial_energy_mean, pop.initial_energy_sd);
        agent.prev_angle = agent.rng.gen_range(-25.0..25.0);

        if agent.age - 1.0 >= pop.age_of_maturity {
            if agent.rng.gen::<f32>() < repro.pregnancy_prob {
                let birth = normal_day(&mut agent.rng, repro.birthday_mean, repro.birthday_sd);
                if birth > yday {
                    agent.pregnant = true;
                    agent.birth_day = Some(bycatch_events::wrap_day_of_year(birth));
                }
            }
            if agent.age - 2.0 >= pop.age_of_maturity
                && agent.rng.gen::<f32>() < repro.pregnancy_prob * 0.5
            {
                let wean = normal_day(&mut agent.rng, repro.weaning_day_mean, repro.weaning_day_sd);
                if wean > yday {
                    agent.nursing = true;
                    agent.weaning_day = Some(bycatch_events::wrap_day_of_year(wean));
                }
            }
        }

        agent.refresh_energy_use(&params.config.energy, month);
        agent.draw_mating_day(&params.config.reproduction);
        agent.execute_move(landscape, params, pos, heading, true);
        agent
    }

    /// A weaned calf at its mother's position. The id is assigned when the
    /// calf joins the population.
    pub fn calf_of(mother: &mut Agent, landscape: &Landscape, params: &SimParams, month: u8) -> Self {
        let rng = SmallRng::seed_from_u64(mother.rng.gen());
        let pop = &params.config.population;
        let mut calf = Self::blank(0, mother.pos, mother.heading, params, rng);
        calf.age = params.config.reproduction.calf_age;
        calf.energy = sample_normal(&mut calf.rng, pop.initial_energy_mean, pop.initial_energy_sd);
        calf.refresh_energy_use(&params.config.energy, month);
        calf.draw_mating_day(&params.config.reproduction);
        calf.execute_move(landscape, params, mother.pos, mother.heading, true);
        calf
    }

    /// Once-a-day bookkeeping: ageing, the dispersal decision and the
    /// reproduction calendar. Returns a calf when one is weaned into the
    /// population.
    pub fn daily(
        &mut self,
        landscape: &Landscape,
        params: &SimParams,
        day_of_year: u16,
        month: u8,
    ) -> Option<Agent> {
        self.age += AGE_PER_DAY;
        if landscape.blocks.len() > 1 {
            self.consider_dispersing(landscape, params, landscape.season());
        }
        self.daily_demography(landscape, params, day_of_year, month)
    }

    pub fn region(&self, landscape: &Landscape) -> Option<usize> {
        self.cell.and_then(|c| landscape.cells[c].region)
    }

    pub fn block(&self, landscape: &Landscape) -> Option<usize> {
        self.cell.and_then(|c| landscape.cells[c].block)
    }
}

/// Normal draw that degrades to the mean for an invalid deviation.
pub(crate) fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f32, sd: f32) -> f32 {
    Normal::new(mean, sd).map_or(mean, |n| n.sample(rng))
}

/// Rounded normal day number, not yet wrapped into the year.
pub(crate) fn normal_day<R: Rng + ?Sized>(rng: &mut R, mean: f32, sd: f32) -> i32 {
    sample_normal(rng, mean, sd).round() as i32
}
