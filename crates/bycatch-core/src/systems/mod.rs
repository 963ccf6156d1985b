//! ECS Systems
//!
//! One tick is a single chained schedule: calendar tasks gated on the
//! clock's boundary flags, then the parallel agent pass, compaction, gear
//! soak and the tick report. The clock advances last.

pub mod calendar;
pub mod daily;
pub mod population;
pub mod reports;
pub mod tick;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use rand::rngs::SmallRng;

use bycatch_events::{SimClock, TickSummary};

use crate::agent::AgentFate;

pub use calendar::{advance_clock, quarterly_tasks, yearly_tasks};
pub use daily::{daily_tasks, deploy_gear};
pub use population::{spawn_initial_population, Population};
pub use reports::{monthly_tasks, write_monthly_report};
pub use tick::{apply_outcomes, report_tick, soak_gear, step_agents};

/// Global simulation state resource
#[derive(Resource, Debug)]
pub struct SimulationState {
    pub clock: SimClock,
    pub max_steps: u64,
    pub steps_run: u64,
}

impl SimulationState {
    pub fn new(start_day: u16, max_steps: u64) -> Self {
        Self {
            clock: SimClock::new(start_day),
            max_steps,
            steps_run: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps_run >= self.max_steps
    }
}

/// Master random stream for scheduler-level draws.
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

/// Optional dedicated pool for the agent pass.
#[derive(Resource, Default)]
pub struct WorkerPool(pub Option<rayon::ThreadPool>);

/// Buffers between the systems of one tick, plus counters for the
/// current report month.
#[derive(Resource, Debug, Default)]
pub struct TickLedger {
    /// Fate of each agent, index-aligned with the population
    pub fates: Vec<AgentFate>,
    pub summary: TickSummary,
    pub month_gear_sets: u32,
    pub month_bycatch: u32,
}

impl TickLedger {
    pub fn start_tick(&mut self, step: u64) {
        self.fates.clear();
        self.summary = TickSummary {
            step,
            ..Default::default()
        };
    }

    pub fn start_month(&mut self) {
        self.month_gear_sets = 0;
        self.month_bycatch = 0;
    }
}

/// Runs `f` on the dedicated pool when one is configured.
pub fn run_in_pool<R: Send>(pool: &WorkerPool, f: impl FnOnce() -> R + Send) -> R {
    match &pool.0 {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

pub fn is_new_day(state: Res<SimulationState>) -> bool {
    state.clock.is_new_day()
}

pub fn is_new_month(state: Res<SimulationState>) -> bool {
    state.clock.is_new_month()
}

pub fn is_new_quarter(state: Res<SimulationState>) -> bool {
    state.clock.is_new_quarter()
}

pub fn is_new_year(state: Res<SimulationState>) -> bool {
    state.clock.is_new_year()
}

/// Builds the per-tick schedule.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            yearly_tasks.run_if(is_new_year),
            quarterly_tasks.run_if(is_new_quarter),
            monthly_tasks.run_if(is_new_month),
            daily_tasks.run_if(is_new_day),
            step_agents,
            apply_outcomes,
            soak_gear,
            report_tick,
            advance_clock,
        )
            .chain(),
    );
    schedule
}
