//! Calendar boundary tasks and clock advance.

use bevy_ecs::prelude::*;

use crate::config::SimParams;
use crate::grid::Landscape;

use super::{Population, SimulationState, TickLedger};

/// System: draw a new mating day for every agent
pub fn yearly_tasks(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    mut population: ResMut<Population>,
) {
    for agent in population.agents.iter_mut() {
        agent.draw_mating_day(&params.config.reproduction);
    }
    tracing::info!(year = state.clock.year(), population = population.len(), "new year");
}

/// System: switch season and seasonal food capacity
pub fn quarterly_tasks(state: Res<SimulationState>, mut landscape: ResMut<Landscape>) {
    let season = state.clock.season();
    landscape.set_season(season);
    tracing::debug!(%season, "season changed");
}

/// System: move to the next half hour and open a fresh tick ledger
pub fn advance_clock(mut state: ResMut<SimulationState>, mut ledger: ResMut<TickLedger>) {
    let step = state.clock.advance();
    state.steps_run += 1;
    ledger.start_tick(step);
}
