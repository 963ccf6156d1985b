//! The per-tick agent pass, compaction, gear soak and tick report.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use bycatch_events::{AgentTrack, BycatchEvent, GearRetired, SimRecord};

use crate::agent::{Agent, AgentFate, StepContext};
use crate::config::SimParams;
use crate::gear::{gear_id_to_u64, GearRegistry};
use crate::grid::Landscape;
use crate::output::{RecordSink, RunStats};

use super::{run_in_pool, Population, SimRng, SimulationState, TickLedger, WorkerPool};

/// Meters per move unit in track records.
const MOVE_UNIT_METERS: f32 = 100.0;

/// System: step every agent once, in random order and in parallel
#[allow(clippy::too_many_arguments)]
pub fn step_agents(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    landscape: Res<Landscape>,
    registry: Res<GearRegistry>,
    mut population: ResMut<Population>,
    mut rng: ResMut<SimRng>,
    mut ledger: ResMut<TickLedger>,
    pool: Res<WorkerPool>,
) {
    population.agents.shuffle(&mut rng.0);
    let ctx = StepContext {
        params: &params,
        landscape: &landscape,
        gear: &registry,
        month: state.clock.month(),
    };
    let agents = &mut population.agents;
    ledger.fates = run_in_pool(&pool, || {
        agents.par_iter_mut().map(|agent| agent.step(&ctx)).collect()
    });
}

fn track(step: u64, agent: &Agent) -> AgentTrack {
    AgentTrack {
        step,
        agent_id: agent.id,
        age: agent.age,
        x: agent.pos.x,
        y: agent.pos.y,
        cell: agent.cell.map_or(u32::MAX, |c| c as u32),
        heading: agent.heading,
        prev_move: agent.prev_move * MOVE_UNIT_METERS,
        energy: agent.energy,
        mode: agent.mode,
        pregnant: agent.pregnant,
        nursing: agent.nursing,
    }
}

/// System: apply the fates of the agent pass and drop the dead
#[allow(clippy::too_many_arguments)]
pub fn apply_outcomes(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    mut landscape: ResMut<Landscape>,
    registry: Res<GearRegistry>,
    mut population: ResMut<Population>,
    mut ledger: ResMut<TickLedger>,
    mut stats: ResMut<RunStats>,
    mut sink: ResMut<RecordSink>,
) {
    let fates = std::mem::take(&mut ledger.fates);
    let clock = &state.clock;
    let output = &params.config.output;

    for (agent, &fate) in population.agents.iter().zip(&fates) {
        let region = agent.region(&landscape);
        match fate {
            AgentFate::Alive => {
                if output.is_followed(agent.id) {
                    sink.emit(SimRecord::AgentTrack(track(clock.step(), agent)));
                }
            }
            AgentFate::Skipped => stats.skipped_steps += 1,
            AgentFate::DiedOfAge | AgentFate::Starved => {
                if fate == AgentFate::DiedOfAge {
                    ledger.summary.deaths_age += 1;
                    stats.deaths_age += 1;
                } else {
                    ledger.summary.deaths_starvation += 1;
                    stats.deaths_starvation += 1;
                }
                if let Some(r) = region {
                    landscape.regions[r].deaths += 1;
                }
            }
            AgentFate::Entangled { gear } => {
                ledger.summary.bycatch += 1;
                ledger.month_bycatch += 1;
                stats.bycatch += 1;
                if let Some(r) = region {
                    landscape.regions[r].bycatch += 1;
                }
                let net = registry.get(gear);
                tracing::debug!(agent = agent.id, x = agent.pos.x, y = agent.pos.y, "bycatch");
                sink.emit(SimRecord::Bycatch(BycatchEvent {
                    timestamp: clock.timestamp(),
                    agent_id: agent.id,
                    gear_id: gear_id_to_u64(gear),
                    gear_type: net.map_or(0, |n| n.mesh.index() as u8),
                    x: agent.pos.x,
                    y: agent.pos.y,
                    age: agent.age,
                    region: region.map(|r| landscape.regions[r].source_id),
                    fishery_zone: net.map(|n| n.zone),
                }));
            }
        }
    }

    let mut fate_of = fates.iter();
    population
        .agents
        .retain(|_| !fate_of.next().is_some_and(|f| f.is_dead()));
}

/// System: soak all gear and haul what has reached its soak time
pub fn soak_gear(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    mut registry: ResMut<GearRegistry>,
    mut ledger: ResMut<TickLedger>,
    mut stats: ResMut<RunStats>,
    mut sink: ResMut<RecordSink>,
) {
    for (id, gear) in registry.soak_and_retire() {
        let catch = gear.catch();
        ledger.summary.gear_retired += 1;
        ledger.summary.hauled_catch += catch;
        stats.gear_retired += 1;
        stats.hauled_catch += catch;
        if params.config.output.gear_records {
            sink.emit(SimRecord::GearRetired(GearRetired {
                timestamp: state.clock.timestamp(),
                gear_id: gear_id_to_u64(id),
                gear_type: gear.mesh.index() as u8,
                fishery_zone: gear.zone,
                soak_days: gear.soak_days,
                catch,
            }));
        }
    }
}

/// System: close the tick's summary
pub fn report_tick(
    params: Res<SimParams>,
    population: Res<Population>,
    registry: Res<GearRegistry>,
    mut ledger: ResMut<TickLedger>,
    mut stats: ResMut<RunStats>,
    mut sink: ResMut<RecordSink>,
) {
    let size = population.len() as u32;
    ledger.summary.population = size;
    ledger.summary.gear_active = registry.len() as u32;
    stats.steps += 1;
    stats.observe_population(size);
    if params.config.output.tick_summaries {
        sink.emit(SimRecord::TickSummary(ledger.summary.clone()));
    }
}
