//! Daily tasks: food regrowth, gear deployment and agent bookkeeping.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use bycatch_events::{GearSet, SimClock, SimRecord};

use crate::agent::Agent;
use crate::config::SimParams;
use crate::gear::{gear_id_to_u64, EffortSampler, EffortSource, Gear, GearRegistry, MeshType};
use crate::grid::Landscape;
use crate::output::{RecordSink, RunStats};

use super::{run_in_pool, Population, SimRng, SimulationState, TickLedger, WorkerPool};

/// Samples the day's effort for every fishery zone and mesh type and sets
/// the nets. Returns the number of sets placed.
#[allow(clippy::too_many_arguments)]
pub fn deploy_gear(
    clock: &SimClock,
    params: &SimParams,
    landscape: &Landscape,
    registry: &mut GearRegistry,
    sampler: &dyn EffortSampler,
    rng: &mut SmallRng,
    sink: &mut RecordSink,
    stats: &mut RunStats,
) -> u32 {
    let cfg = &params.config.gear;
    let mut placed = 0;
    for zone in &landscape.fishery_zones {
        for mesh in MeshType::ALL {
            let sets = sampler.sample_sets(zone.id, clock.day_of_year(), clock.season(), mesh, rng);
            for effort in sets {
                let Some(gear) = Gear::place(landscape, zone, mesh, &effort, cfg, rng) else {
                    stats.gear_discarded += 1;
                    tracing::debug!(zone = zone.id, ?mesh, "no valid placement, set discarded");
                    continue;
                };
                let record = gear_set_record(params, clock, &gear);
                let id = registry.insert(gear);
                if let Some(mut record) = record {
                    record.gear_id = gear_id_to_u64(id);
                    sink.emit(SimRecord::GearSet(record));
                }
                placed += 1;
            }
        }
    }
    stats.gear_deployed += placed;
    placed
}

fn gear_set_record(params: &SimParams, clock: &SimClock, gear: &Gear) -> Option<GearSet> {
    params.config.output.gear_records.then(|| GearSet {
        timestamp: clock.timestamp(),
        gear_id: 0,
        gear_type: gear.mesh.index() as u8,
        fishery_zone: gear.zone,
        start: gear.segment.start.to_array(),
        end: gear.segment.end.to_array(),
        max_soak_days: gear.max_soak_days,
        pinger: gear.pinger,
    })
}

/// System: once-a-day tasks
#[allow(clippy::too_many_arguments)]
pub fn daily_tasks(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    mut landscape: ResMut<Landscape>,
    mut registry: ResMut<GearRegistry>,
    effort: Res<EffortSource>,
    mut population: ResMut<Population>,
    mut rng: ResMut<SimRng>,
    mut ledger: ResMut<TickLedger>,
    mut stats: ResMut<RunStats>,
    mut sink: ResMut<RecordSink>,
    pool: Res<WorkerPool>,
) {
    let clock = &state.clock;
    landscape.regrow_food();

    let placed = deploy_gear(
        clock,
        &params,
        &landscape,
        &mut registry,
        effort.0.as_ref(),
        &mut rng.0,
        &mut sink,
        &mut stats,
    );
    ledger.month_gear_sets += placed;

    let (day_of_year, month) = (clock.day_of_year(), clock.month());
    let calves: Vec<Agent> = {
        let land: &Landscape = &landscape;
        let params: &SimParams = &params;
        let agents = &mut population.agents;
        run_in_pool(&pool, || {
            agents
                .par_iter_mut()
                .filter_map(|agent| agent.daily(land, params, day_of_year, month))
                .collect()
        })
    };

    for calf in calves {
        if let Some(region) = calf.region(&landscape) {
            landscape.regions[region].births += 1;
        }
        population.add(calf);
        ledger.summary.births += 1;
        stats.births += 1;
    }
}
