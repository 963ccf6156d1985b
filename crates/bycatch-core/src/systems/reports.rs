//! Monthly tasks and reports.

use bevy_ecs::prelude::*;

use bycatch_events::{AgeStructure, PopulationReport, RegionDemography, SimClock, SimRecord};

use crate::config::SimParams;
use crate::grid::Landscape;
use crate::output::RecordSink;

use super::{Population, SimulationState, TickLedger};

/// Age boundaries of the age-structure record, in years.
const ADULT_AGE: f32 = 4.0;
const OLD_AGE: f32 = 10.0;

/// System: refresh energy use and write the monthly reports
pub fn monthly_tasks(
    state: Res<SimulationState>,
    params: Res<SimParams>,
    mut population: ResMut<Population>,
    mut landscape: ResMut<Landscape>,
    mut ledger: ResMut<TickLedger>,
    mut sink: ResMut<RecordSink>,
) {
    let month = state.clock.month();
    for agent in population.agents.iter_mut() {
        agent.refresh_energy_use(&params.config.energy, month);
    }
    write_monthly_report(&state.clock, &population, &mut landscape, &mut ledger, &mut sink);
}

/// Emits the population, age-structure and per-region records for the
/// period since the last report, then resets the period counters.
pub fn write_monthly_report(
    clock: &SimClock,
    population: &Population,
    landscape: &mut Landscape,
    ledger: &mut TickLedger,
    sink: &mut RecordSink,
) {
    let timestamp = clock.timestamp();
    let report = PopulationReport {
        timestamp,
        population: population.len() as u32,
        total_food: landscape.total_food(),
        total_capacity: landscape.total_capacity(),
        mean_energy: population.mean_energy(),
        gear_sets: ledger.month_gear_sets,
        bycatch: ledger.month_bycatch,
    };
    tracing::info!(
        date = %clock.date(),
        population = report.population,
        mean_energy = report.mean_energy,
        gear_sets = report.gear_sets,
        bycatch = report.bycatch,
        "monthly report"
    );
    sink.emit(SimRecord::PopulationReport(report));

    let mut ages = AgeStructure {
        timestamp,
        juvenile: 0,
        adult: 0,
        old: 0,
    };
    let mut per_region = vec![0u32; landscape.regions.len()];
    for agent in &population.agents {
        match agent.age {
            a if a < ADULT_AGE => ages.juvenile += 1,
            a if a < OLD_AGE => ages.adult += 1,
            _ => ages.old += 1,
        }
        if let Some(region) = agent.region(landscape) {
            per_region[region] += 1;
        }
    }
    sink.emit(SimRecord::AgeStructure(ages));

    for (region, count) in landscape.regions.iter_mut().zip(per_region) {
        sink.emit(SimRecord::RegionDemography(RegionDemography {
            timestamp,
            region: region.source_id,
            population: count,
            births: region.births,
            deaths: region.deaths,
            bycatch: region.bycatch,
        }));
        region.reset_counters();
    }
    ledger.start_month();
}
