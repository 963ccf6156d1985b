//! Simulation driver
//!
//! Owns the ECS world and the tick schedule. A run ends when the step
//! budget is used up, the population dies out, or the stop handle is set
//! between two ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use bycatch_events::SimClock;

use crate::config::{SimConfig, SimParams};
use crate::error::SimError;
use crate::gear::{EffortSampler, EffortSource, GearRegistry};
use crate::grid::{Landscape, LandscapeDescriptor};
use crate::output::{EventSink, RecordSink, RunStats};
use crate::systems::{
    build_schedule, spawn_initial_population, write_monthly_report, Population, SimRng,
    SimulationState, TickLedger, WorkerPool,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The configured number of steps ran.
    Completed { steps: u64 },
    /// No agent was left alive before `step`.
    Extinct { step: u64 },
    /// The stop handle was set before `step`.
    Stopped { step: u64 },
}

pub struct Simulation {
    world: World,
    schedule: Schedule,
    stop: Arc<AtomicBool>,
    seed: u64,
}

impl Simulation {
    /// Validates the configuration, builds the landscape and places the
    /// initial population. Gear deployment is disabled and records are
    /// discarded until a sampler and sink are attached.
    pub fn new(config: SimConfig, landscape: LandscapeDescriptor) -> Result<Self, SimError> {
        let params = SimParams::new(config)?;
        let sim = &params.config.simulation;
        let seed = sim.seed.unwrap_or_else(rand::random);
        let mut rng = SmallRng::seed_from_u64(seed);

        let state = SimulationState::new(sim.start_day, sim.steps);
        let landscape = Landscape::build(landscape, &params.config, state.clock.season())?;
        let population = spawn_initial_population(&landscape, &params, &state.clock, &mut rng)?;

        let pool = match sim.threads {
            0 => None,
            n => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
        };

        let mut ledger = TickLedger::default();
        ledger.start_tick(state.clock.step());
        let stats = RunStats {
            initial_population: population.len() as u32,
            ..Default::default()
        };

        tracing::info!(
            seed,
            steps = sim.steps,
            start_day = sim.start_day,
            agents = population.len(),
            "simulation ready"
        );

        let mut world = World::new();
        world.insert_resource(GearRegistry::new(landscape.cell_count()));
        world.insert_resource(landscape);
        world.insert_resource(population);
        world.insert_resource(state);
        world.insert_resource(params);
        world.insert_resource(SimRng(rng));
        world.insert_resource(ledger);
        world.insert_resource(stats);
        world.insert_resource(WorkerPool(pool));
        world.insert_resource(EffortSource::default());
        world.insert_resource(RecordSink::default());

        Ok(Self {
            world,
            schedule: build_schedule(),
            stop: Arc::new(AtomicBool::new(false)),
            seed,
        })
    }

    /// Deploy gear from `sampler`
    pub fn with_effort(mut self, sampler: Box<dyn EffortSampler>) -> Self {
        self.world.insert_resource(EffortSource(sampler));
        self
    }

    /// Send records to `sink`
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.world.insert_resource(RecordSink::new(sink));
        self
    }

    /// Flag that stops the run before the next tick once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs a single tick.
    pub fn tick(&mut self) {
        self.schedule.run(&mut self.world);
    }

    /// Runs ticks until the step budget is used up, the population dies
    /// out or a stop is requested, then writes the closing report.
    pub fn run(&mut self) -> Result<RunOutcome, SimError> {
        let outcome = loop {
            let state = self.world.resource::<SimulationState>();
            let step = state.clock.step();
            if state.is_finished() {
                break RunOutcome::Completed {
                    steps: state.steps_run,
                };
            }
            if self.stop.load(Ordering::Relaxed) {
                break RunOutcome::Stopped { step };
            }
            if self.population().is_empty() {
                break RunOutcome::Extinct { step };
            }
            self.tick();
        };

        self.finish()?;
        match outcome {
            RunOutcome::Completed { steps } => tracing::info!(steps, "run completed"),
            RunOutcome::Extinct { step } => tracing::info!(step, "population extinct"),
            RunOutcome::Stopped { step } => tracing::info!(step, "run stopped"),
        }
        Ok(outcome)
    }

    fn finish(&mut self) -> Result<(), SimError> {
        let clock = self.world.resource::<SimulationState>().clock.clone();
        self.world.resource_scope(|world, mut landscape: Mut<Landscape>| {
            world.resource_scope(|world, mut ledger: Mut<TickLedger>| {
                world.resource_scope(|world, mut sink: Mut<RecordSink>| {
                    let population = world.resource::<Population>();
                    write_monthly_report(&clock, population, &mut landscape, &mut ledger, &mut sink);
                })
            })
        });

        let failures = self.world.resource::<RecordSink>().failures();
        let size = self.population().len() as u32;
        {
            let mut stats = self.world.resource_mut::<RunStats>();
            stats.sink_failures = failures;
            stats.observe_population(size);
        }

        self.world.resource_mut::<RecordSink>().flush()?;
        Ok(())
    }

    pub fn population(&self) -> &Population {
        self.world.resource::<Population>()
    }

    pub fn landscape(&self) -> &Landscape {
        self.world.resource::<Landscape>()
    }

    pub fn gear(&self) -> &GearRegistry {
        self.world.resource::<GearRegistry>()
    }

    pub fn stats(&self) -> &RunStats {
        self.world.resource::<RunStats>()
    }

    pub fn clock(&self) -> &SimClock {
        &self.world.resource::<SimulationState>().clock
    }

    pub fn params(&self) -> &SimParams {
        self.world.resource::<SimParams>()
    }

    /// Mutable access for scenario setup between ticks.
    pub fn population_mut(&mut self) -> Mut<'_, Population> {
        self.world.resource_mut::<Population>()
    }

    pub fn landscape_mut(&mut self) -> Mut<'_, Landscape> {
        self.world.resource_mut::<Landscape>()
    }
}
