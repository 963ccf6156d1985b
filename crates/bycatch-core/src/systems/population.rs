//! The live agent set and its initial placement.

use bevy_ecs::prelude::*;
use rand::distributions::WeightedIndex;
use rand::rngs::SmallRng;

use bycatch_events::SimClock;

use crate::agent::Agent;
use crate::config::SimParams;
use crate::error::SimError;
use crate::grid::Landscape;

/// Live agents. Only single-threaded systems add or remove entries.
#[derive(Resource, Debug, Default)]
pub struct Population {
    pub agents: Vec<Agent>,
    last_id: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next agent id. Ids start at 1.
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Adds an agent under a fresh id and returns the id.
    pub fn add(&mut self, mut agent: Agent) -> u64 {
        agent.id = self.next_id();
        let id = agent.id;
        self.agents.push(agent);
        id
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn mean_energy(&self) -> f32 {
        if self.agents.is_empty() {
            return 0.0;
        }
        self.agents.iter().map(|a| a.energy).sum::<f32>() / self.agents.len() as f32
    }
}

/// Places the starting population.
///
/// A single count spreads agents over every traversable cell; several
/// counts give the number of agents per region, in input order.
pub fn spawn_initial_population(
    landscape: &Landscape,
    params: &SimParams,
    clock: &SimClock,
    rng: &mut SmallRng,
) -> Result<Population, SimError> {
    let pop = &params.config.population;
    let age_classes = WeightedIndex::new(&pop.age_distribution)
        .map_err(|e| SimError::Population(format!("age distribution: {}", e)))?;

    let placements: Vec<(Option<usize>, u32)> = match pop.initial.as_slice() {
        [total] => vec![(None, *total)],
        counts => counts
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(source, &n)| {
                landscape
                    .regions
                    .iter()
                    .find(|r| r.source_id as usize == source)
                    .map(|r| (Some(r.id), n))
                    .ok_or_else(|| {
                        SimError::Population(format!(
                            "region {} has no traversable cells",
                            source + 1
                        ))
                    })
            })
            .collect::<Result<_, _>>()?,
    };

    let mut population = Population::new();
    for (region, count) in placements {
        for _ in 0..count {
            let pos = landscape.random_point(region, rng).ok_or_else(|| {
                SimError::Population("no traversable cell to place agents in".to_string())
            })?;
            let id = population.next_id();
            let agent = Agent::spawn_initial(
                id,
                pos,
                &age_classes,
                landscape,
                params,
                clock.day_of_year(),
                clock.month(),
                rng,
            );
            population.agents.push(agent);
        }
    }

    tracing::info!(agents = population.len(), "initial population placed");
    Ok(population)
}
