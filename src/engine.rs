use crate::config::SearchConfig;
use crate::hall_of_fame::HallOfFame;
use crate::model::Individual;
use crate::operators::Operators;
use crate::stats::{Accumulator, GenerationRecord, StatsLog};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;

/// Phase of the search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    PopulationSeeded,
    Evaluated { i_gen: usize },
    NextGeneration { i_gen: usize },
    Terminated,
}

/// Generational search engine.
///
/// Holds the operators, population, hall of fame and random number generator,
/// and steps through the phases of one search.
pub struct Engine<O: Operators> {
    ops: O,
    rng: ChaCha12Rng,
    population: Vec<Individual>,
    hall_of_fame: HallOfFame,
    history: Vec<GenerationRecord>,
    phase: Phase,
}

impl<O: Operators> Engine<O> {
    /// Create a new `Engine` seeded from `seed`, or from the OS if absent.
    pub fn new(ops: O, hof_size: usize, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        Ok(Self {
            ops,
            rng,
            population: Vec::new(),
            hall_of_fame: HallOfFame::new(hof_size),
            history: Vec::new(),
            phase: Phase::Uninitialized,
        })
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    /// Statistics of every generation evaluated so far.
    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Perform a full search and return the final population.
    ///
    /// Generation 0 evaluates the seeded population; `n_gen` further
    /// generations follow. Each record is appended to `stats_log` as it is produced.
    pub fn run(
        &mut self,
        search: &SearchConfig,
        mut stats_log: Option<&mut StatsLog>,
    ) -> Result<Vec<Individual>> {
        self.seed_population(search.pop_size)
            .context("failed to seed population")?;

        for i_gen in 0..=search.n_gen {
            if i_gen > 0 {
                self.next_generation(search.cx_prob, search.mut_prob)
                    .context("failed to produce next generation")?;
            }

            let record = self
                .evaluate(i_gen)
                .with_context(|| format!("failed to evaluate generation {i_gen}"))?;
            log::debug!("{record:?}");

            if let Some(stats_log) = stats_log.as_deref_mut() {
                stats_log.append(&record)?;
            }
        }

        self.terminate()
    }

    /// Fill the population with uniformly random genotypes.
    pub fn seed_population(&mut self, pop_size: usize) -> Result<()> {
        if self.phase != Phase::Uninitialized {
            bail!("cannot seed population in phase {:?}", self.phase);
        }

        let genome_len = self.ops.genome_len();
        self.population = (0..pop_size)
            .map(|_| Individual::new((0..genome_len).map(|_| self.rng.random()).collect()))
            .collect();

        self.phase = Phase::PopulationSeeded;
        Ok(())
    }

    /// Evaluate every individual without a cached fitness and update the
    /// statistics and the hall of fame.
    pub fn evaluate(&mut self, i_gen: usize) -> Result<GenerationRecord> {
        match self.phase {
            Phase::PopulationSeeded if i_gen == 0 => {}
            Phase::NextGeneration { i_gen: next } if i_gen == next => {}
            phase => bail!("cannot evaluate generation {i_gen} in phase {phase:?}"),
        }

        let mut n_evals = 0;
        for (i_ind, ind) in self.population.iter_mut().enumerate() {
            if ind.fitness().is_some() {
                continue;
            }
            let fitness = self
                .ops
                .evaluate(ind)
                .with_context(|| format!("failed to evaluate individual {i_ind}"))?;
            ind.set_fitness(fitness);
            n_evals += 1;
        }

        let mut acc = Accumulator::new();
        for ind in &self.population {
            acc.add(ind.fitness().context("individual has no fitness")?);
        }

        self.hall_of_fame
            .update(&self.population)
            .context("failed to update hall of fame")?;

        let record = GenerationRecord {
            i_gen,
            n_evals,
            report: acc.report(),
        };
        self.history.push(record.clone());

        self.phase = Phase::Evaluated { i_gen };
        Ok(record)
    }

    /// Replace the population with selected, recombined and mutated offspring.
    pub fn next_generation(&mut self, cx_prob: f64, mut_prob: f64) -> Result<()> {
        let Phase::Evaluated { i_gen } = self.phase else {
            bail!("cannot vary population in phase {:?}", self.phase);
        };

        let cx_dist = Bernoulli::new(cx_prob)?;
        let mut_dist = Bernoulli::new(mut_prob)?;

        let mut offspring = self
            .ops
            .select(&self.population, self.population.len(), &mut self.rng)
            .context("failed to select parents")?;

        for pair in offspring.chunks_exact_mut(2) {
            if cx_dist.sample(&mut self.rng) {
                let (a, b) = pair.split_at_mut(1);
                self.ops
                    .mate(&mut a[0], &mut b[0], &mut self.rng)
                    .context("failed to mate parents")?;
            }
        }

        for ind in &mut offspring {
            if mut_dist.sample(&mut self.rng) {
                self.ops
                    .mutate(ind, &mut self.rng)
                    .context("failed to mutate offspring")?;
            }
        }

        self.population = offspring;
        self.phase = Phase::NextGeneration { i_gen: i_gen + 1 };
        Ok(())
    }

    /// Finish the search and return the final population.
    pub fn terminate(&mut self) -> Result<Vec<Individual>> {
        if !matches!(self.phase, Phase::Evaluated { .. }) {
            bail!("cannot terminate in phase {:?}", self.phase);
        }
        self.phase = Phase::Terminated;
        Ok(self.population.clone())
    }
}
