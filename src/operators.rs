//! Variation, selection and evaluation operators of the search loop.

use crate::fitness;
use crate::genome::Genome;
use crate::model::Individual;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform};

/// Operators used by [`crate::engine::Engine`], fixed at construction.
pub trait Operators {
    /// Number of bits of every individual.
    fn genome_len(&self) -> usize;

    /// Choose `k` parents (copies) from an evaluated population.
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>>;

    /// Recombine two individuals in place.
    fn mate<R: Rng + ?Sized>(
        &self,
        a: &mut Individual,
        b: &mut Individual,
        rng: &mut R,
    ) -> Result<()>;

    /// Mutate an individual in place.
    fn mutate<R: Rng + ?Sized>(&self, ind: &mut Individual, rng: &mut R) -> Result<()>;

    /// Compute the fitness of an individual.
    fn evaluate(&self, ind: &Individual) -> Result<f64>;
}

/// Tournament selection, two-point crossover and bit-flip mutation.
#[derive(Debug, Clone)]
pub struct StandardOperators {
    genome: Genome,
    tourn_size: usize,
    indpb: f64,
}

impl StandardOperators {
    pub const TOURN_SIZE: usize = 3;

    /// `indpb` is the flip probability of each bit of a mutated individual.
    pub fn new(genome: Genome, indpb: f64) -> Self {
        Self {
            genome,
            tourn_size: Self::TOURN_SIZE,
            indpb,
        }
    }
}

impl Operators for StandardOperators {
    fn genome_len(&self) -> usize {
        self.genome.size()
    }

    /// Ties are won by the contestant drawn first.
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>> {
        let contestant_dist = Uniform::new(0, population.len())?;

        let mut chosen = Vec::with_capacity(k);
        for _ in 0..k {
            let mut best: Option<(usize, f64)> = None;
            for _ in 0..self.tourn_size {
                let i_ind = contestant_dist.sample(rng);
                let fitness = population[i_ind]
                    .fitness()
                    .with_context(|| format!("individual {i_ind} has no fitness"))?;
                if best.is_none_or(|(_, best_fitness)| fitness > best_fitness) {
                    best = Some((i_ind, fitness));
                }
            }
            let (i_ind, _) = best.context("tournament has no contestants")?;
            chosen.push(population[i_ind].clone());
        }

        Ok(chosen)
    }

    fn mate<R: Rng + ?Sized>(
        &self,
        a: &mut Individual,
        b: &mut Individual,
        rng: &mut R,
    ) -> Result<()> {
        let size = a.bits().len().min(b.bits().len());
        if size < 2 {
            return Ok(());
        }

        let cx_1 = rng.random_range(1..=size);
        let mut cx_2 = rng.random_range(1..size);
        let (start, end) = if cx_2 >= cx_1 {
            cx_2 += 1;
            (cx_1, cx_2)
        } else {
            (cx_2, cx_1)
        };

        a.swap_segment(b, start..end);
        Ok(())
    }

    fn mutate<R: Rng + ?Sized>(&self, ind: &mut Individual, rng: &mut R) -> Result<()> {
        let flip_dist = Bernoulli::new(self.indpb)?;
        for i_bit in 0..ind.bits().len() {
            if flip_dist.sample(rng) {
                ind.flip(i_bit);
            }
        }
        Ok(())
    }

    fn evaluate(&self, ind: &Individual) -> Result<f64> {
        let protein = self
            .genome
            .decode(ind.bits())
            .context("failed to decode genotype")?;
        let fitness = fitness::evaluate(&protein)?;
        Ok(fitness)
    }
}
