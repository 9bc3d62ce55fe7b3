use crate::model::Individual;
use anyhow::{Context, Result};

/// Best individuals seen so far, ordered by decreasing fitness.
///
/// Stores copies, so later changes to the population do not affect it.
/// Genotypes already present are not inserted twice.
#[derive(Debug, Clone)]
pub struct HallOfFame {
    capacity: usize,
    entries: Vec<Individual>,
}

impl HallOfFame {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert every individual that beats the current worst entry.
    ///
    /// # Errors
    /// Returns an error if an individual has not been evaluated.
    pub fn update(&mut self, population: &[Individual]) -> Result<()> {
        for (i_ind, ind) in population.iter().enumerate() {
            let fitness = ind
                .fitness()
                .with_context(|| format!("individual {i_ind} has no fitness"))?;

            let full = self.entries.len() >= self.capacity();
            if full && !self.beats_worst(fitness) {
                continue;
            }
            if self.entries.iter().any(|hofer| hofer.bits() == ind.bits()) {
                continue;
            }
            if full {
                self.entries.pop();
            }

            // Equal fitness keeps the older entry first.
            let pos = self
                .entries
                .partition_point(|hofer| hofer.fitness() >= Some(fitness));
            self.entries.insert(pos, ind.clone());
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn beats_worst(&self, fitness: f64) -> bool {
        match self.entries.last().and_then(Individual::fitness) {
            Some(worst) => fitness > worst,
            None => self.capacity > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(bits: &[bool], fitness: f64) -> Individual {
        let mut ind = Individual::new(bits.to_vec());
        ind.set_fitness(fitness);
        ind
    }

    fn fitnesses(hof: &HallOfFame) -> Vec<f64> {
        hof.iter().filter_map(Individual::fitness).collect()
    }

    #[test]
    fn keeps_best_in_decreasing_order() {
        let mut hof = HallOfFame::new(2);
        hof.update(&[
            ind(&[false, false], 1.0),
            ind(&[false, true], 3.0),
            ind(&[true, false], 2.0),
        ])
        .unwrap();
        assert_eq!(fitnesses(&hof), vec![3.0, 2.0]);

        hof.update(&[ind(&[true, true], 2.5)]).unwrap();
        assert_eq!(fitnesses(&hof), vec![3.0, 2.5]);
        assert_eq!(hof.len(), hof.capacity());
    }

    #[test]
    fn worse_individuals_are_ignored_when_full() {
        let mut hof = HallOfFame::new(1);
        hof.update(&[ind(&[true], 5.0)]).unwrap();
        hof.update(&[ind(&[false], 1.0)]).unwrap();
        assert_eq!(fitnesses(&hof), vec![5.0]);
    }

    #[test]
    fn duplicates_are_not_inserted() {
        let mut hof = HallOfFame::new(3);
        hof.update(&[ind(&[true, false], 2.0), ind(&[true, false], 2.0)])
            .unwrap();
        assert_eq!(hof.len(), 1);
    }

    #[test]
    fn entries_are_copies() {
        let mut hof = HallOfFame::new(1);
        let mut pop = vec![ind(&[true, true], 1.0)];
        hof.update(&pop).unwrap();
        pop[0].flip(0);
        assert_eq!(hof.iter().next().unwrap().bits(), &[true, true]);
    }

    #[test]
    fn unevaluated_individual_is_an_error() {
        let mut hof = HallOfFame::new(1);
        assert!(hof.update(&[Individual::new(vec![true])]).is_err());
    }
}
