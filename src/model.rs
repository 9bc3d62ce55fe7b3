//! Genotype and phenotype data types.

use crate::config::ProteinConfig;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

/// Ligand attached to a protein, placed in polar coordinates around its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ligand {
    pub epsilon: f64,
    pub sigma: f64,
    pub radius: f64,
    pub angle: f64,
    pub mass: f64,
    pub cutoff: f64,
}

impl Ligand {
    pub fn new(epsilon: f64, sigma: f64, radius: f64, angle: f64, mass: f64, cutoff: f64) -> Self {
        Self {
            epsilon,
            sigma,
            radius,
            angle,
            mass,
            cutoff,
        }
    }

    /// Offset of the ligand from the protein body.
    pub fn offset(&self) -> (f64, f64) {
        (
            self.radius * self.angle.cos(),
            self.radius * self.angle.sin(),
        )
    }
}

impl fmt::Display for Ligand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rad: {}, ang: {}, eps: {}, sig: {}, mass: {}, cutoff: {}",
            self.radius, self.angle, self.epsilon, self.sigma, self.mass, self.cutoff
        )
    }
}

/// Protein body with its ligands.
///
/// Ligand order matches gene order and determines simulation atom types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protein {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,

    ligands: Vec<Ligand>,
}

impl Protein {
    /// Create a protein without ligands from the configured body.
    pub fn new(body: &ProteinConfig) -> Self {
        Self {
            x: body.x,
            y: body.y,
            mass: body.mass,
            epsilon: body.epsilon,
            sigma: body.sigma,
            cutoff: body.cutoff,
            ligands: Vec::new(),
        }
    }

    pub fn add_ligand(&mut self, ligand: Ligand) {
        self.ligands.push(ligand);
    }

    pub fn ligands(&self) -> &[Ligand] {
        &self.ligands
    }
}

impl fmt::Display for Protein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x: {}, y: {}, m: {}, eps: {}, sig: {}, cut: {}",
            self.x, self.y, self.mass, self.epsilon, self.sigma, self.cutoff
        )?;
        write!(f, "\n{} ligands", self.ligands.len())?;
        for (i_lig, ligand) in self.ligands.iter().enumerate() {
            write!(f, "\nligand {} - {ligand}", i_lig + 1)?;
        }
        Ok(())
    }
}

/// Bit-string genotype with its cached fitness.
///
/// The length is fixed at construction. Any change to the bits clears the
/// cached fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    bits: Vec<bool>,
    fitness: Option<f64>,
}

impl Individual {
    pub fn new(bits: Vec<bool>) -> Self {
        Self {
            bits,
            fitness: None,
        }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Flip one bit.
    pub fn flip(&mut self, i_bit: usize) {
        self.bits[i_bit] = !self.bits[i_bit];
        self.fitness = None;
    }

    /// Exchange the bits in `range` with another individual.
    ///
    /// Returns whether any bit changed; only then are both fitnesses cleared.
    pub fn swap_segment(&mut self, other: &mut Individual, range: Range<usize>) -> bool {
        let a = &mut self.bits[range.clone()];
        let b = &mut other.bits[range];
        if a == b {
            return false;
        }
        a.swap_with_slice(b);
        self.fitness = None;
        other.fitness = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proteins_do_not_share_ligands() {
        let body = ProteinConfig::default();
        let mut a = Protein::new(&body);
        let b = Protein::new(&body);
        a.add_ligand(Ligand::new(1.0, 1.0, 2.0, 0.0, 0.01, 2.5));
        assert_eq!(a.ligands().len(), 1);
        assert!(b.ligands().is_empty());
    }

    #[test]
    fn ligand_offset_is_polar() {
        let ligand = Ligand::new(0.0, 0.0, 2.0, std::f64::consts::FRAC_PI_2, 0.01, 2.5);
        let (dx, dy) = ligand.offset();
        assert!(dx.abs() < 1e-12);
        assert!((dy - 2.0).abs() < 1e-12);
    }

    #[test]
    fn flip_clears_fitness() {
        let mut ind = Individual::new(vec![false; 4]);
        ind.set_fitness(1.0);
        ind.flip(2);
        assert_eq!(ind.bits(), &[false, false, true, false]);
        assert_eq!(ind.fitness(), None);
    }

    #[test]
    fn swap_of_identical_segments_keeps_fitness() {
        let mut a = Individual::new(vec![true, false, false, true]);
        let mut b = Individual::new(vec![false, false, false, false]);
        a.set_fitness(1.0);
        b.set_fitness(2.0);
        assert!(!a.swap_segment(&mut b, 1..3));
        assert_eq!(a.fitness(), Some(1.0));
        assert_eq!(b.fitness(), Some(2.0));

        assert!(a.swap_segment(&mut b, 0..2));
        assert_eq!(a.bits(), &[false, false, false, true]);
        assert_eq!(b.bits(), &[true, false, false, false]);
        assert_eq!(a.fitness(), None);
        assert_eq!(b.fitness(), None);
    }

    #[test]
    fn variation_keeps_genotype_length() {
        let mut a = Individual::new(vec![false; 6]);
        let mut b = Individual::new(vec![true; 6]);
        a.flip(5);
        a.swap_segment(&mut b, 1..4);
        assert_eq!(a.bits().len(), 6);
        assert_eq!(b.bits().len(), 6);
    }

    #[test]
    fn protein_display_lists_ligands() {
        let mut protein = Protein::new(&ProteinConfig::default());
        protein.add_ligand(Ligand::new(0.5, 1.0, 3.0, 1.0, 0.01, 2.5));
        let text = protein.to_string();
        assert!(text.contains("1 ligands"));
        assert!(text.contains("ligand 1 - rad: 3"));
    }
}
