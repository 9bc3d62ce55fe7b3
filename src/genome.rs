use crate::config::{GenomeConfig, ProteinConfig};
use crate::gray;
use crate::model::{Ligand, Protein};
use anyhow::{Result, bail};

/// Maps bit-string genotypes to proteins.
///
/// Each gene holds four contiguous Gray-coded fields, in order: epsilon,
/// sigma, radius and angle. Genes follow each other without padding.
#[derive(Debug, Clone)]
pub struct Genome {
    cfg: GenomeConfig,
    body: ProteinConfig,
}

/// Width and range of one gene field.
#[derive(Debug, Clone, Copy)]
struct Field {
    bits: u32,
    range: [f64; 2],
}

impl Field {
    fn rescale(&self, bits: &[bool]) -> f64 {
        let [min, max] = self.range;
        let scale = 1.0 / 2f64.powi(self.bits as i32);
        gray::decode(bits) as f64 * scale * (max - min) + min
    }
}

impl Genome {
    /// Create a genome from a validated configuration.
    pub fn new(cfg: GenomeConfig, body: ProteinConfig) -> Self {
        Self { cfg, body }
    }

    pub fn gene_size(&self) -> usize {
        self.fields().iter().map(|field| field.bits as usize).sum()
    }

    /// Total number of bits in a genotype.
    pub fn size(&self) -> usize {
        self.cfg.genes * self.gene_size()
    }

    /// Decode a genotype into a protein with one ligand per gene.
    ///
    /// # Errors
    /// Returns an error if the genotype length does not match [`Genome::size`].
    pub fn decode(&self, bits: &[bool]) -> Result<Protein> {
        let size = self.size();
        if bits.len() != size {
            bail!("genotype must have {size} bits, but has {}", bits.len());
        }

        let mut protein = Protein::new(&self.body);
        for gene in bits.chunks_exact(self.gene_size()) {
            let mut vals = [0.0; 4];
            let mut start = 0;
            for (val, field) in vals.iter_mut().zip(self.fields()) {
                let end = start + field.bits as usize;
                *val = field.rescale(&gene[start..end]);
                start = end;
            }
            let [epsilon, sigma, radius, angle] = vals;
            protein.add_ligand(Ligand::new(
                epsilon,
                sigma,
                radius,
                angle,
                self.body.ligand_mass,
                self.body.ligand_cutoff,
            ));
        }

        Ok(protein)
    }

    fn fields(&self) -> [Field; 4] {
        [
            Field {
                bits: self.cfg.eps_bits,
                range: self.cfg.eps_range,
            },
            Field {
                bits: self.cfg.sigma_bits,
                range: self.cfg.sigma_range,
            },
            Field {
                bits: self.cfg.radius_bits,
                range: self.cfg.radius_range,
            },
            Field {
                bits: self.cfg.angle_bits,
                range: self.cfg.angle_range,
            },
        ]
    }
}
