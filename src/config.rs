use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Search configuration.
///
/// Loaded from a TOML file and validated before use. Every section and field
/// is optional; missing values fall back to the defaults below.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Independent experiment instances, run in order.
    pub experiments: Vec<ExperimentConfig>,
    /// Parameters shared by every experiment's search loop.
    pub search: SearchConfig,
    /// Body of the protein the ligands are attached to.
    pub protein: ProteinConfig,
    /// Layout of the emitted membrane simulations.
    pub membrane: MembraneConfig,
}

/// One experiment instance.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Genome layout and parameter ranges.
    pub genome: GenomeConfig,
    /// Per-bit flip probability applied to mutated individuals.
    pub mutation_rate: f64,
    /// Capacity of the hall of fame.
    pub hof_size: usize,
    /// Seed of the random number generator (drawn from the OS if absent).
    pub seed: Option<u64>,
}

/// Genome layout: `genes` genes of four Gray-coded fields each.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenomeConfig {
    /// Number of genes (one ligand per gene).
    pub genes: usize,

    /// Width of the epsilon field.
    pub eps_bits: u32,
    /// Width of the sigma field.
    pub sigma_bits: u32,
    /// Width of the ligand radius field.
    pub radius_bits: u32,
    /// Width of the ligand angle field.
    pub angle_bits: u32,

    /// Epsilon range `[min, max]`.
    pub eps_range: [f64; 2],
    /// Sigma range `[min, max]`.
    pub sigma_range: [f64; 2],
    /// Ligand radius range `[min, max]`.
    pub radius_range: [f64; 2],
    /// Ligand angle range `[min, max]` (radians).
    pub angle_range: [f64; 2],
}

/// Generational search parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Number of individuals per generation.
    pub pop_size: usize,
    /// Probability of mating each pair of offspring.
    pub cx_prob: f64,
    /// Probability of mutating each offspring.
    pub mut_prob: f64,
    /// Number of generations after the initial evaluation.
    pub n_gen: usize,
    /// Write per-generation statistics to `ft_<timestamp>.tsv`.
    pub log: bool,
}

/// Protein body and ligand defaults.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProteinConfig {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,

    pub ligand_mass: f64,
    pub ligand_cutoff: f64,
}

/// Membrane simulation layout.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MembraneConfig {
    /// Number of lattice spacings between the two anchors.
    pub m_length: usize,
    /// Distance between neighbouring membrane sites.
    pub spacing: f64,
    /// Height of the protein body above the membrane.
    pub protein_height: f64,
    /// Mass of the protein body atom in the simulation.
    pub body_mass: f64,

    /// Number of steps between trajectory dumps.
    pub dump_every: usize,
    /// Integration timestep.
    pub timestep: f64,
    /// Number of steps to run.
    pub run_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            experiments: vec![ExperimentConfig::default()],
            search: SearchConfig::default(),
            protein: ProteinConfig::default(),
            membrane: MembraneConfig::default(),
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            genome: GenomeConfig::default(),
            mutation_rate: 0.1,
            hof_size: 1,
            seed: None,
        }
    }
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            genes: 6,
            eps_bits: 6,
            sigma_bits: 6,
            radius_bits: 6,
            angle_bits: 6,
            eps_range: [0.0, 0.0],
            sigma_range: [0.0, 0.0],
            radius_range: [0.0, 15.0],
            angle_range: [0.0, 6.283185],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pop_size: 10,
            cx_prob: 0.5,
            mut_prob: 0.2,
            n_gen: 100,
            log: false,
        }
    }
}

impl Default for ProteinConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            mass: 1.0,
            epsilon: 1.0,
            sigma: 4.0,
            cutoff: 2f64.powf(1.0 / 6.0),
            ligand_mass: 0.01,
            ligand_cutoff: 2.5,
        }
    }
}

impl Default for MembraneConfig {
    fn default() -> Self {
        Self {
            m_length: 100,
            spacing: 2.0,
            protein_height: 6.0,
            body_mass: 2.0,
            dump_every: 100,
            timestep: 0.005,
            run_steps: 100_000,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (i_exp, exp) in self.experiments.iter().enumerate() {
            exp.validate()
                .with_context(|| format!("invalid experiment {i_exp}"))?;
        }
        self.search.validate().context("invalid search section")?;
        self.protein.validate().context("invalid protein section")?;
        self.membrane.validate().context("invalid membrane section")?;
        Ok(())
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.genome.validate().context("invalid genome")?;
        check_num(self.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;
        check_num(self.hof_size, 1..=10_000).context("invalid hall of fame size")?;
        Ok(())
    }
}

impl GenomeConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.genes, 1..=10_000).context("invalid number of genes")?;

        check_num(self.eps_bits, 1..=32).context("invalid epsilon width")?;
        check_num(self.sigma_bits, 1..=32).context("invalid sigma width")?;
        check_num(self.radius_bits, 1..=32).context("invalid radius width")?;
        check_num(self.angle_bits, 1..=32).context("invalid angle width")?;

        check_range(self.eps_range).context("invalid epsilon range")?;
        check_range(self.sigma_range).context("invalid sigma range")?;
        check_range(self.radius_range).context("invalid radius range")?;
        check_range(self.angle_range).context("invalid angle range")?;

        Ok(())
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.pop_size, 1..=1_000_000).context("invalid population size")?;
        check_num(self.cx_prob, 0.0..=1.0).context("invalid crossover probability")?;
        check_num(self.mut_prob, 0.0..=1.0).context("invalid mutation probability")?;
        check_num(self.n_gen, 0..=1_000_000).context("invalid number of generations")?;
        Ok(())
    }
}

impl ProteinConfig {
    pub fn validate(&self) -> Result<()> {
        check_finite(self.x).context("invalid x")?;
        check_finite(self.y).context("invalid y")?;
        check_positive(self.mass).context("invalid mass")?;
        check_finite(self.epsilon).context("invalid epsilon")?;
        check_finite(self.sigma).context("invalid sigma")?;
        check_positive(self.cutoff).context("invalid cutoff")?;
        check_positive(self.ligand_mass).context("invalid ligand mass")?;
        check_positive(self.ligand_cutoff).context("invalid ligand cutoff")?;
        Ok(())
    }
}

impl MembraneConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.m_length, 3..=100_000).context("invalid membrane length")?;
        check_positive(self.spacing).context("invalid spacing")?;
        check_finite(self.protein_height).context("invalid protein height")?;
        check_positive(self.body_mass).context("invalid body mass")?;
        check_num(self.dump_every, 1..).context("invalid dump interval")?;
        check_positive(self.timestep).context("invalid timestep")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num:?}");
    }
    Ok(())
}

fn check_positive(num: f64) -> Result<()> {
    check_finite(num)?;
    if num <= 0.0 {
        bail!("number must be positive, but is {num:?}");
    }
    Ok(())
}

fn check_range(range: [f64; 2]) -> Result<()> {
    let [min, max] = range;
    check_finite(min).context("invalid minimum")?;
    check_finite(max).context("invalid maximum")?;
    if min > max {
        bail!("minimum must not exceed maximum, but {min:?} > {max:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[search]
pop_size = 20

[[experiments]]
mutation_rate = 0.05
seed = 7

[experiments.genome]
genes = 1
radius_range = [1.0, 2.0]
"#,
        )
        .unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.search.pop_size, 20);
        assert_eq!(cfg.search.n_gen, 100);
        assert_eq!(cfg.experiments.len(), 1);
        assert_eq!(cfg.experiments[0].seed, Some(7));
        assert_eq!(cfg.experiments[0].hof_size, 1);
        assert_eq!(cfg.experiments[0].genome.genes, 1);
        assert_eq!(cfg.experiments[0].genome.eps_bits, 6);
        assert_eq!(cfg.experiments[0].genome.radius_range, [1.0, 2.0]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[search]\npopulation = 3\n").is_err());
    }

    #[test]
    fn zero_width_field_is_rejected() {
        let mut cfg = Config::default();
        cfg.experiments[0].genome.radius_bits = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.experiments[0].genome.angle_range = [1.0, 0.0];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn probability_above_one_is_rejected() {
        let mut cfg = Config::default();
        cfg.search.cx_prob = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_body_mass_is_rejected() {
        let mut cfg = Config::default();
        cfg.membrane.body_mass = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_experiment_list_is_valid() {
        let cfg = Config {
            experiments: Vec::new(),
            ..Config::default()
        };
        cfg.validate().unwrap();
    }
}
