use crate::config::{Config, ExperimentConfig, ProteinConfig};
use crate::engine::Engine;
use crate::genome::Genome;
use crate::membrane;
use crate::model::Individual;
use crate::operators::StandardOperators;
use crate::stats::{GenerationRecord, StatsLog};
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Outcome of one experiment, as stored in a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub experiment: ExperimentConfig,
    pub protein: ProteinConfig,
    pub population: Vec<Individual>,
    pub hall_of_fame: Vec<Individual>,
    pub history: Vec<GenerationRecord>,
}

struct Experiment {
    cfg: ExperimentConfig,
    engine: Engine<StandardOperators>,
}

pub struct Manager {
    out_dir: PathBuf,
    cfg: Config,
    experiments: Vec<Experiment>,
}

impl Manager {
    /// Validate `cfg` and register one experiment per configured entry.
    pub fn new<P: AsRef<Path>>(out_dir: P, cfg: Config) -> Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        cfg.validate().context("failed to validate cfg")?;

        let exp_cfgs = cfg.experiments.clone();
        let mut mgr = Self {
            out_dir,
            cfg,
            experiments: Vec::with_capacity(exp_cfgs.len()),
        };
        for exp_cfg in exp_cfgs {
            mgr.register(exp_cfg)?;
        }

        Ok(mgr)
    }

    /// Add an experiment instance to the end of the list.
    pub fn register(&mut self, exp_cfg: ExperimentConfig) -> Result<()> {
        exp_cfg.validate().context("failed to validate experiment")?;

        let genome = Genome::new(exp_cfg.genome.clone(), self.cfg.protein.clone());
        let ops = StandardOperators::new(genome, exp_cfg.mutation_rate);
        let engine = Engine::new(ops, exp_cfg.hof_size, exp_cfg.seed)
            .context("failed to construct engine")?;

        self.experiments.push(Experiment {
            cfg: exp_cfg,
            engine,
        });
        Ok(())
    }

    pub fn n_experiments(&self) -> usize {
        self.experiments.len()
    }

    /// Run every experiment in order and return their final populations.
    pub fn run(&mut self) -> Result<Vec<Vec<Individual>>> {
        let search = self.cfg.search.clone();
        if search.log {
            fs::create_dir_all(&self.out_dir)
                .with_context(|| format!("failed to create {:?}", self.out_dir))?;
        }

        let mut populations = Vec::with_capacity(self.experiments.len());
        for (i_exp, exp) in self.experiments.iter_mut().enumerate() {
            log::info!("running experiment {i_exp}");

            let mut stats_log = if search.log {
                let stats_log =
                    StatsLog::create(&self.out_dir).context("failed to create stats log")?;
                log::info!("logging to {:?}", stats_log.path());
                Some(stats_log)
            } else {
                None
            };

            let population = exp
                .engine
                .run(&search, stats_log.as_mut())
                .with_context(|| format!("failed to run experiment {i_exp}"))?;

            if let Some(last) = exp.engine.history().last() {
                log::info!("experiment {i_exp} final generation: {last:?}");
            }

            let hof = exp.engine.hall_of_fame();
            if hof.is_empty() {
                log::warn!("experiment {i_exp} kept no elites");
            } else {
                log::info!("experiment {i_exp} kept {} elites", hof.len());
            }
            populations.push(population);
        }

        Ok(populations)
    }

    /// Collect the state of every experiment for saving.
    pub fn results(&self) -> Vec<ExperimentResult> {
        self.experiments
            .iter()
            .map(|exp| ExperimentResult {
                experiment: exp.cfg.clone(),
                protein: self.cfg.protein.clone(),
                population: exp.engine.population().to_vec(),
                hall_of_fame: exp.engine.hall_of_fame().iter().cloned().collect(),
                history: exp.engine.history().to_vec(),
            })
            .collect()
    }

    /// Save the results of the last run to a new results file and return its index.
    pub fn save_results(&self) -> Result<usize> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {:?}", self.out_dir))?;

        let results_idx = self
            .count_results_files()
            .context("failed to count results files")?;
        let file = self.results_file(results_idx);
        save_results(&file, &self.results()).with_context(|| format!("failed to save {file:?}"))?;
        log::info!("saved {file:?}");

        Ok(results_idx)
    }

    /// Print and emit the simulation files of every hall of fame member
    /// stored in a results file.
    pub fn emit_results(&self, results_idx: usize) -> Result<()> {
        let file = self.results_file(results_idx);
        let results = load_results(&file).with_context(|| format!("failed to load {file:?}"))?;

        for (i_exp, result) in results.iter().enumerate() {
            let genome = Genome::new(result.experiment.genome.clone(), result.protein.clone());
            for (i_hof, ind) in result.hall_of_fame.iter().enumerate() {
                let protein = genome
                    .decode(ind.bits())
                    .with_context(|| format!("failed to decode elite {i_hof} of experiment {i_exp}"))?;
                println!("{protein}");

                let name = format!("results-{results_idx:04}-exp-{i_exp:02}-elite-{i_hof:02}");
                membrane::build(&name, &protein, &self.cfg.membrane, &self.out_dir)
                    .save()
                    .with_context(|| format!("failed to save simulation {name}"))?;
            }
        }

        Ok(())
    }

    /// Remove every file generated in the output directory.
    ///
    /// Only names written by this tool are matched; other files are left alone.
    pub fn clean(&self) -> Result<()> {
        for pattern in [
            "results-*-exp-*-elite-*.data",
            "results-*-exp-*-elite-*.in",
            "ft_*.tsv",
            "results-*.msgpack",
        ] {
            for file in self.glob_out_dir(pattern)? {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }
        Ok(())
    }

    fn count_results_files(&self) -> Result<usize> {
        Ok(self.glob_out_dir("results-*.msgpack")?.len())
    }

    fn glob_out_dir(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.out_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn results_file(&self, results_idx: usize) -> PathBuf {
        self.out_dir.join(format!("results-{results_idx:04}.msgpack"))
    }
}

fn save_results<P: AsRef<Path>>(file: P, results: &[ExperimentResult]) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, results).context("failed to serialize results")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_results<P: AsRef<Path>>(file: P) -> Result<Vec<ExperimentResult>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let results = decode::from_read(&mut reader).context("failed to deserialize results")?;
    Ok(results)
}
