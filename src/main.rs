mod config;
mod engine;
mod fitness;
mod genome;
mod gray;
mod hall_of_fame;
mod lammps;
mod manager;
mod membrane;
mod model;
mod operators;
mod stats;

use crate::config::Config;
use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run,

    Emit {
        #[arg(long)]
        results_idx: usize,
    },

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = match &args.config {
        Some(file) => Config::from_file(file).context("failed to construct cfg")?,
        None => Config::default(),
    };
    log::info!("{cfg:#?}");

    let mut mgr = Manager::new(&args.out_dir, cfg).context("failed to construct mgr")?;
    log::info!("registered {} experiments", mgr.n_experiments());

    match args.command {
        Command::Run => {
            mgr.run()?;
            let results_idx = mgr.save_results()?;
            mgr.emit_results(results_idx)?;
        }
        Command::Emit { results_idx } => mgr.emit_results(results_idx)?,
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
