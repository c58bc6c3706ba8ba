use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use lbm2d::{BoundaryRegime, ParticleConfig, SimConfig, Solver};

/// Headless D2Q9 Lattice Boltzmann runner
#[derive(Parser, Debug)]
#[command(name = "lbm2d", version, about)]
struct Cli {
    /// JSON configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    height: Option<usize>,

    #[arg(long)]
    width: Option<usize>,

    /// Relaxation time
    #[arg(long)]
    tau: Option<f64>,

    /// bounce-back, constant or custom
    #[arg(long)]
    regime: Option<BoundaryRegime>,

    #[arg(long, default_value_t = 1000)]
    ticks: usize,

    /// Log progress every N ticks (0 disables)
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// Seed tracer particles with the default distribution
    #[arg(long)]
    particles: bool,

    #[arg(long, default_value_t = 100.0)]
    velocity_scale: f64,

    /// Keep at most N positions per particle path
    #[arg(long)]
    max_history: Option<usize>,

    /// Write the final state to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Resume from a saved state
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}

fn build_config(cli: &Cli) -> lbm2d::Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(tau) = cli.tau {
        config.tau = tau;
    }
    if let Some(regime) = cli.regime {
        config.regime = regime;
    }
    if cli.particles || cli.max_history.is_some() {
        let particles = config.particles.get_or_insert_with(ParticleConfig::default);
        if cli.max_history.is_some() {
            particles.max_history = cli.max_history;
        }
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> lbm2d::Result<()> {
    let config = build_config(&cli)?;
    let mut solver = match &cli.load {
        Some(path) => {
            let mut solver = Solver::load_json(path, &config)?;
            if solver.particles().is_empty() {
                if let Some(particles) = &config.particles {
                    solver.seed_particles(particles)?;
                }
            }
            solver
        }
        None => Solver::from_config(&config)?,
    };

    if solver.particles().is_empty() {
        let summary = solver.run(cli.ticks, cli.report_every)?;
        info!(
            "{} ticks in {} ms, {} with instabilities",
            summary.ticks, summary.elapsed_ms, summary.unstable_ticks
        );
    } else {
        let mut unstable = 0;
        let mut outcome = Ok(());
        let d = time::Duration::span(|| {
            for tick in 1..=cli.ticks {
                match solver.step() {
                    Ok(report) => {
                        if !report.is_stable() {
                            unstable += 1;
                        }
                    }
                    Err(e) => {
                        error!("tick {} failed", tick);
                        outcome = Err(e);
                        return;
                    }
                }
                solver.advect_particles(cli.velocity_scale);
                if cli.report_every > 0 && tick % cli.report_every == 0 {
                    info!("#{} | integral: {}", solver.iteration(), solver.total_mass());
                }
            }
        });
        outcome?;
        info!(
            "{} ticks in {} ms, {} with instabilities",
            solver.iteration(),
            d.num_milliseconds(),
            unstable
        );
    }

    info!(
        "total mass {:.6} | max |u| {:.6} | {} particles",
        solver.total_mass(),
        solver.max_speed(),
        solver.particles().len()
    );

    if let Some(path) = &cli.save {
        solver.save_json(path)?;
    }
    Ok(())
}
