use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use steering_core::config::SimConfig;
use steering_core::world::World;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run a headless steering simulation and print a JSON run summary.
#[derive(Parser, Debug)]
#[command(name = "steering", version)]
struct Cli {
    /// JSON config file; missing fields fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Override the number of spawned agents.
    #[arg(long)]
    agents: Option<usize>,
    #[arg(long, default_value_t = 600)]
    steps: usize,
    /// Seconds per step.
    #[arg(long, default_value_t = 0.02)]
    dt: f64,
    #[arg(long, default_value_t = 60)]
    sample_every: usize,
    /// Include final per-agent frames in the summary.
    #[arg(long)]
    frames: bool,
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SimConfig::from_json_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig {
            initial_agents: 1000,
            ..SimConfig::default()
        },
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(agents) = cli.agents {
        config.initial_agents = agents;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        agents = config.initial_agents,
        cells_x = config.cells_x,
        cells_z = config.cells_z,
        seed = config.seed,
        "starting simulation"
    );

    let mut world = World::try_new(config).context("initializing world")?;
    let mut summary = world
        .try_run_experiment(cli.steps, cli.dt, cli.sample_every)
        .context("running experiment")?;
    if cli.frames {
        summary.final_frames = world.agent_frames();
    }
    info!(
        steps = summary.steps,
        final_agents = summary.final_agent_count,
        "simulation finished"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}
