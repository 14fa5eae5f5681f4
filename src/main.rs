mod simulation;

use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(name = "urban_sim")]
#[command(about = "Headless urban traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "2000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Log a world summary every N ticks (0 disables)
    #[arg(long, default_value = "100")]
    summary_every: u32,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    info!(
        "Running urban traffic simulation: ticks={}, delta={}s, seed={:?}",
        cli.ticks, cli.delta, cli.seed
    );

    let mut world = simulation::SimWorld::create_demo_world(cli.seed);

    for tick in 1..=cli.ticks {
        world.tick(cli.delta);
        if cli.summary_every > 0 && tick % cli.summary_every == 0 {
            info!("{}", world.summary());
        }
    }

    world.log_final_stats();
}
