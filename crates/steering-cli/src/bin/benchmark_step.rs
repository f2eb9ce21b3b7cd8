use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::time::{Duration, Instant};
use steering_core::agent::{Agent, AgentParams};
use steering_core::config::SimConfig;
use steering_core::world::World;

fn create_agents(config: &SimConfig, count: usize) -> Vec<Agent> {
    let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
    let [min_x, min_y] = config.world_min;
    let [max_x, max_y] = config.world_max;
    (0..count)
        .map(|i| {
            let pos = [rng.random_range(min_x..max_x), rng.random_range(min_y..max_y)];
            let heading = rng.random_range(0.0..std::f64::consts::TAU);
            Agent::try_new(i as u32, pos, heading, &config.agent).expect("valid agent params")
        })
        .collect()
}

fn run(label: &str, config: &SimConfig, count: usize, steps: u32) {
    let agents = create_agents(config, count);
    let mut world = World::with_agents(config.clone(), agents).expect("valid world");
    let mut grid = Duration::ZERO;
    let mut query = Duration::ZERO;
    let mut steer = Duration::ZERO;
    let mut collide = Duration::ZERO;

    let start = Instant::now();
    for _ in 0..steps {
        let t = world.step(1.0 / 60.0);
        grid += Duration::from_micros(t.grid_build_us);
        query += Duration::from_micros(t.neighbor_query_us);
        steer += Duration::from_micros(t.steering_us);
        collide += Duration::from_micros(t.collision_us);
    }
    let total = start.elapsed();

    println!("{label}: {count} agents, {steps} steps");
    println!("  avg step:      {:?}", total / steps);
    println!("  grid build:    {:?}", grid / steps);
    println!("  neighbor pass: {:?}", query / steps);
    println!("  steering pass: {:?}", steer / steps);
    println!("  collision:     {:?}", collide / steps);
}

fn main() {
    let steps = 60;
    let base = SimConfig {
        world_min: [0.0, 0.0],
        world_max: [500.0, 500.0],
        cells_x: 100,
        cells_z: 100,
        agent: AgentParams {
            radius: 0.5,
            view_distance: 4.0,
            ..AgentParams::default()
        },
        seed: 42,
        ..SimConfig::default()
    };

    for count in [1_000, 10_000, 50_000] {
        run("fine grid", &base, count, steps);
    }

    let coarse = SimConfig {
        cells_x: 10,
        cells_z: 10,
        ..base
    };
    run("coarse grid", &coarse, 10_000, steps);
}
