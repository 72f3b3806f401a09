use clap::Parser;
use log::{error, info, warn};
use std::process;
use temporal_anomaly::config;
use temporal_anomaly::logging;
use temporal_anomaly::scenario::{Scenario, ScenarioConfig};

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = config::DEFAULT_TICKS)]
    ticks: u32,

    /// Seconds of simulated time per tick
    #[arg(long, default_value_t = config::DEFAULT_TICK_SECONDS)]
    dt: f64,

    /// Seed for the random scenario
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of anomalies kept alive in the world
    #[arg(long, default_value_t = config::DEFAULT_ANOMALY_COUNT)]
    anomalies: u32,

    /// Number of wandering entities
    #[arg(long, default_value_t = config::DEFAULT_ENTITY_COUNT)]
    entities: u32,

    /// Side length of the square world the scenario spawns into
    #[arg(long, default_value_t = config::DEFAULT_WORLD_SIZE)]
    world_size: f64,

    /// Debug filter to specify log topics (e.g., "anomaly,collision")
    /// Available topics: anomaly, collision, grid, entity
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let level = logging::parse_level(&args.log_level);
    if let Err(e) = logging::init_logger(level, args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    if let Some(filter) = &args.debug_filter {
        for topic in logging::unknown_topics(filter) {
            warn!(
                "Unknown debug topic '{}'; available topics: {}",
                topic,
                logging::DEBUG_TOPICS.join(", ")
            );
        }
    }

    if !args.dt.is_finite() || args.dt <= 0.0 {
        error!("Tick length must be positive, got {}", args.dt);
        process::exit(2);
    }
    if !args.world_size.is_finite() || args.world_size <= 0.0 {
        error!("World size must be positive, got {}", args.world_size);
        process::exit(2);
    }

    let scenario_config = ScenarioConfig {
        ticks: args.ticks,
        tick_seconds: args.dt,
        seed: args.seed,
        anomalies: args.anomalies,
        entities: args.entities,
        world_size: args.world_size,
    };

    let mut scenario = match Scenario::new(scenario_config) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("Failed to build scenario: {}", e);
            process::exit(1);
        }
    };

    let stats = match scenario.run() {
        Ok(stats) => stats,
        Err(e) => {
            error!("Simulation aborted: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Finished {} ticks: {} anomalies created, {} removed",
        stats.ticks, stats.anomalies_created, stats.anomalies_removed
    );
    info!(
        "{} entity enters, {} exits, {} overlaps, {} combinations",
        stats.entity_enters, stats.entity_exits, stats.overlaps, stats.combinations
    );
    for entity in scenario.entities() {
        let entity = entity.borrow();
        info!(
            "Entity {} local time {:.2}s at {} ({} effects)",
            entity.id, entity.local_time, entity.position, entity.effects_received
        );
    }
}
