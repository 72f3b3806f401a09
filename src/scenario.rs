use crate::anomaly::AnomalyType;
use crate::collision::TemporalCollisionHandler;
use crate::config;
use crate::entity::{EntityHandle, TemporalEntity};
use crate::error::AnomalyError;
use crate::system::TemporalAnomalySystem;
use crate::types::{AnomalyId, Point3};
use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;

const ANOMALY_TYPES: [AnomalyType; 6] = [
    AnomalyType::Rift,
    AnomalyType::Stasis,
    AnomalyType::Dilation,
    AnomalyType::Acceleration,
    AnomalyType::Reversal,
    AnomalyType::Instability,
];

/// Parameters of a randomly generated simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub ticks: u32,
    pub tick_seconds: f64,
    pub seed: u64,
    pub anomalies: u32,
    pub entities: u32,
    pub world_size: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            ticks: config::DEFAULT_TICKS,
            tick_seconds: config::DEFAULT_TICK_SECONDS,
            seed: 0,
            anomalies: config::DEFAULT_ANOMALY_COUNT,
            entities: config::DEFAULT_ENTITY_COUNT,
            world_size: config::DEFAULT_WORLD_SIZE,
        }
    }
}

/// Event counters gathered through the system and handler callbacks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioStats {
    pub ticks: u32,
    pub anomalies_created: u32,
    pub anomalies_removed: u32,
    pub entity_enters: u32,
    pub entity_exits: u32,
    pub overlaps: u32,
    pub combinations: u32,
}

/// A seeded world of wandering entities and short-lived anomalies
pub struct Scenario {
    config: ScenarioConfig,
    rng: StdRng,
    system: Rc<RefCell<TemporalAnomalySystem>>,
    handler: TemporalCollisionHandler,
    entities: Vec<Rc<RefCell<TemporalEntity>>>,
    stats: Rc<RefCell<ScenarioStats>>,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Result<Self, AnomalyError> {
        let rng = StdRng::seed_from_u64(config.seed);
        let system = Rc::new(RefCell::new(TemporalAnomalySystem::new()));
        let mut handler = TemporalCollisionHandler::new(&system);
        let stats = Rc::new(RefCell::new(ScenarioStats::default()));

        {
            let mut system = system.borrow_mut();
            let created = stats.clone();
            system.on_anomaly_created(move |_| created.borrow_mut().anomalies_created += 1);
            let removed = stats.clone();
            system.on_anomaly_removed(move |_| removed.borrow_mut().anomalies_removed += 1);
        }
        let enters = stats.clone();
        handler.on_entity_enter(move |_, _| enters.borrow_mut().entity_enters += 1);
        let exits = stats.clone();
        handler.on_entity_exit(move |_, _| exits.borrow_mut().entity_exits += 1);
        let overlaps = stats.clone();
        handler.on_anomalies_overlap(move |a, b| {
            info!("Anomaly {} overlaps anomaly {}", a, b);
            overlaps.borrow_mut().overlaps += 1;
        });
        let combinations = stats.clone();
        handler.on_anomaly_combination(move |_, _| combinations.borrow_mut().combinations += 1);

        let mut scenario = Scenario {
            config,
            rng,
            system,
            handler,
            entities: Vec::new(),
            stats,
        };
        scenario.spawn_entities();
        for _ in 0..scenario.config.anomalies {
            scenario.spawn_anomaly()?;
        }
        Ok(scenario)
    }

    fn half_world(&self) -> f64 {
        self.config.world_size / 2.0
    }

    fn random_point(&mut self) -> Point3 {
        let half = self.half_world();
        Point3::new(
            self.rng.gen_range(-half..=half),
            0.0,
            self.rng.gen_range(-half..=half),
        )
    }

    fn spawn_entities(&mut self) {
        for id in 1..=self.config.entities {
            let position = self.random_point();
            let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let speed = self.rng.gen_range(0.5..3.0);
            let velocity = Point3::new(heading.cos() * speed, 0.0, heading.sin() * speed);
            let entity = TemporalEntity::new(id, position)
                .with_velocity(velocity)
                .into_handle();
            let handle: EntityHandle = entity.clone();
            self.system.borrow_mut().register_entity(&handle);
            self.entities.push(entity);
        }
    }

    fn spawn_anomaly(&mut self) -> Result<AnomalyId, AnomalyError> {
        let anomaly_type = ANOMALY_TYPES[self.rng.gen_range(0..ANOMALY_TYPES.len())];
        let time_distortion = match anomaly_type {
            AnomalyType::Stasis => self.rng.gen_range(0.0..0.2),
            AnomalyType::Dilation => self.rng.gen_range(0.2..0.9),
            AnomalyType::Acceleration => self.rng.gen_range(1.2..3.0),
            AnomalyType::Reversal => self.rng.gen_range(-2.0..-0.5),
            AnomalyType::Rift => self.rng.gen_range(0.5..2.0),
            AnomalyType::Instability => self.rng.gen_range(0.2..1.0),
        };
        let position = self.random_point();
        let radius = self.rng.gen_range(2.0..8.0);
        let duration = self.rng.gen_range(2.0..10.0);
        self.system
            .borrow_mut()
            .create_anomaly(anomaly_type, time_distortion, position, radius, duration)
    }

    /// Advances the world by one tick
    pub fn step(&mut self) -> Result<(), AnomalyError> {
        let dt = self.config.tick_seconds;
        for entity in &self.entities {
            entity.borrow_mut().begin_tick();
        }

        self.system.borrow_mut().update(dt);
        self.handler.update(dt);

        // Keep the population of anomalies topped up
        let active = self.system.borrow().active_anomaly_count();
        for _ in active..self.config.anomalies as usize {
            self.spawn_anomaly()?;
        }

        let half = self.half_world();
        for entity in &self.entities {
            let mut entity = entity.borrow_mut();
            entity.advance(dt);
            // Bounce off the world edge
            if entity.position.x.abs() > half {
                entity.velocity.x = -entity.velocity.x;
                entity.position.x = entity.position.x.clamp(-half, half);
            }
            if entity.position.z.abs() > half {
                entity.velocity.z = -entity.velocity.z;
                entity.position.z = entity.position.z.clamp(-half, half);
            }
        }

        self.stats.borrow_mut().ticks += 1;
        Ok(())
    }

    /// Runs every configured tick and returns the collected statistics
    pub fn run(&mut self) -> Result<ScenarioStats, AnomalyError> {
        info!(
            "Running {} ticks of {:.4}s with {} entities and {} anomalies",
            self.config.ticks, self.config.tick_seconds, self.config.entities, self.config.anomalies
        );
        for _ in 0..self.config.ticks {
            self.step()?;
        }
        Ok(self.stats())
    }

    pub fn stats(&self) -> ScenarioStats {
        self.stats.borrow().clone()
    }

    pub fn system(&self) -> &Rc<RefCell<TemporalAnomalySystem>> {
        &self.system
    }

    pub fn entities(&self) -> &[Rc<RefCell<TemporalEntity>>] {
        &self.entities
    }
}
