//! Entity/anomaly containment tracking and overlap resolution.
//!
//! The handler keeps only a weak reference to the anomaly system. Each tick it
//! rebuilds a spatial grid, reports entities entering and leaving anomalies,
//! reports anomalies that start overlapping, and applies one combined effect
//! to every entity that sits inside several anomalies at once.

use crate::anomaly::TemporalAnomaly;
use crate::combination::{self, CombinedAnomalyEffect};
use crate::config::GridConfig;
use crate::debug_collision;
use crate::entity::EntityHandle;
use crate::grid::SpatialGrid;
use crate::system::TemporalAnomalySystem;
use crate::types::{AnomalyId, EntityId, Point3};
use log::{error, warn};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

pub type EntityAnomalyCallback = Box<dyn FnMut(EntityId, AnomalyId)>;
pub type OverlapCallback = Box<dyn FnMut(AnomalyId, AnomalyId)>;
pub type CombinationCallback = Box<dyn FnMut(&[AnomalyId], &CombinedAnomalyEffect)>;

/// Combined effect of one overlapping anomaly pair, recomputed every tick
#[derive(Debug, Clone, PartialEq)]
pub struct PairCombination {
    pub anomalies: (AnomalyId, AnomalyId),
    pub combined: CombinedAnomalyEffect,
}

pub struct TemporalCollisionHandler {
    system: Option<Weak<RefCell<TemporalAnomalySystem>>>,
    grid: SpatialGrid,
    entity_anomalies: BTreeMap<EntityId, BTreeSet<AnomalyId>>,
    overlapping: BTreeSet<(AnomalyId, AnomalyId)>,
    combinations: Vec<PairCombination>,
    on_enter: Vec<EntityAnomalyCallback>,
    on_exit: Vec<EntityAnomalyCallback>,
    on_overlap: Vec<OverlapCallback>,
    on_combination: Vec<CombinationCallback>,
}

// Tracked entity for one tick
struct EntitySample {
    id: EntityId,
    position: Point3,
    handle: EntityHandle,
}

impl TemporalCollisionHandler {
    /// Attaches to `system` and takes over effect application for overlap regions
    pub fn new(system: &Rc<RefCell<TemporalAnomalySystem>>) -> Self {
        Self::with_grid(system, GridConfig::default())
    }

    pub fn with_grid(system: &Rc<RefCell<TemporalAnomalySystem>>, grid: GridConfig) -> Self {
        match system.try_borrow_mut() {
            Ok(mut system) => system.set_overlap_delegation(true),
            Err(_) => error!("Anomaly system is borrowed; overlap delegation not enabled"),
        }
        let mut handler = Self::detached();
        handler.system = Some(Rc::downgrade(system));
        handler.grid = SpatialGrid::new(grid);
        handler
    }

    /// A handler with no anomaly system. Every operation logs an error and does nothing.
    pub fn detached() -> Self {
        TemporalCollisionHandler {
            system: None,
            grid: SpatialGrid::default(),
            entity_anomalies: BTreeMap::new(),
            overlapping: BTreeSet::new(),
            combinations: Vec::new(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
            on_overlap: Vec::new(),
            on_combination: Vec::new(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.system.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    fn system(&self) -> Option<Rc<RefCell<TemporalAnomalySystem>>> {
        let system = self.system.as_ref().and_then(|weak| weak.upgrade());
        if system.is_none() {
            error!("Temporal collision handler has no anomaly system");
        }
        system
    }

    /// Runs collision detection and overlap resolution for one tick of `dt` seconds.
    /// Call after the anomaly system's own update.
    pub fn update(&mut self, dt: f64) {
        let Some(system) = self.system() else {
            return;
        };
        let Ok(system) = system.try_borrow() else {
            error!("Anomaly system is mutably borrowed; skipping collision update");
            return;
        };

        let anomalies: BTreeMap<AnomalyId, &TemporalAnomaly> = system
            .anomalies()
            .iter()
            .filter(|a| a.is_active())
            .map(|a| (a.id(), a))
            .collect();
        let samples: Vec<EntitySample> = system
            .entities()
            .into_iter()
            .filter_map(|handle| {
                let (id, position) = {
                    let entity = handle.try_borrow().ok()?;
                    (entity.id(), entity.position())
                };
                Some(EntitySample {
                    id,
                    position,
                    handle,
                })
            })
            .collect();

        self.rebuild_grid(&anomalies, &samples);

        let positions: BTreeMap<EntityId, Point3> =
            samples.iter().map(|s| (s.id, s.position)).collect();
        let current = self.detect_containment(&anomalies, &positions);
        self.report_transitions(&current);

        let overlapping = self.detect_overlaps(&anomalies);
        self.report_overlaps(&overlapping, &anomalies);

        for sample in &samples {
            if let Some(contained) = current.get(&sample.id) {
                if contained.len() > 1 {
                    self.resolve_entity_overlap(sample, contained, &anomalies, dt);
                }
            }
        }

        self.entity_anomalies = current;
        self.overlapping = overlapping;
    }

    fn rebuild_grid(
        &mut self,
        anomalies: &BTreeMap<AnomalyId, &TemporalAnomaly>,
        samples: &[EntitySample],
    ) {
        self.grid.clear();
        for anomaly in anomalies.values() {
            self.grid
                .insert_anomaly(anomaly.id(), anomaly.position(), anomaly.radius());
        }
        for sample in samples {
            self.grid.insert_entity(sample.id, sample.position);
        }
    }

    fn detect_containment(
        &self,
        anomalies: &BTreeMap<AnomalyId, &TemporalAnomaly>,
        positions: &BTreeMap<EntityId, Point3>,
    ) -> BTreeMap<EntityId, BTreeSet<AnomalyId>> {
        let mut current: BTreeMap<EntityId, BTreeSet<AnomalyId>> = BTreeMap::new();
        for (entity_id, anomaly_id) in self.grid.entity_anomaly_pairs() {
            let (Some(position), Some(anomaly)) =
                (positions.get(&entity_id), anomalies.get(&anomaly_id))
            else {
                continue;
            };
            if anomaly.contains(*position) {
                current.entry(entity_id).or_default().insert(anomaly_id);
            }
        }
        current
    }

    fn report_transitions(&mut self, current: &BTreeMap<EntityId, BTreeSet<AnomalyId>>) {
        let empty = BTreeSet::new();
        let mut entered = Vec::new();
        let mut exited = Vec::new();

        for (&entity_id, now) in current {
            let before = self.entity_anomalies.get(&entity_id).unwrap_or(&empty);
            entered.extend(now.difference(before).map(|&a| (entity_id, a)));
        }
        for (&entity_id, before) in &self.entity_anomalies {
            let now = current.get(&entity_id).unwrap_or(&empty);
            exited.extend(before.difference(now).map(|&a| (entity_id, a)));
        }

        for (entity_id, anomaly_id) in entered {
            debug_collision!("Entity {} entered Anomaly {}", entity_id, anomaly_id);
            for callback in self.on_enter.iter_mut() {
                callback(entity_id, anomaly_id);
            }
        }
        for (entity_id, anomaly_id) in exited {
            debug_collision!("Entity {} exited Anomaly {}", entity_id, anomaly_id);
            for callback in self.on_exit.iter_mut() {
                callback(entity_id, anomaly_id);
            }
        }
    }

    fn detect_overlaps(
        &self,
        anomalies: &BTreeMap<AnomalyId, &TemporalAnomaly>,
    ) -> BTreeSet<(AnomalyId, AnomalyId)> {
        self.grid
            .anomaly_pairs()
            .into_iter()
            .filter(|(a, b)| match (anomalies.get(a), anomalies.get(b)) {
                (Some(first), Some(second)) => first.overlaps(second),
                _ => false,
            })
            .collect()
    }

    fn report_overlaps(
        &mut self,
        overlapping: &BTreeSet<(AnomalyId, AnomalyId)>,
        anomalies: &BTreeMap<AnomalyId, &TemporalAnomaly>,
    ) {
        self.combinations.clear();
        for &(a, b) in overlapping {
            if !self.overlapping.contains(&(a, b)) {
                debug_collision!("Anomaly {} began overlapping anomaly {}", a, b);
                for callback in self.on_overlap.iter_mut() {
                    callback(a, b);
                }
            }

            let (Some(first), Some(second)) = (anomalies.get(&a), anomalies.get(&b)) else {
                continue;
            };
            let combined = combination::combine_pair(first.effect(), second.effect());
            for callback in self.on_combination.iter_mut() {
                callback(&[a, b], &combined);
            }
            self.combinations.push(PairCombination {
                anomalies: (a, b),
                combined,
            });
        }
    }

    // Folds every anomaly containing the entity (ascending id) and applies the result once
    fn resolve_entity_overlap(
        &mut self,
        sample: &EntitySample,
        contained: &BTreeSet<AnomalyId>,
        anomalies: &BTreeMap<AnomalyId, &TemporalAnomaly>,
        dt: f64,
    ) {
        let sources: Vec<&TemporalAnomaly> =
            contained.iter().filter_map(|id| anomalies.get(id).copied()).collect();
        let Some(combined) = combination::combine_all(sources.iter().map(|a| a.effect())) else {
            return;
        };

        let count = sources.len() as f64;
        let weight = sources.iter().map(|a| a.strength_at(sample.position)).sum::<f64>() / count;
        let centroid = sources
            .iter()
            .fold(Point3::zero(), |acc, a| acc + a.position() * (1.0 / count));
        let radius = sources.iter().map(|a| a.radius()).fold(f64::INFINITY, f64::min);
        let phase = sources.iter().map(|a| a.phase()).sum::<f64>() / count;

        let mut effect = combined.to_effect(centroid, radius, dt);
        effect.time_distortion *= weight;
        effect.strength = weight;
        effect.phase = phase;

        let ids: Vec<AnomalyId> = contained.iter().copied().collect();
        for callback in self.on_combination.iter_mut() {
            callback(&ids, &combined);
        }

        match sample.handle.try_borrow_mut() {
            Ok(mut entity) => {
                debug_collision!(
                    "Entity {} receives combined {} x{:.3} from {:?}",
                    sample.id,
                    effect.anomaly_type,
                    effect.time_distortion,
                    ids
                );
                entity.apply_temporal_effect(&effect, dt);
            }
            Err(_) => warn!("Entity {} is borrowed elsewhere; combined effect skipped", sample.id),
        }
    }

    // --- Queries ---

    /// Anomalies that contained the entity at the last update
    pub fn entity_anomalies(&self, entity_id: EntityId) -> Vec<AnomalyId> {
        if self.system.is_none() {
            error!("Temporal collision handler has no anomaly system");
            return Vec::new();
        }
        self.entity_anomalies
            .get(&entity_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_entity_in_anomaly(&self, entity_id: EntityId, anomaly_id: AnomalyId) -> bool {
        self.entity_anomalies
            .get(&entity_id)
            .is_some_and(|set| set.contains(&anomaly_id))
    }

    pub fn overlapping_pairs(&self) -> Vec<(AnomalyId, AnomalyId)> {
        self.overlapping.iter().copied().collect()
    }

    pub fn combinations(&self) -> &[PairCombination] {
        &self.combinations
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    // --- Callbacks ---

    pub fn on_entity_enter(&mut self, callback: impl FnMut(EntityId, AnomalyId) + 'static) {
        self.on_enter.push(Box::new(callback));
    }

    pub fn on_entity_exit(&mut self, callback: impl FnMut(EntityId, AnomalyId) + 'static) {
        self.on_exit.push(Box::new(callback));
    }

    pub fn on_anomalies_overlap(&mut self, callback: impl FnMut(AnomalyId, AnomalyId) + 'static) {
        self.on_overlap.push(Box::new(callback));
    }

    pub fn on_anomaly_combination(
        &mut self,
        callback: impl FnMut(&[AnomalyId], &CombinedAnomalyEffect) + 'static,
    ) {
        self.on_combination.push(Box::new(callback));
    }
}

impl Drop for TemporalCollisionHandler {
    // Hand overlap regions back to the system once nobody resolves them
    fn drop(&mut self) {
        let Some(system) = self.system.as_ref().and_then(|weak| weak.upgrade()) else {
            return;
        };
        match system.try_borrow_mut() {
            Ok(mut system) => system.set_overlap_delegation(false),
            Err(_) => error!("Anomaly system is borrowed; overlap delegation left enabled"),
        }
    }
}
