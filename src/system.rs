use crate::anomaly::{AnomalyEffect, AnomalyType, TemporalAnomaly};
use crate::entity::{EntityHandle, WeakEntityHandle};
use crate::error::AnomalyError;
use crate::types::{AnomalyId, EntityId, Point3};
use crate::{debug_anomaly, debug_entity};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Listener for anomaly lifecycle events. Listeners run synchronously and must
/// not re-enter the system that invokes them.
pub type AnomalyCallback = Box<dyn FnMut(&TemporalAnomaly)>;

/// Owns every live anomaly and a registry of weak entity handles.
///
/// One `update` per simulation tick advances anomaly lifetimes, applies each
/// anomaly's effect to the entities inside it and drops anomalies that have
/// run out or been deactivated.
pub struct TemporalAnomalySystem {
    anomalies: Vec<TemporalAnomaly>,
    entities: BTreeMap<EntityId, WeakEntityHandle>,
    next_id: AnomalyId,
    elapsed: f64,
    delegate_overlaps: bool,
    on_created: Vec<AnomalyCallback>,
    on_removed: Vec<AnomalyCallback>,
}

impl TemporalAnomalySystem {
    pub fn new() -> Self {
        TemporalAnomalySystem {
            anomalies: Vec::new(),
            entities: BTreeMap::new(),
            next_id: 1,
            elapsed: 0.0,
            delegate_overlaps: false,
            on_created: Vec::new(),
            on_removed: Vec::new(),
        }
    }

    // --- Creation ---

    pub fn create_anomaly(
        &mut self,
        anomaly_type: AnomalyType,
        time_distortion: f64,
        position: Point3,
        radius: f64,
        duration: f64,
    ) -> Result<AnomalyId, AnomalyError> {
        self.create_from_effect(AnomalyEffect::new(
            anomaly_type,
            time_distortion,
            position,
            radius,
            duration,
        ))
    }

    /// Same as `create_anomaly`, with the spatial parameters first
    pub fn create_anomaly_at(
        &mut self,
        position: Point3,
        radius: f64,
        duration: f64,
        anomaly_type: AnomalyType,
        time_distortion: f64,
    ) -> Result<AnomalyId, AnomalyError> {
        self.create_anomaly(anomaly_type, time_distortion, position, radius, duration)
    }

    /// Validates `effect` and starts a new anomaly from it.
    /// Rejected effects are logged and never enter the simulation.
    pub fn create_from_effect(
        &mut self,
        effect: AnomalyEffect,
    ) -> Result<AnomalyId, AnomalyError> {
        if let Err(e) = effect.validate() {
            error!(
                "Rejected {} anomaly at {} (radius {}, duration {}): {}",
                effect.anomaly_type, effect.position, effect.radius, effect.duration, e
            );
            return Err(e);
        }

        let id = self.next_id;
        let Some(next_id) = id.checked_add(1) else {
            error!(
                "Rejected {} anomaly at {}: no anomaly ids left",
                effect.anomaly_type, effect.position
            );
            return Err(AnomalyError::IdSpaceExhausted);
        };
        self.next_id = next_id;
        let anomaly = TemporalAnomaly::new(id, effect);
        info!(
            "Anomaly {} created: {} x{:.2} at {} radius {:.2} for {:.2}s",
            id,
            effect.anomaly_type,
            effect.time_distortion,
            effect.position,
            effect.radius,
            effect.duration
        );
        for callback in self.on_created.iter_mut() {
            callback(&anomaly);
        }
        self.anomalies.push(anomaly);
        Ok(id)
    }

    // --- Simulation ---

    /// Advances the simulation by `dt` seconds
    pub fn update(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            warn!("Ignoring update with invalid delta time {}", dt);
            return;
        }
        self.elapsed += dt;
        self.prune_entities();

        for anomaly in self.anomalies.iter_mut() {
            anomaly.update(dt);
        }

        self.apply_effects(dt);
        self.remove_inactive();
    }

    fn prune_entities(&mut self) {
        let before = self.entities.len();
        self.entities.retain(|_, weak| weak.strong_count() > 0);
        let pruned = before - self.entities.len();
        if pruned > 0 {
            debug_entity!("Pruned {} dropped entities", pruned);
        }
    }

    fn apply_effects(&self, dt: f64) {
        for (&entity_id, weak) in &self.entities {
            let Some(handle) = weak.upgrade() else {
                continue;
            };
            let Ok(position) = handle.try_borrow().map(|e| e.position()) else {
                warn!("Entity {} is borrowed elsewhere; skipping this tick", entity_id);
                continue;
            };

            let containing: Vec<&TemporalAnomaly> = self
                .anomalies
                .iter()
                .filter(|a| a.contains(position))
                .collect();
            if containing.is_empty() {
                continue;
            }
            if self.delegate_overlaps && containing.len() > 1 {
                debug_entity!(
                    "Entity {} inside {} anomalies; leaving it to overlap resolution",
                    entity_id,
                    containing.len()
                );
                continue;
            }

            let Ok(mut entity) = handle.try_borrow_mut() else {
                warn!("Entity {} is borrowed elsewhere; skipping this tick", entity_id);
                continue;
            };
            for anomaly in containing {
                let effect = anomaly.effect_at(position);
                debug_entity!(
                    "Entity {} receives {} x{:.3} from Anomaly {}",
                    entity_id,
                    effect.anomaly_type,
                    effect.time_distortion,
                    anomaly.id()
                );
                entity.apply_temporal_effect(&effect, dt);
            }
        }
    }

    fn remove_inactive(&mut self) {
        let mut removed = Vec::new();
        self.anomalies.retain(|anomaly| {
            if anomaly.is_active() {
                true
            } else {
                removed.push(anomaly.clone());
                false
            }
        });
        for anomaly in &removed {
            self.notify_removed(anomaly);
        }
    }

    fn notify_removed(&mut self, anomaly: &TemporalAnomaly) {
        info!(
            "Anomaly {} removed ({} after {:.2}s)",
            anomaly.id(),
            anomaly.anomaly_type(),
            anomaly.elapsed()
        );
        for callback in self.on_removed.iter_mut() {
            callback(anomaly);
        }
    }

    // --- Queries ---

    pub fn anomalies(&self) -> &[TemporalAnomaly] {
        &self.anomalies
    }

    pub fn active_anomalies(&self) -> Vec<&TemporalAnomaly> {
        self.anomalies.iter().filter(|a| a.is_active()).collect()
    }

    pub fn active_anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|a| a.is_active()).count()
    }

    pub fn find_anomaly(&self, id: AnomalyId) -> Option<&TemporalAnomaly> {
        self.anomalies.iter().find(|a| a.id() == id)
    }

    pub fn is_point_affected(&self, point: Point3) -> bool {
        self.anomalies.iter().any(|a| a.contains(point))
    }

    /// Multiplier on the flow of time at `point`; 1.0 means unaffected.
    /// Every active anomaly containing the point contributes its factor, so an
    /// entity standing there ends the tick with the same time scale.
    pub fn time_distortion_at(&self, point: Point3) -> f64 {
        self.anomalies
            .iter()
            .filter(|a| a.contains(point))
            .map(|a| a.time_factor_at(point))
            .product()
    }

    /// Live entity handles in id order
    pub fn entities(&self) -> Vec<EntityHandle> {
        self.entities.values().filter_map(|weak| weak.upgrade()).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn find_entity(&self, id: EntityId) -> Option<EntityHandle> {
        self.entities.get(&id).and_then(|weak| weak.upgrade())
    }

    /// Total simulated time
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // --- Mutation ---

    /// Marks an anomaly inactive; it is dropped on the next update
    pub fn deactivate_anomaly(&mut self, id: AnomalyId) -> bool {
        match self.anomalies.iter_mut().find(|a| a.id() == id) {
            Some(anomaly) if anomaly.is_active() => {
                anomaly.deactivate();
                debug_anomaly!("Anomaly {} deactivated", id);
                true
            }
            _ => false,
        }
    }

    pub fn remove_anomaly(&mut self, id: AnomalyId) -> bool {
        let Some(index) = self.anomalies.iter().position(|a| a.id() == id) else {
            return false;
        };
        let anomaly = self.anomalies.remove(index);
        self.notify_removed(&anomaly);
        true
    }

    /// Removes every anomaly. Registered entities are kept.
    pub fn clear(&mut self) {
        let removed = std::mem::take(&mut self.anomalies);
        for anomaly in &removed {
            self.notify_removed(anomaly);
        }
    }

    // --- Entities ---

    /// Registers a non-owning reference. A handle with an already registered id replaces it.
    pub fn register_entity(&mut self, entity: &EntityHandle) {
        let Ok(id) = entity.try_borrow().map(|e| e.id()) else {
            error!("Cannot register an entity that is mutably borrowed");
            return;
        };
        if self.entities.insert(id, Rc::downgrade(entity)).is_some() {
            debug_entity!("Entity {} re-registered", id);
        } else {
            debug_entity!("Entity {} registered", id);
        }
    }

    pub fn unregister_entity(&mut self, id: EntityId) -> bool {
        let removed = self.entities.remove(&id).is_some();
        if removed {
            debug_entity!("Entity {} unregistered", id);
        }
        removed
    }

    // --- Callbacks ---

    pub fn on_anomaly_created(&mut self, callback: impl FnMut(&TemporalAnomaly) + 'static) {
        self.on_created.push(Box::new(callback));
    }

    pub fn on_anomaly_removed(&mut self, callback: impl FnMut(&TemporalAnomaly) + 'static) {
        self.on_removed.push(Box::new(callback));
    }

    /// When set, entities inside two or more anomalies are skipped by `update`
    /// so an overlap resolver can apply a single combined effect instead.
    pub fn set_overlap_delegation(&mut self, delegate: bool) {
        self.delegate_overlaps = delegate;
    }

    pub fn delegates_overlaps(&self) -> bool {
        self.delegate_overlaps
    }
}

impl Default for TemporalAnomalySystem {
    fn default() -> Self {
        Self::new()
    }
}
