use crate::anomaly::AnomalyEffect;
use crate::types::{EntityId, Point3};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Anything whose flow of time can be bent by an anomaly.
///
/// The anomaly system never owns implementers; it keeps weak handles and looks
/// them up by id each tick.
pub trait AffectedEntity {
    /// Stable identifier, unique among registered entities
    fn id(&self) -> EntityId;

    /// Current world position
    fn position(&self) -> Point3;

    /// Receives an effect (already scaled for this entity) for a tick of `dt` seconds
    fn apply_temporal_effect(&mut self, effect: &AnomalyEffect, dt: f64);
}

/// Shared handle owned by whoever created the entity
pub type EntityHandle = Rc<RefCell<dyn AffectedEntity>>;

/// Non-owning handle kept by the anomaly system
pub type WeakEntityHandle = Weak<RefCell<dyn AffectedEntity>>;

/// Simple moving body with its own local clock
#[derive(Debug, Clone)]
pub struct TemporalEntity {
    pub id: EntityId,
    pub position: Point3,
    pub velocity: Point3,
    pub time_scale: f64,
    pub local_time: f64,
    pub last_effect: Option<AnomalyEffect>,
    pub effects_received: u32,
}

impl TemporalEntity {
    pub fn new(id: EntityId, position: Point3) -> Self {
        TemporalEntity {
            id,
            position,
            velocity: Point3::zero(),
            time_scale: 1.0,
            local_time: 0.0,
            last_effect: None,
            effects_received: 0,
        }
    }

    pub fn with_velocity(mut self, velocity: Point3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Wraps the entity in the shared handle the anomaly system expects
    pub fn into_handle(self) -> Rc<RefCell<TemporalEntity>> {
        Rc::new(RefCell::new(self))
    }

    /// Resets per-tick state. Call before the anomaly system updates.
    pub fn begin_tick(&mut self) {
        self.time_scale = 1.0;
        self.last_effect = None;
    }

    /// Moves the entity and its local clock by `dt` of world time, scaled by its time scale
    pub fn advance(&mut self, dt: f64) {
        let local_dt = dt * self.time_scale;
        self.position = self.position + self.velocity * local_dt;
        self.local_time += local_dt;
    }
}

impl AffectedEntity for TemporalEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Point3 {
        self.position
    }

    fn apply_temporal_effect(&mut self, effect: &AnomalyEffect, _dt: f64) {
        self.time_scale *= effect.time_factor_at(self.position);
        self.last_effect = Some(*effect);
        self.effects_received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyType;
    use assert_approx_eq::assert_approx_eq;

    fn effect(anomaly_type: AnomalyType, time_distortion: f64) -> AnomalyEffect {
        AnomalyEffect::new(anomaly_type, time_distortion, Point3::zero(), 1.0, 1.0)
    }

    fn factor(effect: &AnomalyEffect) -> f64 {
        let mut entity = TemporalEntity::new(1, Point3::zero());
        entity.apply_temporal_effect(effect, 0.1);
        entity.time_scale
    }

    #[test]
    fn test_zero_weight_effects_are_neutral() {
        for kind in [
            AnomalyType::Dilation,
            AnomalyType::Stasis,
            AnomalyType::Acceleration,
            AnomalyType::Rift,
            AnomalyType::Instability,
            AnomalyType::Reversal,
        ] {
            let weightless = AnomalyEffect {
                time_distortion: 0.0,
                strength: 0.0,
                ..effect(kind, 0.5)
            };
            assert_approx_eq!(factor(&weightless), 1.0);
        }
    }

    #[test]
    fn test_full_strength_distortion_is_the_time_scale() {
        assert_approx_eq!(factor(&effect(AnomalyType::Stasis, 0.1)), 0.1);
        assert_approx_eq!(factor(&effect(AnomalyType::Dilation, 0.5)), 0.5);
        assert_approx_eq!(factor(&effect(AnomalyType::Acceleration, 2.0)), 2.0);
        assert_approx_eq!(factor(&effect(AnomalyType::Reversal, -1.0)), -1.0);
    }

    #[test]
    fn test_stronger_dilation_slows_more() {
        let single = factor(&effect(AnomalyType::Dilation, 0.5));
        let combined = factor(&effect(AnomalyType::Dilation, 0.5 * 0.6));
        assert!(combined < single);
    }

    #[test]
    fn test_apply_effect_records_and_scales() {
        let mut entity = TemporalEntity::new(3, Point3::zero());
        entity.apply_temporal_effect(&effect(AnomalyType::Acceleration, 2.0), 0.1);
        assert_approx_eq!(entity.time_scale, 2.0);
        assert_eq!(entity.effects_received, 1);
        assert!(entity.last_effect.is_some());

        entity.begin_tick();
        assert_approx_eq!(entity.time_scale, 1.0);
        assert!(entity.last_effect.is_none());
        assert_eq!(entity.effects_received, 1);
    }

    #[test]
    fn test_advance_uses_time_scale() {
        let mut entity =
            TemporalEntity::new(1, Point3::zero()).with_velocity(Point3::new(2.0, 0.0, 0.0));
        entity.time_scale = 0.5;
        entity.advance(1.0);
        assert_approx_eq!(entity.position.x, 1.0);
        assert_approx_eq!(entity.local_time, 0.5);

        entity.time_scale = -1.0;
        entity.advance(0.25);
        assert_approx_eq!(entity.local_time, 0.25);
        assert_approx_eq!(entity.position.x, 0.5);
    }
}
