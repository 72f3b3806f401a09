use crate::config;
use crate::error::AnomalyError;
use crate::types::{AnomalyId, Point3, SourceId};
use crate::utils;
use std::fmt;

/// Kinds of time distortion an anomaly can produce.
/// Declaration order matters: the combination fallback ranks later variants higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyType {
    Rift,
    Stasis,
    Dilation,
    Acceleration,
    Reversal,
    Instability,
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnomalyType::Rift => "RIFT",
            AnomalyType::Stasis => "STASIS",
            AnomalyType::Dilation => "DILATION",
            AnomalyType::Acceleration => "ACCELERATION",
            AnomalyType::Reversal => "REVERSAL",
            AnomalyType::Instability => "INSTABILITY",
        };
        f.write_str(name)
    }
}

/// Description of a time distortion centred on a point in space.
///
/// `time_distortion` is the distortion as felt: the anomaly's raw distortion
/// multiplied by `strength`. Effects built with [`AnomalyEffect::new`] carry a
/// strength of 1 and phase 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyEffect {
    pub anomaly_type: AnomalyType,
    pub time_distortion: f64,
    pub position: Point3,
    pub radius: f64,
    pub duration: f64,
    pub source_id: SourceId,
    /// Weight already folded into `time_distortion`
    pub strength: f64,
    /// Oscillation phase of the source, in radians
    pub phase: f64,
}

impl AnomalyEffect {
    pub fn new(
        anomaly_type: AnomalyType,
        time_distortion: f64,
        position: Point3,
        radius: f64,
        duration: f64,
    ) -> Self {
        AnomalyEffect {
            anomaly_type,
            time_distortion,
            position,
            radius,
            duration,
            source_id: crate::types::SYNTHETIC_SOURCE_ID,
            strength: 1.0,
            phase: 0.0,
        }
    }

    /// Checks the parameters an anomaly must satisfy before it may enter a simulation
    pub fn validate(&self) -> Result<(), AnomalyError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(AnomalyError::InvalidRadius(self.radius));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(AnomalyError::InvalidDuration(self.duration));
        }
        if !self.time_distortion.is_finite() {
            return Err(AnomalyError::NonFiniteDistortion);
        }
        if self.time_distortion.abs() > config::MAX_TIME_DISTORTION {
            return Err(AnomalyError::DistortionOutOfRange(self.time_distortion));
        }
        if !self.position.is_finite() {
            return Err(AnomalyError::NonFinitePosition);
        }
        Ok(())
    }

    pub fn contains(&self, point: Point3) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }

    /// Multiplier this effect applies to the flow of time at `point`.
    ///
    /// Rate-changing types blend from 1 towards the raw distortion by
    /// `strength`, so a weightless effect is always neutral. Reversal blends
    /// towards the negated magnitude. Rift oscillates inside its core and
    /// slows time further out; instability oscillates everywhere.
    pub fn time_factor_at(&self, point: Point3) -> f64 {
        let w = self.strength;
        // lerp(1, raw, w) with raw * w already stored in time_distortion
        let felt = self.time_distortion;
        match self.anomaly_type {
            AnomalyType::Stasis | AnomalyType::Dilation | AnomalyType::Acceleration => {
                1.0 + felt - w
            }
            AnomalyType::Reversal => 1.0 - felt.abs() - w,
            AnomalyType::Rift => {
                let normalized = self.position.distance(point) / self.radius;
                if normalized < config::RIFT_CORE_FRACTION {
                    1.0 + self.phase.sin() * felt.abs() * config::RIFT_OSCILLATION
                } else {
                    1.0 - config::RIFT_OUTER_SLOWDOWN * w
                }
            }
            AnomalyType::Instability => {
                1.0 + self.phase.sin() * config::INSTABILITY_AMPLITUDE * w
            }
        }
    }
}

/// A live anomaly: one effect plus its lifetime state
#[derive(Debug, Clone)]
pub struct TemporalAnomaly {
    id: AnomalyId,
    effect: AnomalyEffect,
    remaining_duration: f64,
    elapsed: f64,
    intensity_factor: f64,
    active: bool,
}

impl TemporalAnomaly {
    /// Wraps an already validated effect. The effect's source id is set to `id`.
    pub(crate) fn new(id: AnomalyId, mut effect: AnomalyEffect) -> Self {
        effect.source_id = id as SourceId;
        TemporalAnomaly {
            id,
            remaining_duration: effect.duration,
            effect,
            elapsed: 0.0,
            intensity_factor: 0.0,
            active: true,
        }
    }

    pub fn id(&self) -> AnomalyId {
        self.id
    }

    pub fn effect(&self) -> &AnomalyEffect {
        &self.effect
    }

    pub fn anomaly_type(&self) -> AnomalyType {
        self.effect.anomaly_type
    }

    pub fn position(&self) -> Point3 {
        self.effect.position
    }

    pub fn radius(&self) -> f64 {
        self.effect.radius
    }

    pub fn remaining_duration(&self) -> f64 {
        self.remaining_duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn intensity_factor(&self) -> f64 {
        self.intensity_factor
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the lifetime by `dt` seconds; expired anomalies stay inactive
    pub fn update(&mut self, dt: f64) {
        if !self.active || !dt.is_finite() || dt < 0.0 {
            return;
        }
        self.remaining_duration -= dt;
        self.elapsed += dt;
        if self.remaining_duration <= 0.0 {
            self.remaining_duration = 0.0;
            self.active = false;
        }
        self.intensity_factor = self.compute_intensity();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    // Parabolic envelope: 0 at both ends of the lifetime, 1 at the midpoint
    fn compute_intensity(&self) -> f64 {
        let progress = utils::clamp(self.elapsed / self.effect.duration, 0.0, 1.0);
        utils::clamp(1.0 - (2.0 * progress - 1.0).abs(), 0.0, 1.0)
    }

    /// Oscillation phase in radians, driven by the anomaly's own lifetime
    pub fn phase(&self) -> f64 {
        (self.elapsed * config::PHASE_RATE).rem_euclid(std::f64::consts::TAU)
    }

    pub fn contains(&self, point: Point3) -> bool {
        self.active && self.effect.contains(point)
    }

    /// Distance falloff: 1 at the centre, 0 at the edge and beyond
    pub fn falloff_at(&self, point: Point3) -> f64 {
        let distance = self.effect.position.distance(point);
        utils::smoothstep(self.effect.radius, 0.0, distance)
    }

    /// Current weight of the effect at `point` (intensity times falloff)
    pub fn strength_at(&self, point: Point3) -> f64 {
        if !self.active {
            return 0.0;
        }
        self.intensity_factor * self.falloff_at(point)
    }

    /// The effect as felt at `point`, with its distortion scaled by strength
    pub fn effect_at(&self, point: Point3) -> AnomalyEffect {
        let strength = self.strength_at(point);
        AnomalyEffect {
            time_distortion: self.effect.time_distortion * strength,
            strength,
            phase: self.phase(),
            ..self.effect
        }
    }

    /// Multiplier on the flow of time this anomaly applies at `point`
    pub fn time_factor_at(&self, point: Point3) -> f64 {
        self.effect_at(point).time_factor_at(point)
    }

    /// Whether this anomaly's sphere intersects another's
    pub fn overlaps(&self, other: &TemporalAnomaly) -> bool {
        let reach = self.effect.radius + other.effect.radius;
        self.effect.position.distance_squared(other.effect.position) < reach * reach
    }
}
