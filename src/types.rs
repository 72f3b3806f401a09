use crate::utils::lerp_f64;
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Identifier assigned to an anomaly by its owning system
pub type AnomalyId = u32;

/// Identifier exposed by an affected entity
pub type EntityId = u32;

/// Source of an effect; negative for synthetic (combined) effects
pub type SourceId = i64;

pub const SYNTHETIC_SOURCE_ID: SourceId = -1;

/// Point in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Point3 { x, y, z }
    }

    pub const fn zero() -> Self {
        Point3::new(0.0, 0.0, 0.0)
    }

    pub fn distance_squared(&self, other: Point3) -> f64 {
        let d = *self - other;
        d.x * d.x + d.y * d.y + d.z * d.z
    }

    pub fn distance(&self, other: Point3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn lerp(&self, other: Point3, alpha: f64) -> Point3 {
        Point3::new(
            lerp_f64(self.x, other.x, alpha),
            lerp_f64(self.y, other.y, alpha),
            lerp_f64(self.z, other.z, alpha),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
