//! Temporal anomaly simulation: localized regions of space that bend the flow
//! of time for the entities inside them, with grid-accelerated overlap
//! detection and rule-based combination of overlapping effects.

pub mod anomaly;
pub mod collision;
pub mod combination;
pub mod config;
pub mod entity;
pub mod error;
pub mod grid;
pub mod logging;
pub mod scenario;
pub mod system;
pub mod types;
pub mod utils;

pub use anomaly::{AnomalyEffect, AnomalyType, TemporalAnomaly};
pub use collision::TemporalCollisionHandler;
pub use combination::CombinedAnomalyEffect;
pub use entity::{AffectedEntity, EntityHandle, TemporalEntity};
pub use error::AnomalyError;
pub use system::TemporalAnomalySystem;
pub use types::{AnomalyId, EntityId, Point3};
