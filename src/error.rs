// Anomaly errors: parameter validation failures raised at creation time

use thiserror::Error;

/// Reasons an anomaly is refused by the system
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    #[error("Anomaly radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("Anomaly duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("Time distortion must be finite")]
    NonFiniteDistortion,
    #[error("Time distortion {0} exceeds the allowed magnitude")]
    DistortionOutOfRange(f64),
    #[error("Anomaly position must be finite")]
    NonFinitePosition,
    #[error("No anomaly ids left to assign")]
    IdSpaceExhausted,
}
