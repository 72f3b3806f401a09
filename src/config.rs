//! Configuration constants for the temporal anomaly simulation.

// Anomaly validation
pub const MAX_TIME_DISTORTION: f64 = 100.0; // Largest accepted |time distortion|

// Spatial grid (XZ plane, centred on the origin)
pub const GRID_CELL_SIZE: f64 = 4.0; // World units per cell side
pub const GRID_EXTENT: u32 = 64; // Cells per axis

// Time distortion query shaping
pub const PHASE_RATE: f64 = 6.0; // Radians of phase per second of anomaly lifetime
pub const RIFT_CORE_FRACTION: f64 = 0.3; // Inner part of a rift that oscillates
pub const RIFT_OSCILLATION: f64 = 0.5; // Scale of the rift core oscillation
pub const RIFT_OUTER_SLOWDOWN: f64 = 0.2; // Slowdown at full strength outside the core
pub const INSTABILITY_AMPLITUDE: f64 = 0.4; // Oscillation amplitude of instability

// Combination rules
pub const RIFT_AMPLIFICATION: f64 = 1.2;
pub const STASIS_DAMPING: f64 = 0.8;
pub const OPPOSING_NET_FACTOR: f64 = 0.7;
pub const INSTABILITY_THRESHOLD: f64 = 0.2; // Net distortion below this destabilises
pub const INSTABILITY_DISTORTION: f64 = 0.3;
pub const REVERSAL_RIFT_FACTOR: f64 = 1.3;
pub const DOUBLE_REVERSAL_DISTORTION: f64 = 1.5;
pub const SAME_TYPE_AMPLIFICATION: f64 = 1.2;

// Simulation defaults (binary)
pub const DEFAULT_TICKS: u32 = 600;
pub const DEFAULT_TICK_SECONDS: f64 = 1.0 / 60.0;
pub const DEFAULT_ANOMALY_COUNT: u32 = 6;
pub const DEFAULT_ENTITY_COUNT: u32 = 24;
pub const DEFAULT_WORLD_SIZE: f64 = 40.0; // Scenario spawns inside +/- half of this

/// Shape of the uniform spatial grid used for broad-phase collision checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub cell_size: f64,
    pub extent: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            cell_size: GRID_CELL_SIZE,
            extent: GRID_EXTENT,
        }
    }
}
