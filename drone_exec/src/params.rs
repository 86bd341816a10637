//! Parameters for the drone executable itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executable-level parameters, loaded from `exec.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneExecParams {
    /// Identifier of the camera to acquire frames from.
    pub camera_id: String,

    /// Flight altitude as a NED z coordinate, metres (negative above
    /// ground).
    pub flight_altitude_m: f64,

    /// Climb speed used to reach the flight altitude after take-off, m/s.
    pub climb_speed_ms: f64,

    /// Velocity smoothing coefficient in (0, 1]. Lower is smoother but
    /// slower to react.
    pub smoothing_alpha: f64,

    /// Floor applied to the measured cycle period, seconds. Guards the PID
    /// derivative against zero or negative wall-clock deltas.
    pub min_dt_s: f64,

    /// Fixed sleep at the end of each cycle for CPU fairness, milliseconds.
    pub cycle_sleep_ms: u64,

    /// JPEG quality (1-100) for frames published to the inference process.
    pub jpeg_quality: u8,

    /// What to do when no new detection batch is pending.
    pub detection_staleness: StalenessPolicy,

    /// Number of consecutive backend receive errors tolerated before the
    /// connection is declared lost and the exec shuts down.
    pub max_consec_backend_errors: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Policy for cycles on which the detection feed has nothing pending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Keep acting on the most recently received batch.
    HoldLast,

    /// Treat the cycle as having no detections, dropping to SEARCH mode
    /// until a fresh batch arrives.
    Drop,
}
