//! Velocity command type issued to the vehicle backend.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A body-frame velocity and yaw-rate demand.
///
/// All values are within the configured bounds by the time the command is
/// handed to the backend: the decision engine's PID outputs are clamped, and
/// the fixed SEARCH-mode speeds and turn rates come straight from the
/// parameter file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ControlCommand {
    /// Forward velocity demand in the body frame, m/s, positive forward.
    pub vx_ms: f64,

    /// Lateral velocity demand in the body frame, m/s, positive right.
    pub vy_ms: f64,

    /// Yaw rate demand, deg/s, positive clockwise (turning right).
    pub yaw_rate_dps: f64,

    /// How long the backend should hold the demand if no further command
    /// arrives, in seconds. Set longer than the expected cycle period so
    /// that motion is continuous between cycles.
    pub duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlCommand {
    /// A zero-velocity command, used for the shutdown safe-stop.
    pub fn stop(duration_s: f64) -> Self {
        Self {
            duration_s,
            ..Default::default()
        }
    }
}
