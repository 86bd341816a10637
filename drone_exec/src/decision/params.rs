//! Parameters for the decision engine.
//!
//! Every threshold, speed and gain the engine uses is a named field here
//! rather than a constant in the code, so flight profiles can be swapped by
//! editing `decision.toml` alone.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::pid::PidParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Decision engine parameters, loaded from `decision.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionParams {
    /// Class identifier of the target to follow.
    pub target_class: u32,

    /// Desired stand-off distance to the target in FOLLOW mode, metres.
    pub follow_dist_m: f64,

    /// Sector score below which a band counts as blocked, metres.
    pub safe_dist_m: f64,

    /// Tighter threshold on the centre band's minimum depth, metres. Catches
    /// thin near obstacles that the band mean dilutes.
    pub near_field_dist_m: f64,

    /// Forward speed when the path ahead is clear in SEARCH mode, m/s.
    pub cruise_speed_ms: f64,

    /// Forward speed while avoiding a frontal obstacle, m/s. Non-zero so
    /// the vehicle keeps making progress rather than stalling in place.
    pub creep_speed_ms: f64,

    /// Fixed yaw rate used to turn away from a frontal obstacle, deg/s.
    pub avoid_turn_rate_dps: f64,

    /// Fixed yaw rate used to escape when boxed in on all three sectors,
    /// deg/s. Larger than the avoid rate to break the deadlock quickly.
    pub escape_turn_rate_dps: f64,

    /// Minimum difference between side scores before applying a corridor
    /// centering correction, metres.
    pub corridor_margin_m: f64,

    /// Fixed yaw rate of the corridor centering correction, deg/s.
    pub corridor_turn_rate_dps: f64,

    /// Duration hint stamped on every command, seconds. Must exceed the
    /// expected cycle period so motion is continuous between cycles.
    pub cmd_duration_s: f64,

    /// Distance axis controller (forward speed from distance error).
    pub pid_distance: PidParams,

    /// Lateral axis controller (yaw rate from pixel offset).
    pub pid_lateral: PidParams,

    /// When, if ever, the two PID controllers are reset.
    pub pid_reset_policy: PidResetPolicy,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Policy governing PID state across mode transitions.
///
/// With [`PidResetPolicy::Never`] the integral and previous-error of both
/// axes carry over from the last FOLLOW cycle when the mode switches away
/// and back, which can cause a transient on re-entry. With
/// [`PidResetPolicy::OnModeChange`] both controllers are reset whenever a
/// new mode is entered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidResetPolicy {
    /// Never reset, controller state persists for the life of the loop.
    Never,

    /// Reset both controllers on entry into a new mode.
    OnModeChange,
}
