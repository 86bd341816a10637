//! # Command smoother module
//!
//! Exponential low-pass filtering of the commanded velocity, plus the
//! body-to-world frame rotation used when the backend actuates in world
//! frame. Smoothing keeps the vehicle from twitching when the decision
//! engine's raw output jumps between cycles (mode switches, detection
//! jitter); the yaw rate passes through unfiltered.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

// Internal
use crate::cmd::ControlCommand;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Exponential low-pass filter over the two velocity axes.
///
/// State persists for the life of the control loop and is only cleared by
/// [`CmdSmoother::reset`] at loop (re)initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct CmdSmoother {
    /// Filter coefficient in (0, 1]. 1 disables smoothing entirely; small
    /// values react slowly but fly smoothly.
    alpha: f64,

    /// Smoothed forward velocity, m/s
    vx_ms: f64,

    /// Smoothed lateral velocity, m/s
    vy_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CmdSmoother {
    /// Create a new smoother with zeroed state.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            vx_ms: 0.0,
            vy_ms: 0.0,
        }
    }

    /// Filter the velocity axes of the given command.
    ///
    /// Applies `smoothed = alpha * target + (1 - alpha) * smoothed`
    /// independently per axis and returns the command with the filtered
    /// velocities substituted.
    pub fn apply(&mut self, cmd: &ControlCommand) -> ControlCommand {
        self.vx_ms = self.alpha * cmd.vx_ms + (1.0 - self.alpha) * self.vx_ms;
        self.vy_ms = self.alpha * cmd.vy_ms + (1.0 - self.alpha) * self.vy_ms;

        ControlCommand {
            vx_ms: self.vx_ms,
            vy_ms: self.vy_ms,
            ..*cmd
        }
    }

    /// Zero the filter state.
    pub fn reset(&mut self) {
        self.vx_ms = 0.0;
        self.vy_ms = 0.0;
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotate a body-frame velocity into the world frame.
///
/// `yaw_rad` is the vehicle's current yaw as reported by the backend,
/// measured anticlockwise from the world x axis.
pub fn body_to_world(vx_body: f64, vy_body: f64, yaw_rad: f64) -> (f64, f64) {
    let world = Rotation2::new(yaw_rad) * Vector2::new(vx_body, vy_body);
    (world[0], world[1])
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_convergence() {
        // From zeroed state, N applications of a constant target v converge
        // as v * (1 - (1 - alpha)^N)
        for &alpha in &[0.2, 0.4, 1.0] {
            let mut smoother = CmdSmoother::new(alpha);
            let target = ControlCommand {
                vx_ms: 3.0,
                vy_ms: -1.5,
                yaw_rate_dps: 10.0,
                duration_s: 1.0,
            };

            let mut out = ControlCommand::default();
            let n = 8;
            for _ in 0..n {
                out = smoother.apply(&target);
            }

            let factor = 1.0 - (1.0 - alpha).powi(n);
            assert!((out.vx_ms - 3.0 * factor).abs() < 1e-12);
            assert!((out.vy_ms - -1.5 * factor).abs() < 1e-12);

            // Yaw rate and duration pass through untouched
            assert_eq!(out.yaw_rate_dps, 10.0);
            assert_eq!(out.duration_s, 1.0);
        }
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut smoother = CmdSmoother::new(0.4);
        smoother.apply(&ControlCommand {
            vx_ms: 5.0,
            vy_ms: 5.0,
            yaw_rate_dps: 0.0,
            duration_s: 1.0,
        });

        smoother.reset();
        let out = smoother.apply(&ControlCommand::default());
        assert_eq!(out.vx_ms, 0.0);
        assert_eq!(out.vy_ms, 0.0);
    }

    #[test]
    fn test_body_to_world() {
        // Zero yaw: identity
        let (vx, vy) = body_to_world(2.0, 1.0, 0.0);
        assert!((vx - 2.0).abs() < 1e-12);
        assert!((vy - 1.0).abs() < 1e-12);

        // Quarter turn: forward becomes +y
        let (vx, vy) = body_to_world(2.0, 0.0, FRAC_PI_2);
        assert!(vx.abs() < 1e-12);
        assert!((vy - 2.0).abs() < 1e-12);

        // Half turn: forward becomes -x
        let (vx, vy) = body_to_world(2.0, 0.0, std::f64::consts::PI);
        assert!((vx + 2.0).abs() < 1e-12);
        assert!(vy.abs() < 1e-12);
    }
}
