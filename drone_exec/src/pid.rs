//! # PID controller module
//!
//! This module provides the generic PID feedback primitive used by the
//! decision engine's control axes. Each instance is owned by exactly one
//! axis and carries that axis' integral and derivative history.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and output limits for one PID axis, loaded from the parameter file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Minimum output value. May differ in magnitude from `max_output` to
    /// give an asymmetric response, e.g. braking harder than accelerating.
    pub min_output: f64,

    /// Maximum output value
    pub max_output: f64,
}

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// The integral accumulation.
    ///
    /// Note: the accumulator itself is not clamped, only the summed output
    /// is. Under sustained saturation it will keep growing (windup); the
    /// output clamp is the only bound on the command.
    integral: f64,

    /// Previous error
    prev_error: f64,

    /// Limits applied to the summed output, `(min, max)`.
    output_limits: (f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller from the given parameters.
    pub fn new(params: &PidParams) -> Self {
        Self {
            k_p: params.k_p,
            k_i: params.k_i,
            k_d: params.k_d,
            integral: 0f64,
            prev_error: 0f64,
            output_limits: (params.min_output, params.max_output),
        }
    }

    /// Get the value of the controller for the given error and timestep.
    ///
    /// The caller must guarantee `dt > 0`, the derivative term is undefined
    /// otherwise. The exec floors its measured cycle time to a small positive
    /// value before it reaches this function.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        // Proportional term
        let p = self.k_p * error;

        // Accumulate the integral term
        self.integral += error * dt;
        let i = self.k_i * self.integral;

        // Derivative on the error difference
        let d = self.k_d * (error - self.prev_error) / dt;
        self.prev_error = error;

        // Clamp the summed output
        let (min_out, max_out) = self.output_limits;
        (p + i + d).clamp(min_out, max_out)
    }

    /// Clear the integral accumulation and previous error.
    ///
    /// Must be called by the owner whenever the control context changes
    /// meaning, otherwise stale history carries into the new context.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = 0f64;
    }
}
