//! # Control cycle state
//!
//! This module holds the per-cycle state of the control loop: cycle timing,
//! the detection staleness policy, the decision engine and smoother, and the
//! previous command used for the watchdog heartbeat. The executable's main
//! loop owns the network clients and feeds their data through
//! [`ControlExec`], which keeps the control semantics testable without any
//! transport.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Instant;

// Internal
use crate::{
    cmd::ControlCommand,
    decision::{DecisionEngine, DecisionParams, StatusReport},
    params::{DroneExecParams, StalenessPolicy},
    smoother::{self, CmdSmoother},
};
use vision_if::{det::DetectionBatch, frame::DepthMap};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cycle-persistent state of the control loop.
pub struct ControlExec {
    params: DroneExecParams,

    /// The dual-mode decision engine.
    engine: DecisionEngine,

    /// Velocity low-pass filter, state lives as long as the loop.
    smoother: CmdSmoother,

    /// Smoothed body-frame command issued on the previous cycle.
    last_cmd: ControlCommand,

    /// World-frame velocities issued on the previous cycle, kept so the
    /// heartbeat can re-issue them without querying yaw again.
    last_world: (f64, f64),

    /// Detection batch held over under the hold-last staleness policy.
    held_batch: Option<DetectionBatch>,

    /// Start instant of the previous cycle.
    prev_cycle_start: Option<Instant>,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Copy)]
pub struct CycleOutput {
    /// The smoothed body-frame command.
    pub cmd: ControlCommand,

    /// World-frame forward velocity after rotation by the vehicle yaw, m/s.
    pub vx_world_ms: f64,

    /// World-frame lateral velocity after rotation by the vehicle yaw, m/s.
    pub vy_world_ms: f64,

    /// The decision engine's report for this cycle.
    pub report: StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlExec {
    /// Create the control state from the loaded parameters.
    pub fn new(params: DroneExecParams, decision_params: DecisionParams) -> Self {
        let initial_cmd = ControlCommand::stop(decision_params.cmd_duration_s);
        let smoother = CmdSmoother::new(params.smoothing_alpha);

        Self {
            params,
            engine: DecisionEngine::new(decision_params),
            smoother,
            last_cmd: initial_cmd,
            last_world: (0.0, 0.0),
            held_batch: None,
            prev_cycle_start: None,
        }
    }

    /// Identifier of the camera to acquire frames from.
    pub fn camera_id(&self) -> &str {
        &self.params.camera_id
    }

    /// Mark the start of a cycle and return the elapsed time since the
    /// previous cycle start.
    ///
    /// The result is floored at the configured minimum so that clock
    /// anomalies (and the very first cycle, which has no predecessor) can
    /// never produce a non-positive timestep for the PID derivative.
    pub fn cycle_start(&mut self, now: Instant) -> f64 {
        let dt = match self.prev_cycle_start {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.prev_cycle_start = Some(now);

        dt.max(self.params.min_dt_s)
    }

    /// The command to re-issue as the watchdog heartbeat.
    ///
    /// This is the previous cycle's command (a zero-velocity hover before
    /// the first cycle completes), issued before any heavy work so that the
    /// backend's command timeout is refreshed even if acquisition or
    /// inference stalls.
    pub fn heartbeat(&self) -> (f64, f64, ControlCommand) {
        (self.last_world.0, self.last_world.1, self.last_cmd)
    }

    /// Run the decision, smoothing and frame transform for one cycle.
    ///
    /// `polled` is the newest batch drained from the detection feed this
    /// cycle, or `None` if nothing was pending, in which case the staleness
    /// policy decides between re-using the held batch and degrading to
    /// SEARCH. `yaw_rad` is the vehicle's current yaw used for the
    /// body-to-world rotation.
    pub fn process(
        &mut self,
        depth: &DepthMap,
        polled: Option<DetectionBatch>,
        dt: f64,
        yaw_rad: f64,
    ) -> CycleOutput {
        // Apply the staleness policy
        if polled.is_some() {
            self.held_batch = polled;
        } else if self.params.detection_staleness == StalenessPolicy::Drop {
            self.held_batch = None;
        }

        let detections: &[_] = match &self.held_batch {
            Some(batch) => &batch.detections,
            None => &[],
        };

        let (raw_cmd, report) = self.engine.step(depth, detections, dt);
        let cmd = self.smoother.apply(&raw_cmd);

        let (vx_world_ms, vy_world_ms) = smoother::body_to_world(cmd.vx_ms, cmd.vy_ms, yaw_rad);

        self.last_cmd = cmd;
        self.last_world = (vx_world_ms, vy_world_ms);

        CycleOutput {
            cmd,
            vx_world_ms,
            vy_world_ms,
            report,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decision::{Mode, PidResetPolicy};
    use crate::pid::PidParams;
    use std::time::Duration;
    use vision_if::det::{BoundingBox, Detection};

    fn exec_params(staleness: StalenessPolicy) -> DroneExecParams {
        DroneExecParams {
            camera_id: "0".into(),
            flight_altitude_m: -2.5,
            climb_speed_ms: 1.0,
            smoothing_alpha: 0.4,
            min_dt_s: 0.01,
            cycle_sleep_ms: 10,
            jpeg_quality: 80,
            detection_staleness: staleness,
            max_consec_backend_errors: 5,
        }
    }

    fn decision_params() -> DecisionParams {
        DecisionParams {
            target_class: 1,
            follow_dist_m: 5.0,
            safe_dist_m: 4.0,
            near_field_dist_m: 2.0,
            cruise_speed_ms: 4.0,
            creep_speed_ms: 0.5,
            avoid_turn_rate_dps: 20.0,
            escape_turn_rate_dps: 30.0,
            corridor_margin_m: 2.0,
            corridor_turn_rate_dps: 5.0,
            cmd_duration_s: 1.0,
            pid_distance: PidParams {
                k_p: 0.8,
                k_i: 0.01,
                k_d: 0.5,
                min_output: -10.0,
                max_output: 10.0,
            },
            pid_lateral: PidParams {
                k_p: 0.15,
                k_i: 0.001,
                k_d: 0.05,
                min_output: -30.0,
                max_output: 30.0,
            },
            pid_reset_policy: PidResetPolicy::Never,
        }
    }

    fn open_map() -> DepthMap {
        DepthMap::from_raw(10, 90, vec![10.0; 900]).unwrap()
    }

    fn target_batch() -> DetectionBatch {
        DetectionBatch {
            timestamp: 1.0,
            detections: vec![Detection {
                bbox: BoundingBox::from([40.0, 2.0, 50.0, 8.0]),
                confidence: 0.9,
                class_id: 1,
            }],
        }
    }

    #[test]
    fn test_dt_floor() {
        let mut exec = ControlExec::new(exec_params(StalenessPolicy::HoldLast), decision_params());

        let t0 = Instant::now();

        // First cycle has no predecessor: floored
        assert_eq!(exec.cycle_start(t0), 0.01);

        // Repeated instant: floored
        assert_eq!(exec.cycle_start(t0), 0.01);

        // Normal progression: real delta
        let dt = exec.cycle_start(t0 + Duration::from_millis(100));
        assert!((dt - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_heartbeat_is_previous_command() {
        let mut exec = ControlExec::new(exec_params(StalenessPolicy::HoldLast), decision_params());

        // Before any cycle the heartbeat is a zero-velocity hover with the
        // configured duration
        let (vx, vy, cmd) = exec.heartbeat();
        assert_eq!((vx, vy), (0.0, 0.0));
        assert_eq!(cmd, ControlCommand::stop(1.0));

        // After a cycle it is exactly what that cycle issued
        let out = exec.process(&open_map(), None, 0.1, 0.0);
        let (vx, vy, cmd) = exec.heartbeat();
        assert_eq!((vx, vy), (out.vx_world_ms, out.vy_world_ms));
        assert_eq!(cmd, out.cmd);
    }

    #[test]
    fn test_hold_last_staleness_policy() {
        let mut exec = ControlExec::new(exec_params(StalenessPolicy::HoldLast), decision_params());

        let out = exec.process(&open_map(), Some(target_batch()), 0.1, 0.0);
        assert_eq!(out.report.mode, Mode::Follow);

        // Nothing pending on the next cycle: the held batch keeps the mode
        let out = exec.process(&open_map(), None, 0.1, 0.0);
        assert_eq!(out.report.mode, Mode::Follow);
    }

    #[test]
    fn test_drop_staleness_policy() {
        let mut exec = ControlExec::new(exec_params(StalenessPolicy::Drop), decision_params());

        let out = exec.process(&open_map(), Some(target_batch()), 0.1, 0.0);
        assert_eq!(out.report.mode, Mode::Follow);

        // Nothing pending: degrade to SEARCH immediately
        let out = exec.process(&open_map(), None, 0.1, 0.0);
        assert_eq!(out.report.mode, Mode::Search);
    }

    #[test]
    fn test_smoothing_and_transform_applied() {
        let mut exec = ControlExec::new(exec_params(StalenessPolicy::HoldLast), decision_params());

        // SEARCH on an open map wants cruise speed 4.0; with alpha 0.4 the
        // first smoothed output is 1.6
        let out = exec.process(&open_map(), None, 0.1, 0.0);
        assert!((out.cmd.vx_ms - 1.6).abs() < 1e-12);

        // At yaw pi/2 the world velocity is rotated onto +y
        let out = exec.process(&open_map(), None, 0.1, std::f64::consts::FRAC_PI_2);
        assert!(out.vx_world_ms.abs() < 1e-9);
        assert!((out.vy_world_ms - out.cmd.vx_ms).abs() < 1e-9);
    }
}
