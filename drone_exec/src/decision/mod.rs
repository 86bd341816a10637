//! # Decision engine module
//!
//! This module implements the dual-mode state machine at the heart of the
//! control loop. Each cycle the engine looks at the latest detection batch
//! and picks one of two modes:
//!
//! - `Follow` - a detection of the target class is visible: track it, holding
//!   the configured stand-off distance and yawing to keep it centred.
//! - `Search` - no target visible: avoid obstacles using the sector scorer
//!   and cruise, turning towards open space.
//!
//! The mode is selected fresh every cycle from the detections alone, with no
//! hysteresis: a target appearing or vanishing switches the behaviour on the
//! next cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
pub use params::{DecisionParams, PidResetPolicy};

use crate::{
    cmd::ControlCommand,
    pid::PidController,
    ranger::{self, TargetRange},
    sector::{self, SectorScores},
};
use vision_if::{det::Detection, frame::DepthMap};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating mode of the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Tracking a target of the configured class.
    Follow,

    /// No target visible: exploring while avoiding obstacles.
    Search,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The decision engine.
///
/// Owns the two PID axes used in FOLLOW mode. All thresholds and speeds come
/// from [`DecisionParams`].
pub struct DecisionEngine {
    params: DecisionParams,

    /// Distance axis: forward speed from distance error.
    pid_distance: PidController,

    /// Lateral axis: yaw rate from horizontal pixel offset.
    pid_lateral: PidController,

    /// Mode selected on the previous cycle, used by the reset policy.
    prev_mode: Option<Mode>,
}

/// Status report for one decision cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Mode selected this cycle.
    pub mode: Mode,

    /// Sector scores, populated in SEARCH mode.
    pub scores: Option<SectorScores>,

    /// Range solution for the tracked target, populated in FOLLOW mode.
    pub target_range: Option<TargetRange>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DecisionEngine {
    /// Create a new engine from the given parameters.
    pub fn new(params: DecisionParams) -> Self {
        let pid_distance = PidController::new(&params.pid_distance);
        let pid_lateral = PidController::new(&params.pid_lateral);

        Self {
            params,
            pid_distance,
            pid_lateral,
            prev_mode: None,
        }
    }

    /// Run one decision cycle.
    ///
    /// `detections` is the newest available batch (possibly empty or held
    /// over from a previous cycle, see the exec's staleness policy), and
    /// `dt` is the measured cycle period, which the caller guarantees to be
    /// positive.
    ///
    /// Returns the raw body-frame command, before smoothing.
    pub fn step(
        &mut self,
        depth: &DepthMap,
        detections: &[Detection],
        dt: f64,
    ) -> (ControlCommand, StatusReport) {
        // Select the target: highest confidence detection of the target
        // class. Class match is required first, confidence only ranks within
        // the class.
        let target = detections
            .iter()
            .filter(|d| d.class_id == self.params.target_class)
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied();

        let mode = match target {
            Some(_) => Mode::Follow,
            None => Mode::Search,
        };

        // Apply the PID reset policy on mode entry
        if self.params.pid_reset_policy == PidResetPolicy::OnModeChange
            && self.prev_mode.map_or(false, |prev| prev != mode)
        {
            debug!("Mode changed to {:?}, resetting controllers", mode);
            self.pid_distance.reset();
            self.pid_lateral.reset();
        }
        self.prev_mode = Some(mode);

        match target {
            Some(det) => self.follow(depth, &det, dt),
            None => self.search(depth),
        }
    }

    /// FOLLOW mode: track the selected target.
    fn follow(
        &mut self,
        depth: &DepthMap,
        target: &Detection,
        dt: f64,
    ) -> (ControlCommand, StatusReport) {
        let range = ranger::range_to_target(depth, &target.bbox, self.params.follow_dist_m);

        // Forward speed from the distance error. A target further than the
        // stand-off distance gives a positive error and the vehicle advances;
        // asymmetric output limits allow braking or backing off when too
        // close.
        let dist_error = range.distance_m - self.params.follow_dist_m;
        let vx_ms = self.pid_distance.update(dist_error, dt);

        // Yaw rate from the horizontal pixel offset. Positive offset means
        // the target is right of centre, and a positive yaw rate turns right,
        // so the controller output is used directly to turn towards the
        // target.
        let offset_px = range.centre_px - 0.5 * (depth.width() as f64);
        let yaw_rate_dps = self.pid_lateral.update(offset_px, dt);

        let cmd = ControlCommand {
            vx_ms,
            vy_ms: 0.0,
            yaw_rate_dps,
            duration_s: self.params.cmd_duration_s,
        };

        let report = StatusReport {
            mode: Mode::Follow,
            scores: None,
            target_range: Some(range),
        };

        (cmd, report)
    }

    /// SEARCH mode: avoid obstacles and explore.
    ///
    /// Empty or degenerate depth maps produce zero sector scores, which read
    /// as "blocked" below, so sensor failure biases the vehicle towards
    /// caution rather than towards open-loop cruising.
    fn search(&mut self, depth: &DepthMap) -> (ControlCommand, StatusReport) {
        let p = &self.params;
        let scores = sector::score(depth);

        let mut vx_ms = p.cruise_speed_ms;
        let mut yaw_rate_dps = 0.0;

        if scores.centre < p.safe_dist_m || scores.min_centre < p.near_field_dist_m {
            // Frontal blockage: slow sharply but keep creeping
            vx_ms = p.creep_speed_ms;

            if scores.left < p.safe_dist_m && scores.right < p.safe_dist_m {
                // Boxed in on all three sectors: stop and make a hard turn
                // to break the deadlock
                vx_ms = 0.0;
                yaw_rate_dps = p.escape_turn_rate_dps;
            } else if scores.right >= scores.left {
                // Turn towards the more open side. An exact tie goes right,
                // the fixed default.
                yaw_rate_dps = p.avoid_turn_rate_dps;
            } else {
                yaw_rate_dps = -p.avoid_turn_rate_dps;
            }
        } else if scores.right > scores.left + p.corridor_margin_m {
            // Corridor centering: centre is clear but one side is much more
            // open, drift towards it
            yaw_rate_dps = p.corridor_turn_rate_dps;
        } else if scores.left > scores.right + p.corridor_margin_m {
            yaw_rate_dps = -p.corridor_turn_rate_dps;
        }

        let cmd = ControlCommand {
            vx_ms,
            vy_ms: 0.0,
            yaw_rate_dps,
            duration_s: p.cmd_duration_s,
        };

        let report = StatusReport {
            mode: Mode::Search,
            scores: Some(scores),
            target_range: None,
        };

        (cmd, report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid::PidParams;
    use vision_if::det::BoundingBox;

    fn test_params() -> DecisionParams {
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

    /// Map with the given per-band column values, 9 columns by 4 rows.
    fn banded_map(left: f64, centre: f64, right: f64) -> DepthMap {
        let cols = [left, left, left, centre, centre, centre, right, right, right];
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&cols);
        }
        DepthMap::from_raw(4, 9, data).unwrap()
    }

    fn uniform_map(value: f64) -> DepthMap {
        DepthMap::from_raw(10, 9, vec![value; 90]).unwrap()
    }

    fn detection(class_id: u32, confidence: f64, bbox: [f64; 4]) -> Detection {
        Detection {
            bbox: BoundingBox::from(bbox),
            confidence,
            class_id,
        }
    }

    #[test]
    fn test_clear_path_cruises_straight() {
        let mut engine = DecisionEngine::new(test_params());
        let (cmd, report) = engine.step(&uniform_map(10.0), &[], 0.1);

        assert_eq!(report.mode, Mode::Search);
        assert_eq!(cmd.vx_ms, 4.0);
        assert_eq!(cmd.yaw_rate_dps, 0.0);
    }

    #[test]
    fn test_blocked_centre_turns_to_more_open_side() {
        let mut engine = DecisionEngine::new(test_params());

        // Centre mean 2.0 (below safe dist 4.0), left 8.0 much more open
        // than right 3.0... but right is also blocked, left is not, so we
        // are not boxed in. Expect creep speed and a left turn.
        let (cmd, report) = engine.step(&banded_map(8.0, 2.0, 3.0), &[], 0.1);

        assert_eq!(report.mode, Mode::Search);
        assert_eq!(cmd.vx_ms, 0.5);
        assert_eq!(cmd.yaw_rate_dps, -20.0);
    }

    #[test]
    fn test_boxed_in_stops_and_escapes() {
        let mut engine = DecisionEngine::new(test_params());
        let (cmd, _) = engine.step(&banded_map(1.0, 1.5, 2.0), &[], 0.1);

        assert_eq!(cmd.vx_ms, 0.0);
        assert_eq!(cmd.yaw_rate_dps, 30.0);
    }

    #[test]
    fn test_side_score_tie_turns_right() {
        let mut engine = DecisionEngine::new(test_params());
        let (cmd, _) = engine.step(&banded_map(5.0, 2.0, 5.0), &[], 0.1);

        assert_eq!(cmd.vx_ms, 0.5);
        assert_eq!(cmd.yaw_rate_dps, 20.0);
    }

    #[test]
    fn test_near_field_overrides_clear_mean() {
        // Centre band mean is high but a thin close obstacle drops the min
        let mut data: Vec<f64> = vec![10.0; 36];
        data[4] = 1.0; // row 0, col 4: centre band of a 9 wide map
        let depth = DepthMap::from_raw(4, 9, data).unwrap();

        let mut engine = DecisionEngine::new(test_params());
        let (cmd, _) = engine.step(&depth, &[], 0.1);

        assert_eq!(cmd.vx_ms, 0.5);
        assert!(cmd.yaw_rate_dps.abs() == 20.0);
    }

    #[test]
    fn test_corridor_centering() {
        let mut engine = DecisionEngine::new(test_params());

        // Centre clear, right substantially more open: gentle right drift
        let (cmd, _) = engine.step(&banded_map(5.0, 6.0, 9.0), &[], 0.1);
        assert_eq!(cmd.vx_ms, 4.0);
        assert_eq!(cmd.yaw_rate_dps, 5.0);

        // Mirror case
        let (cmd, _) = engine.step(&banded_map(9.0, 6.0, 5.0), &[], 0.1);
        assert_eq!(cmd.yaw_rate_dps, -5.0);

        // Difference within the margin: no correction
        let (cmd, _) = engine.step(&banded_map(6.0, 6.0, 7.0), &[], 0.1);
        assert_eq!(cmd.yaw_rate_dps, 0.0);
    }

    #[test]
    fn test_empty_map_reads_as_blocked() {
        let depth = DepthMap::from_raw(0, 0, vec![]).unwrap();
        let mut engine = DecisionEngine::new(test_params());
        let (cmd, report) = engine.step(&depth, &[], 0.1);

        // All scores zero: boxed in, stop and escape
        assert_eq!(report.mode, Mode::Search);
        assert_eq!(cmd.vx_ms, 0.0);
        assert_eq!(cmd.yaw_rate_dps, 30.0);
    }

    #[test]
    fn test_class_match_beats_confidence() {
        let mut engine = DecisionEngine::new(test_params());

        let dets = vec![
            detection(2, 0.9, [10.0, 10.0, 20.0, 20.0]),
            detection(1, 0.4, [60.0, 10.0, 80.0, 20.0]),
        ];

        let depth = DepthMap::from_raw(10, 90, vec![10.0; 900]).unwrap();
        let (_, report) = engine.step(&depth, &dets, 0.1);

        assert_eq!(report.mode, Mode::Follow);
        // The target class box is centred at x = 70, not the high-confidence
        // box at x = 15
        assert_eq!(report.target_range.unwrap().centre_px, 70.0);
    }

    #[test]
    fn test_highest_confidence_within_class_wins() {
        let mut engine = DecisionEngine::new(test_params());

        let dets = vec![
            detection(1, 0.3, [0.0, 0.0, 20.0, 20.0]),
            detection(1, 0.8, [40.0, 0.0, 60.0, 20.0]),
        ];

        let depth = DepthMap::from_raw(10, 90, vec![10.0; 900]).unwrap();
        let (_, report) = engine.step(&depth, &dets, 0.1);

        assert_eq!(report.target_range.unwrap().centre_px, 50.0);
    }

    #[test]
    fn test_follow_signs() {
        let mut engine = DecisionEngine::new(test_params());

        // Uniform 10 m depth, target right of centre of a 90 px frame
        let depth = DepthMap::from_raw(10, 90, vec![10.0; 900]).unwrap();
        let dets = vec![detection(1, 0.9, [60.0, 2.0, 80.0, 8.0])];

        let (cmd, report) = engine.step(&depth, &dets, 0.1);

        assert_eq!(report.mode, Mode::Follow);
        // Distance 10 m > follow dist 5 m: advance
        assert!(cmd.vx_ms > 0.0);
        // Target right of centre: positive (rightward) yaw rate
        assert!(cmd.yaw_rate_dps > 0.0);
        assert_eq!(cmd.vy_ms, 0.0);
    }

    #[test]
    fn test_pid_reset_policy_on_mode_change() {
        let depth = DepthMap::from_raw(10, 90, vec![10.0; 900]).unwrap();
        let dets = vec![detection(1, 0.9, [30.0, 2.0, 60.0, 8.0])];

        // Engine that resets on mode change, and a fresh reference engine
        let mut params = test_params();
        params.pid_reset_policy = PidResetPolicy::OnModeChange;

        let mut engine = DecisionEngine::new(params.clone());

        // Build up controller history in FOLLOW, drop to SEARCH, re-enter
        // FOLLOW
        for _ in 0..10 {
            engine.step(&depth, &dets, 0.1);
        }
        engine.step(&depth, &[], 0.1);
        let (cmd_reentry, _) = engine.step(&depth, &dets, 0.1);

        // With the reset policy the re-entry cycle matches a fresh engine
        let mut fresh = DecisionEngine::new(params);
        let (cmd_fresh, _) = fresh.step(&depth, &dets, 0.1);
        assert_eq!(cmd_reentry, cmd_fresh);

        // With policy Never the accumulated integral survives the excursion
        let mut engine = DecisionEngine::new(test_params());
        for _ in 0..10 {
            engine.step(&depth, &dets, 0.1);
        }
        engine.step(&depth, &[], 0.1);
        let (cmd_carried, _) = engine.step(&depth, &dets, 0.1);
        assert_ne!(cmd_carried, cmd_fresh);
    }
}
