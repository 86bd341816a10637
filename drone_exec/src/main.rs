//! Main drone-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise session, logging and parameters
//!     - Connect to the simulation bridge and the detection feed
//!     - Flight initialisation (API control, arm, take-off, altitude)
//!     - Main loop:
//!         - Cycle timing (dt measurement)
//!         - Watchdog heartbeat (re-issue previous command)
//!         - Frame acquisition and publication to the inference process
//!         - Detection feed drain (keep-latest)
//!         - Decision processing (FOLLOW/SEARCH)
//!         - Command smoothing, frame transform and issue
//!     - Graceful shutdown (safe-stop, release control)
//!
//! The loop is single-threaded and cooperative: the detection feed is
//! produced by an independent process and consumed non-blockingly, frame
//! acquisition is the only step allowed to block, and ctrl-c is checked once
//! per cycle boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use drone_lib::{
    cmd::ControlCommand,
    decision::{DecisionParams, Mode},
    det_client::DetClient,
    exec::ControlExec,
    frame_pub::FramePub,
    params::DroneExecParams,
    sim_client::{SimClient, SimClientError},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};
use vision_if::net::{zmq, NetParams};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drone_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drone Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let exec_params: DroneExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;
    let decision_params: DecisionParams =
        util::params::load("decision.toml").wrap_err("Could not load decision params")?;

    info!("Exec parameters loaded");

    // ---- CANCELLATION ----

    // Cooperative ctrl-c flag, checked once per cycle boundary
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        ctrlc::set_handler(move || {
            cancelled.store(true, Ordering::SeqCst);
        })
        .wrap_err("Failed to set the ctrl-c handler")?;
    }

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let mut sim_client = {
        let c = SimClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the SimClient")?;
        info!("SimClient initialised");
        c
    };

    let mut det_client = {
        let c = DetClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the DetClient")?;
        info!("DetClient initialised");
        c
    };

    let mut frame_pub = {
        let p = FramePub::new(&zmq_ctx, &net_params, exec_params.jpeg_quality)
            .wrap_err("Failed to initialise the FramePub")?;
        info!("FramePub initialised");
        p
    };

    info!("Network initialisation complete");

    // ---- FLIGHT INITIALISATION ----

    info!("Taking off...");

    sim_client
        .set_api_control(true)
        .wrap_err("Could not enable API control")?;
    sim_client.arm(true).wrap_err("Could not arm the vehicle")?;
    sim_client.take_off().wrap_err("Take-off failed")?;
    sim_client
        .move_to_z(exec_params.flight_altitude_m, exec_params.climb_speed_ms)
        .wrap_err("Could not reach the flight altitude")?;

    info!(
        "Airborne at {} m, beginning main loop\n",
        -exec_params.flight_altitude_m
    );

    // ---- MAIN LOOP ----

    let flight_altitude_m = exec_params.flight_altitude_m;
    let cycle_sleep = Duration::from_millis(exec_params.cycle_sleep_ms);
    let max_backend_errors = exec_params.max_consec_backend_errors;

    let mut exec = ControlExec::new(exec_params, decision_params);
    let camera_id = exec.camera_id().to_owned();

    let mut num_consec_backend_errors = 0u64;
    let mut fatal: Option<Report> = None;

    loop {
        // Check for cancellation at the cycle boundary
        if cancelled.load(Ordering::SeqCst) {
            info!("Ctrl-c received, stopping");
            break;
        }

        let dt = exec.cycle_start(Instant::now());

        // ---- WATCHDOG HEARTBEAT ----

        // Re-issue the previous command before any heavy work, so that the
        // backend's command timeout is refreshed even if acquisition or
        // inference stalls this cycle.
        let (hb_vx, hb_vy, hb_cmd) = exec.heartbeat();
        match sim_client.command_velocity(hb_vx, hb_vy, flight_altitude_m, &hb_cmd) {
            Ok(()) => num_consec_backend_errors = 0,
            Err(e) => {
                num_consec_backend_errors += 1;
                warn!("Heartbeat command failed: {}", e);
            }
        }

        if num_consec_backend_errors > max_backend_errors {
            fatal = Some(eyre!(
                "Backend connection lost ({} consecutive command failures)",
                num_consec_backend_errors
            ));
            break;
        }

        // ---- FRAME ACQUISITION ----

        let frame = match sim_client.acquire_frame(&camera_id) {
            Ok(f) => {
                num_consec_backend_errors = 0;
                f
            }
            Err(SimClientError::MalformedFrame(e)) => {
                // Sensor hiccup: skip the cycle, the previous command stays
                // in force via its duration and the next heartbeat
                warn!("Malformed frame, skipping cycle: {}", e);
                thread::sleep(cycle_sleep);
                continue;
            }
            Err(e) => {
                num_consec_backend_errors += 1;
                warn!("Frame acquisition failed, skipping cycle: {}", e);
                thread::sleep(cycle_sleep);
                continue;
            }
        };

        // Publish the colour frame for the inference process. Failure here
        // only delays detection updates, it doesn't stop the cycle.
        if let Err(e) = frame_pub.publish(&frame) {
            warn!("Could not publish frame: {}", e);
        }

        // ---- DETECTION DRAIN ----

        let polled = match det_client.try_recv_latest() {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Detection feed error: {}", e);
                None
            }
        };

        // ---- DECISION AND ACTUATION ----

        let yaw_rad = match sim_client.query_yaw() {
            Ok(y) => {
                num_consec_backend_errors = 0;
                y
            }
            Err(e) => {
                num_consec_backend_errors += 1;
                warn!("Could not query yaw, skipping cycle: {}", e);
                thread::sleep(cycle_sleep);
                continue;
            }
        };

        let output = exec.process(&frame.depth, polled, dt, yaw_rad);

        match output.report.mode {
            Mode::Follow => {
                let range = output.report.target_range.unwrap_or_default();
                info!(
                    "[FOLLOW] dist: {:.1} m | vx: {:.1} m/s | yaw rate: {:.1} deg/s",
                    range.distance_m, output.cmd.vx_ms, output.cmd.yaw_rate_dps
                );
            }
            Mode::Search => {
                debug!(
                    "[SEARCH] vx: {:.1} m/s | yaw rate: {:.1} deg/s | scores: {:?}",
                    output.cmd.vx_ms, output.cmd.yaw_rate_dps, output.report.scores
                );
            }
        }

        match sim_client.command_velocity(
            output.vx_world_ms,
            output.vy_world_ms,
            flight_altitude_m,
            &output.cmd,
        ) {
            Ok(()) => num_consec_backend_errors = 0,
            Err(e) => {
                num_consec_backend_errors += 1;
                warn!("Velocity command failed: {}", e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        thread::sleep(cycle_sleep);
    }

    // ---- SHUTDOWN ----

    // Best-effort safe-stop: both steps are attempted even if one fails
    info!("Stopping vehicle and releasing control");

    if let Err(e) =
        sim_client.command_velocity(0.0, 0.0, flight_altitude_m, &ControlCommand::stop(1.0))
    {
        warn!("Could not issue the stop command: {}", e);
    }

    if let Err(e) = sim_client.set_api_control(false) {
        warn!("Could not release API control: {}", e);
    }

    match fatal {
        Some(report) => {
            error!("Exiting after fatal error");
            Err(report)
        }
        None => {
            info!("End of execution");
            Ok(())
        }
    }
}
