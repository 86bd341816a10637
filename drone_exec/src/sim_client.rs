//! # Simulation Client
//!
//! This module provides the client for the simulation bridge, which exposes
//! the vehicle backend (arming, take-off, velocity demands, state queries)
//! and the camera frame source over a single REQ/REP connection.
//!
//! All flight commands are fire-and-forget on the vehicle side: the bridge
//! acknowledges receipt and the vehicle executes the demand for its stated
//! duration without the client waiting on completion. Repeatedly issuing
//! long-duration demands every cycle is what produces continuous motion.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryInto;

use serde::{Deserialize, Serialize};

use crate::cmd::ControlCommand;
use vision_if::{
    frame::{Frame, FrameError, FrameMessage},
    net::{self, zmq, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout during the main loop. Frame acquisition is the slow step
/// of the cycle, so this must comfortably exceed the bridge's worst case
/// render time, while staying short enough that the consecutive-error budget
/// catches a dead bridge quickly.
const LOOP_RECV_TIMEOUT_MS: i32 = 2000;

/// Receive timeout for flight initialisation commands, which block
/// bridge-side until the manoeuvre completes.
const INIT_RECV_TIMEOUT_MS: i32 = 60000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The simulation bridge client
pub struct SimClient {
    socket: zmq::Socket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Commands accepted by the simulation bridge.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum SimCmd {
    /// Acquire a colour + depth frame pair from the named camera.
    AcquireFrame { camera: String },

    /// Enable or disable API control of the vehicle.
    SetApiControl { enable: bool },

    /// Arm or disarm the vehicle.
    Arm { arm: bool },

    /// Take off and hover. Blocks bridge-side until the vehicle is airborne.
    Takeoff,

    /// Move to the given NED z coordinate at the given speed. Blocks
    /// bridge-side until the altitude is reached.
    MoveToZ { z_m: f64, speed_ms: f64 },

    /// World-frame velocity demand at fixed altitude with a yaw rate,
    /// held for the given duration unless superseded.
    VelocityZ {
        vx_ms: f64,
        vy_ms: f64,
        z_m: f64,
        yaw_rate_dps: f64,
        duration_s: f64,
    },

    /// Query the vehicle's current yaw.
    QueryYaw,
}

/// Replies sent by the simulation bridge.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum SimRep {
    /// Command accepted.
    Ack,

    /// A frame pair in response to [`SimCmd::AcquireFrame`].
    Frame(FrameMessage),

    /// The vehicle's yaw in radians, in response to [`SimCmd::QueryYaw`].
    Yaw { yaw_rad: f64 },

    /// An error occured in the bridge.
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Socket error: {0}")]
    SocketError(#[from] NetError),

    #[error("Could not send the command to the bridge: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a response from the bridge: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the bridge: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The bridge responded with an error: {0}")]
    BridgeError(String),

    #[error("The bridge responded with an unexpected reply to {0}")]
    UnexpectedResponse(&'static str),

    #[error("The acquired frame was malformed: {0}")]
    MalformedFrame(#[from] FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Create a new instance of the simulation client.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimClientError> {
        let socket_options = SocketOptions {
            linger: 1,
            recv_timeout: LOOP_RECV_TIMEOUT_MS,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = net::new_socket(ctx, zmq::REQ, socket_options, &params.sim_endpoint)?;

        Ok(Self { socket })
    }

    /// Acquire a colour + depth frame pair.
    pub fn acquire_frame(&mut self, camera: &str) -> Result<Frame, SimClientError> {
        let rep = self.send_cmd(&SimCmd::AcquireFrame {
            camera: camera.into(),
        })?;

        match rep {
            SimRep::Frame(msg) => Ok(msg.try_into()?),
            SimRep::Error(e) => Err(SimClientError::BridgeError(e)),
            _ => Err(SimClientError::UnexpectedResponse("AcquireFrame")),
        }
    }

    /// Enable or disable API control of the vehicle.
    pub fn set_api_control(&mut self, enable: bool) -> Result<(), SimClientError> {
        self.expect_ack(&SimCmd::SetApiControl { enable }, "SetApiControl")
    }

    /// Arm or disarm the vehicle.
    pub fn arm(&mut self, arm: bool) -> Result<(), SimClientError> {
        self.expect_ack(&SimCmd::Arm { arm }, "Arm")
    }

    /// Take off and hover. Blocks until the bridge reports the vehicle
    /// airborne.
    pub fn take_off(&mut self) -> Result<(), SimClientError> {
        self.expect_ack_blocking(&SimCmd::Takeoff, "Takeoff")
    }

    /// Climb or descend to the given NED z coordinate. Blocks until reached.
    pub fn move_to_z(&mut self, z_m: f64, speed_ms: f64) -> Result<(), SimClientError> {
        self.expect_ack_blocking(&SimCmd::MoveToZ { z_m, speed_ms }, "MoveToZ")
    }

    /// Query the vehicle's current yaw in radians.
    pub fn query_yaw(&mut self) -> Result<f64, SimClientError> {
        match self.send_cmd(&SimCmd::QueryYaw)? {
            SimRep::Yaw { yaw_rad } => Ok(yaw_rad),
            SimRep::Error(e) => Err(SimClientError::BridgeError(e)),
            _ => Err(SimClientError::UnexpectedResponse("QueryYaw")),
        }
    }

    /// Issue a world-frame velocity demand at fixed altitude.
    ///
    /// `vx_ms` and `vy_ms` are the world-frame velocities (the smoothed
    /// body-frame command after rotation by the current yaw); the yaw rate
    /// and duration are taken from the command unchanged.
    pub fn command_velocity(
        &mut self,
        vx_world_ms: f64,
        vy_world_ms: f64,
        z_m: f64,
        cmd: &ControlCommand,
    ) -> Result<(), SimClientError> {
        self.expect_ack(
            &SimCmd::VelocityZ {
                vx_ms: vx_world_ms,
                vy_ms: vy_world_ms,
                z_m,
                yaw_rate_dps: cmd.yaw_rate_dps,
                duration_s: cmd.duration_s,
            },
            "VelocityZ",
        )
    }

    /// Send a command and deserialize the reply.
    fn send_cmd(&mut self, cmd: &SimCmd) -> Result<SimRep, SimClientError> {
        let cmd_str = serde_json::to_string(cmd).map_err(SimClientError::SerializationError)?;

        self.socket
            .send(&cmd_str, 0)
            .map_err(SimClientError::SendError)?;

        let msg = self
            .socket
            .recv_msg(0)
            .map_err(SimClientError::RecvError)?;

        serde_json::from_str(msg.as_str().unwrap_or(""))
            .map_err(SimClientError::DeserializeError)
    }

    /// Send a command whose only successful reply is `Ack`.
    fn expect_ack(&mut self, cmd: &SimCmd, name: &'static str) -> Result<(), SimClientError> {
        match self.send_cmd(cmd)? {
            SimRep::Ack => Ok(()),
            SimRep::Error(e) => Err(SimClientError::BridgeError(e)),
            _ => Err(SimClientError::UnexpectedResponse(name)),
        }
    }

    /// As [`SimClient::expect_ack`], with the receive timeout widened for a
    /// command which blocks bridge-side until a manoeuvre completes.
    fn expect_ack_blocking(
        &mut self,
        cmd: &SimCmd,
        name: &'static str,
    ) -> Result<(), SimClientError> {
        self.set_recv_timeout(INIT_RECV_TIMEOUT_MS)?;
        let result = self.expect_ack(cmd, name);
        self.set_recv_timeout(LOOP_RECV_TIMEOUT_MS)?;
        result
    }

    fn set_recv_timeout(&mut self, timeout_ms: i32) -> Result<(), SimClientError> {
        self.socket
            .set_rcvtimeo(timeout_ms)
            .map_err(|e| NetError::SocketOptionError("set_rcvtimeo".into(), e).into())
    }
}
