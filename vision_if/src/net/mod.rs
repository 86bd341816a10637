//! # Network Module
//!
//! This module provides networking abstractions over ZMQ, the transport
//! chosen for the software. Three socket roles are used:
//!
//! - A `REQ` socket to the simulation bridge (frames in, velocity demands
//!   out).
//! - A `SUB` socket receiving detection batches from the inference process.
//! - A `PUB` socket publishing colour frames to the inference process.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use zmq::{Context, Socket, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| NetError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoint parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Endpoint of the simulation bridge REP server.
    pub sim_endpoint: String,

    /// Endpoint on which the inference process publishes detection batches.
    pub det_endpoint: String,

    /// Endpoint on which the exec publishes colour frames for inference.
    pub frame_pub_endpoint: String,
}

/// Options which can be set on a socket before connecting or binding it.
///
/// Options correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/2-1:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint rather than
    /// connect to it.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,

    /// `ZMQ_REQ_CORRELATE`: Match replies with requests
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`: relax strict alternation between request and reply
    pub req_relaxed: bool,

    /// `ZMQ_SUBSCRIBE` prefix filter, applied only to `SUB` sockets.
    pub subscribe: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error setting the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),

    #[error("Error connecting the socket to {0}: {1}")]
    ConnectError(String, zmq::Error),

    #[error("Error binding the socket to {0}: {1}")]
    BindError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            bind: false,
            linger: 1,
            recv_timeout: -1,
            send_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
            subscribe: String::new(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a new socket of the given type, apply the options, and connect (or
/// bind) it to the endpoint.
pub fn new_socket(
    ctx: &Context,
    socket_type: SocketType,
    options: SocketOptions,
    endpoint: &str,
) -> Result<Socket, NetError> {
    let socket = ctx
        .socket(socket_type)
        .map_err(NetError::CreateSocketError)?;

    set_sockopts!(
        socket,
        (set_linger, options.linger),
        (set_rcvtimeo, options.recv_timeout),
        (set_sndtimeo, options.send_timeout)
    );

    if socket_type == zmq::REQ {
        set_sockopts!(
            socket,
            (set_req_correlate, options.req_correlate),
            (set_req_relaxed, options.req_relaxed)
        );
    }

    if socket_type == zmq::SUB {
        socket
            .set_subscribe(options.subscribe.as_bytes())
            .map_err(|e| NetError::SocketOptionError("set_subscribe".into(), e))?;
    }

    if options.bind {
        socket
            .bind(endpoint)
            .map_err(|e| NetError::BindError(endpoint.into(), e))?;
    } else {
        socket
            .connect(endpoint)
            .map_err(|e| NetError::ConnectError(endpoint.into(), e))?;
    }

    Ok(socket)
}
