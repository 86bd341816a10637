//! # Detection Client
//!
//! The detection client subscribes to the detection batches published by the
//! out-of-process inference stage. The feed updates on its own schedule and
//! may lag behind the control cycle, so the client is strictly non-blocking:
//! each cycle it drains everything currently buffered and keeps only the
//! newest message, bounding staleness at the cost of dropping intermediate
//! batches.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use vision_if::{
    det::DetectionBatch,
    net::{self, zmq, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The detection client
pub struct DetClient {
    socket: zmq::Socket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DetClientError {
    #[error("Socket error: {0}")]
    SocketError(#[from] NetError),

    #[error("Could not recieve a message from the feed: {0}")]
    RecvError(zmq::Error),

    #[error("The feed sent a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Could not deserialize the detection batch: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetClient {
    /// Create a new instance of the detection client.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, DetClientError> {
        let socket = net::new_socket(
            ctx,
            zmq::SUB,
            SocketOptions {
                // Drains use DONTWAIT, the socket itself never waits
                recv_timeout: 0,
                ..Default::default()
            },
            &params.det_endpoint,
        )?;

        Ok(Self { socket })
    }

    /// Drain the feed and return the newest pending batch, if any.
    ///
    /// All older buffered messages are discarded unparsed: the loop cares
    /// about the current target position, not history. Returns `Ok(None)`
    /// when nothing is pending.
    pub fn try_recv_latest(&mut self) -> Result<Option<DetectionBatch>, DetClientError> {
        let mut newest: Option<String> = None;

        loop {
            match self.socket.recv_string(zmq::DONTWAIT) {
                Ok(Ok(msg)) => newest = Some(msg),
                Ok(Err(_)) => return Err(DetClientError::NonUtf8Message),
                Err(zmq::Error::EAGAIN) => break,
                Err(e) => return Err(DetClientError::RecvError(e)),
            }
        }

        match newest {
            Some(msg) => serde_json::from_str(&msg)
                .map(Some)
                .map_err(DetClientError::DeserializeError),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vision_if::det::Detection;

    fn test_batch(timestamp: f64, class_id: u32) -> String {
        serde_json::to_string(&DetectionBatch {
            timestamp,
            detections: vec![Detection {
                bbox: [0.0, 0.0, 10.0, 10.0].into(),
                confidence: 0.9,
                class_id,
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_drain_keeps_only_newest() {
        let ctx = zmq::Context::new();

        // Publisher bound on inproc so delivery is synchronous
        let publisher = ctx.socket(zmq::PUB).unwrap();
        publisher.bind("inproc://dets_test").unwrap();

        let mut client = DetClient::new(
            &ctx,
            &NetParams {
                sim_endpoint: "inproc://unused_sim".into(),
                det_endpoint: "inproc://dets_test".into(),
                frame_pub_endpoint: "inproc://unused_pub".into(),
            },
        )
        .unwrap();

        // Let the subscription propagate to the publisher
        std::thread::sleep(std::time::Duration::from_millis(100));

        // Nothing pending yet
        assert!(client.try_recv_latest().unwrap().is_none());

        // Three batches buffered before the next drain: only the last one
        // comes back
        publisher.send(&test_batch(1.0, 1), 0).unwrap();
        publisher.send(&test_batch(2.0, 2), 0).unwrap();
        publisher.send(&test_batch(3.0, 3), 0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));

        let batch = client.try_recv_latest().unwrap().unwrap();
        assert_eq!(batch.timestamp, 3.0);
        assert_eq!(batch.detections[0].class_id, 3);

        // The drain consumed everything
        assert!(client.try_recv_latest().unwrap().is_none());
    }
}
