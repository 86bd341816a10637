//! # Frame Publisher
//!
//! Publishes each acquired colour frame to the out-of-process inference
//! stage as a base64 JPEG. The publisher is fire-and-forget: the inference
//! process subscribes with a conflating socket and works at its own rate, so
//! no acknowledgement is expected and a slow consumer never stalls the
//! control cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{DynamicImage, ImageOutputFormat};

use vision_if::{
    frame::{EncodedFrameMessage, Frame},
    net::{self, zmq, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The frame publisher
pub struct FramePub {
    socket: zmq::Socket,

    /// JPEG quality (1-100) used when encoding frames.
    jpeg_quality: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FramePubError {
    #[error("Socket error: {0}")]
    SocketError(#[from] NetError),

    #[error("Could not encode the frame as JPEG: {0}")]
    EncodeError(#[from] image::ImageError),

    #[error("Could not serialize the frame message: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Could not publish the frame: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FramePub {
    /// Create a new instance of the frame publisher.
    ///
    /// The publisher binds its endpoint; the inference process connects to
    /// it.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        jpeg_quality: u8,
    ) -> Result<Self, FramePubError> {
        let socket = net::new_socket(
            ctx,
            zmq::PUB,
            SocketOptions {
                bind: true,
                send_timeout: 10,
                ..Default::default()
            },
            &params.frame_pub_endpoint,
        )?;

        Ok(Self {
            socket,
            jpeg_quality,
        })
    }

    /// Encode and publish the colour part of the given frame.
    pub fn publish(&mut self, frame: &Frame) -> Result<(), FramePubError> {
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(frame.colour.clone())
            .write_to(&mut jpeg, ImageOutputFormat::Jpeg(self.jpeg_quality))?;

        let msg = EncodedFrameMessage {
            image: base64::encode(&jpeg),
            timestamp: frame.timestamp.timestamp_millis() as f64 * 1e-3,
        };

        self.socket
            .send(&serde_json::to_string(&msg)?, 0)
            .map_err(FramePubError::SendError)
    }
}
