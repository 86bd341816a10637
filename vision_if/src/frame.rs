//! # Camera Frame Module
//!
//! Types for the paired colour/depth frames acquired from the simulation
//! bridge, and their wire format. Colour data travels as raw 8-bit pixels
//! (3 or 4 channels) and depth as big-endian `f32` metres, both base64
//! encoded inside a JSON message.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;
use std::ops::Deref;

use base64::DecodeError;
use byteorder::{BigEndian, ByteOrder};
use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::RgbImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 2D grid of depth values in metres.
///
/// Values are non-negative; zero cells indicate sensor dropout and are
/// treated as "blocked" by the consumers of the map, not as "unknown".
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    map: Array2<f64>,
}

/// A serialisable colour + depth frame pair.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FrameMessage {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Width of both images in pixels
    pub width: u32,

    /// Height of both images in pixels
    pub height: u32,

    /// Raw colour pixel data (RGB8 or RGBA8, row major), base64 encoded
    pub colour_b64: String,

    /// Depth data in metres, one big-endian `f32` per pixel, base64 encoded
    pub depth_b64: String,
}

/// An encoded colour frame published to the inference process.
///
/// Matches the format the detector consumes: a base64 JPEG plus a Unix
/// timestamp in seconds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncodedFrameMessage {
    /// JPEG image data, base64 encoded
    pub image: String,

    /// Unix timestamp in seconds at which the frame was acquired
    pub timestamp: f64,
}

/// A decoded colour/depth frame pair.
#[derive(Debug, Clone)]
pub struct Frame {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The colour image
    pub colour: RgbImage,

    /// The planar depth map in metres
    pub depth: DepthMap,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Failed to decode frame data from base64: {0}")]
    DecodeError(#[from] DecodeError),

    #[error(
        "Colour data has the wrong size for a {0}x{1} frame: expected 3 or 4 \
        channels, got {2} bytes"
    )]
    ColourWrongSize(u32, u32, usize),

    #[error("Depth data has the wrong size for a {0}x{1} frame: got {2} bytes")]
    DepthWrongSize(u32, u32, usize),

    #[error("The frame has zero size")]
    ZeroSize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DepthMap {
    /// Build a depth map from row-major values.
    ///
    /// Returns `None` if the data length doesn't match `height * width`.
    pub fn from_raw(height: usize, width: usize, data: Vec<f64>) -> Option<Self> {
        Some(Self {
            map: Array2::from_shape_vec((height, width), data).ok()?,
        })
    }

    /// Width of the map in pixels.
    pub fn width(&self) -> usize {
        self.map.ncols()
    }

    /// Height of the map in pixels.
    pub fn height(&self) -> usize {
        self.map.nrows()
    }
}

impl Deref for DepthMap {
    type Target = Array2<f64>;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

impl TryFrom<FrameMessage> for Frame {
    type Error = FrameError;

    fn try_from(msg: FrameMessage) -> Result<Self, Self::Error> {
        let width = msg.width;
        let height = msg.height;
        let num_px = (width as usize) * (height as usize);

        if num_px == 0 {
            return Err(FrameError::ZeroSize);
        }

        // Decode colour, accepting either 3 or 4 channel data and dropping
        // the alpha channel if present.
        let colour_bytes = base64::decode(&msg.colour_b64)?;

        let rgb: Vec<u8> = if colour_bytes.len() == num_px * 3 {
            colour_bytes
        } else if colour_bytes.len() == num_px * 4 {
            colour_bytes
                .chunks_exact(4)
                .flat_map(|px| px[..3].iter().copied())
                .collect()
        } else {
            return Err(FrameError::ColourWrongSize(
                width,
                height,
                colour_bytes.len(),
            ));
        };

        // from_raw only fails on a size mismatch, which is excluded above
        let colour = RgbImage::from_raw(width, height, rgb)
            .ok_or(FrameError::ColourWrongSize(width, height, 0))?;

        // Decode depth as big-endian f32 metres
        let depth_bytes = base64::decode(&msg.depth_b64)?;

        if depth_bytes.len() != num_px * 4 {
            return Err(FrameError::DepthWrongSize(width, height, depth_bytes.len()));
        }

        let depth_vals: Vec<f64> = depth_bytes
            .chunks_exact(4)
            .map(|b| BigEndian::read_f32(b) as f64)
            .collect();

        let depth = DepthMap::from_raw(height as usize, width as usize, depth_vals)
            .ok_or(FrameError::DepthWrongSize(width, height, depth_bytes.len()))?;

        Ok(Self {
            timestamp: msg.timestamp,
            colour,
            depth,
        })
    }
}
