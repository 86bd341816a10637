//! # Detection Messages Module
//!
//! Types for the object detection batches published by the out-of-process
//! inference stage. The wire format is a JSON object of the form:
//!
//! ```json
//! {
//!     "timestamp": 1700000000.123,
//!     "detections": [
//!         {"bbox": [x1, y1, x2, y2], "confidence": 0.87, "class": 1}
//!     ]
//! }
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An axis-aligned bounding box in image-pixel coordinates.
///
/// Coordinates are not guaranteed to lie within the frame bounds, as the
/// detector may report boxes partially outside the image. Use
/// [`BoundingBox::clamped`] before indexing into image data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A single object detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box of the detection in image-pixel coordinates.
    pub bbox: BoundingBox,

    /// Detector confidence, in the range [0, 1].
    pub confidence: f64,

    /// Numeric class identifier assigned by the detector.
    #[serde(rename = "class")]
    pub class_id: u32,
}

/// A batch of detections from one inference pass.
///
/// Batches arrive asynchronously to the control cycle; only the most recent
/// batch is meaningful to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    /// Unix timestamp (seconds) at which the inference was performed.
    pub timestamp: f64,

    /// The detections found in the frame.
    pub detections: Vec<Detection>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoundingBox {
    /// Clamp the box into a `width` by `height` pixel frame.
    ///
    /// After clamping `x2 >= x1` and `y2 >= y1` hold, but the box may have
    /// zero area if it lay entirely outside the frame.
    pub fn clamped(&self, width: usize, height: usize) -> Self {
        let w = width as f64;
        let h = height as f64;

        let x1 = self.x1.max(0.0).min(w);
        let x2 = self.x2.max(x1).min(w);
        let y1 = self.y1.max(0.0).min(h);
        let y2 = self.y2.max(y1).min(h);

        Self { x1, y1, x2, y2 }
    }

    /// Horizontal pixel centre of the box.
    pub fn centre_x(&self) -> f64 {
        0.5 * (self.x1 + self.x2)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self {
            x1: v[0],
            y1: v[1],
            x2: v[2],
            y2: v[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bbox_clamp() {
        // Box hanging off the left and top of a 100x80 frame
        let bbox = BoundingBox::from([-10.0, -5.0, 50.0, 40.0]).clamped(100, 80);
        assert_eq!(bbox, BoundingBox::from([0.0, 0.0, 50.0, 40.0]));

        // Box entirely outside the frame collapses to zero area at the edge
        let bbox = BoundingBox::from([120.0, 90.0, 130.0, 95.0]).clamped(100, 80);
        assert_eq!(bbox, BoundingBox::from([100.0, 80.0, 100.0, 80.0]));

        // Inverted box is normalised so x2 >= x1
        let bbox = BoundingBox::from([60.0, 10.0, 40.0, 30.0]).clamped(100, 80);
        assert!(bbox.x2 >= bbox.x1);
    }

    #[test]
    fn test_batch_wire_format() {
        let json = r#"{
            "timestamp": 1700000000.5,
            "detections": [
                {"bbox": [10.0, 20.0, 30.0, 40.0], "confidence": 0.9, "class": 1}
            ]
        }"#;

        let batch: DetectionBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.detections.len(), 1);
        assert_eq!(batch.detections[0].class_id, 1);
        assert_eq!(batch.detections[0].bbox.centre_x(), 20.0);
    }
}
