//! # Sector obstacle scorer module
//!
//! The scorer partitions a depth map into three equal vertical bands (left,
//! centre, right) and scores each by its mean depth, giving a cheap
//! "openness" estimate per sector of the camera's field of view. It also
//! reports the minimum depth within the centre band, catching thin, close
//! obstacles that a band mean would dilute.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ndarray::{s, ArrayView2};
use ndarray_stats::QuantileExt;
use serde::Serialize;

// Internal
use vision_if::frame::DepthMap;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Openness scores for the three vertical bands of a depth map.
///
/// All values are depths in metres. Higher scores mean more open space. An
/// empty band scores zero, which downstream logic reads as blocked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct SectorScores {
    /// Mean depth of the left band
    pub left: f64,

    /// Mean depth of the centre band
    pub centre: f64,

    /// Mean depth of the right band
    pub right: f64,

    /// Minimum depth within the centre band
    pub min_centre: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Score the three vertical bands of the given depth map.
///
/// Bands are of equal width; if the width is not divisible by three the
/// remainder columns belong to the right band.
pub fn score(depth: &DepthMap) -> SectorScores {
    let width = depth.width();
    let band_w = width / 3;

    let left = depth.slice(s![.., 0..band_w]);
    let centre = depth.slice(s![.., band_w..2 * band_w]);
    let right = depth.slice(s![.., 2 * band_w..width]);

    SectorScores {
        left: band_mean(&left),
        centre: band_mean(&centre),
        right: band_mean(&right),
        min_centre: band_min(&centre),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Mean depth of a band, 0 if the band is empty.
fn band_mean(band: &ArrayView2<f64>) -> f64 {
    band.mean().unwrap_or(0.0)
}

/// Minimum depth of a band, 0 if the band is empty.
fn band_min(band: &ArrayView2<f64>) -> f64 {
    match band.min() {
        Ok(min) => *min,
        Err(_) => 0.0,
    }
}
