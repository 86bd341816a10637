//! # Vision Interface Library
//!
//! This crate provides the interfaces connecting the drone executable to the
//! external vision processes:
//!
//! - [`net`] - networking abstractions over ZMQ, the transport chosen for the
//!   software.
//! - [`det`] - object detection messages published by the inference process.
//! - [`frame`] - camera frame and depth map types and wire formats.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod det;
pub mod frame;
pub mod net;
