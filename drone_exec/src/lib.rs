//! # Drone executable library
//!
//! Library providing all the modules of the drone control executable. The
//! executable itself (`main.rs`) handles initialisation and drives the
//! control cycle implemented in [`exec`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cmd;
pub mod decision;
pub mod det_client;
pub mod exec;
pub mod frame_pub;
pub mod params;
pub mod pid;
pub mod ranger;
pub mod sector;
pub mod sim_client;
pub mod smoother;
