//! Host environment functions

use std::path::PathBuf;

/// Get the root directory of the drone software from the `DRONE_SW_ROOT`
/// environment variable.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    Ok(PathBuf::from(std::env::var("DRONE_SW_ROOT")?))
}
