//! Session management
//!
//! A session is a single execution of one of the drone executables. Each
//! session gets its own directory under the configured sessions root, into
//! which the log file for the execution is written. The session also records
//! the epoch (start time) of the execution, which the logger uses to print
//! elapsed-seconds timestamps.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

// Internal imports
use crate::host;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which displays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (DRONE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    /// under `{DRONE_SW_ROOT}/{sessions_dir}`, and set the session epoch to
    /// the current time.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the epoch
        let epoch = Utc::now();

        SESSION_EPOCH
            .try_init_once(|| epoch)
            .map_err(SessionError::CannotInitEpoch)?;

        // Build the session root path
        let mut session_root = host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        session_root.push(sessions_dir);
        session_root.push(format!(
            "{}_{}",
            exec_name,
            epoch.format(TIMESTAMP_FORMAT)
        ));

        // Create the directory tree
        fs::create_dir_all(&session_root).map_err(SessionError::CannotCreateDir)?;

        // Path to the log file within the session directory
        let mut log_file_path = session_root.clone();
        log_file_path.push(format!("{}.log", exec_name));

        Ok(Self {
            session_root,
            log_file_path,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the epoch (start time) of the current session.
pub fn get_epoch() -> Result<DateTime<Utc>, SessionError> {
    SESSION_EPOCH
        .try_get()
        .map(|e| *e)
        .map_err(|_| SessionError::CannotGetEpoch)
}

/// Get the number of seconds elapsed since the session epoch.
///
/// If the session has not been initialised this returns zero rather than
/// erroring, so that it is safe to call from the logger's format closure.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.try_get() {
        Ok(epoch) => {
            let elapsed = Utc::now().signed_duration_since(*epoch);
            (elapsed.num_microseconds().unwrap_or(0) as f64) * 1e-6
        }
        Err(_) => 0.0,
    }
}
