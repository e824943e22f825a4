use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for the motion engine.
///
/// Bus contention during a tick is deliberately absent: a contended
/// bus lock means the frame is skipped, which is normal operation and
/// surfaces only as a debug log line.
#[derive(Debug, Error)]
pub enum MotionError {
    /// The motor bus is disconnected or an I/O operation failed.
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// No recording file exists under the given name.
    #[error("recording `{0}` not found")]
    RecordingNotFound(String),

    /// A recording file exists but could not be parsed.
    #[error("failed to load recording from {path}: {reason}")]
    RecordingLoad { path: PathBuf, reason: String },

    /// The requested operation is not allowed in the current mode,
    /// e.g. `play()` rejected by the sleep guard.
    #[error("invalid mode transition: {0}")]
    InvalidModeTransition(String),

    /// Construction-time configuration was malformed. The only
    /// variant allowed to abort startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
