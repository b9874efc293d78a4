//! Audio backend error types

use thiserror::Error;

/// Device selection and stream lifecycle failures
///
/// All of these are reported to the control plane. The engine stays usable
/// afterwards: reconfigure and call `start()` again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Host enumeration returned nothing usable
    #[error("No audio devices found")]
    NoDevices,

    /// Configured host (e.g. "JACK") is not compiled in or not running
    #[error("Audio host not available: {0}")]
    HostUnavailable(String),

    /// No device matched a selection query
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// The configured device exists in config but cannot be opened
    /// (unplugged, virtual cable driver missing, format unsupported)
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Host refused to enumerate or describe devices
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Host rejected the stream for a reason other than a missing device
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Stream was built but would not start
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),
}

/// Result alias for backend and stream-controller operations
pub type AudioResult<T> = Result<T, AudioError>;
