//! Input subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unknown key: {0:?}")]
    UnknownKey(String),

    #[error("user is holding input, injection skipped")]
    UserActive,

    #[error("failed to inject event: {0}")]
    Inject(String),

    #[error("failed to open device: {0}")]
    DeviceOpen(String),

    #[error("failed to create virtual device: {0}")]
    VirtualDeviceCreate(String),

    #[error("capture target not found: {0:?}")]
    TargetNotFound(String),

    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
