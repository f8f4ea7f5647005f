//! Error type shared by passes, chains and executors.

use crate::target::TargetId;

/// Errors produced while building, configuring, or running a pass chain.
#[derive(thiserror::Error, Debug)]
pub enum PassError {
    /// A switch was released out of order, twice, or against a chain that changed underneath it.
    #[error("pass-chain state inconsistent: {0}")]
    ChainStateInconsistent(String),

    /// A configuration value is outside its physically valid range.
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A parameter was supplied with the wrong type.
    #[error("parameter '{key}' expects a {expected} value")]
    ParamType { key: String, expected: &'static str },

    /// An offscreen target could not be created.
    #[error("failed to allocate offscreen target '{label}' ({width}x{height})")]
    TargetAllocation {
        label: String,
        width: u32,
        height: u32,
    },

    /// A target handle was used after it was destroyed, or never existed.
    #[error("unknown offscreen target {0:?}")]
    UnknownTarget(TargetId),

    /// The GPU backend could not be initialized or lost its surface.
    #[error("gpu: {0}")]
    Gpu(String),

    /// The window or its event loop could not be created.
    #[error("window: {0}")]
    Window(String),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PassError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PassError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
