//! Error types for pipeline execution

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can abort a pipeline run
///
/// Every variant is fatal to the current run: there is no retry anywhere in
/// the core, and teardown still executes after any of these surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required configuration field was not set before an action needed it
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// A script-supplied value did not match any recognized content shape
    #[error("invalid input shape: {0}")]
    InvalidShape(String),

    /// A key argument was not a string where a string was required
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Failed to create or write a temporary resource
    #[error("resource error: {0}")]
    Resource(#[from] std::io::Error),

    /// Malformed structured input (e.g. invalid embedded JSON)
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// An external process could not be started
    #[error("failed to start '{command}': {source}")]
    Spawn {
        /// Command name that failed to start
        command: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// An external process exited with a non-zero status
    #[error("'{command}' exited with code {code}")]
    ExitStatus {
        /// Command name that failed
        command: String,
        /// Exit code, -1 when terminated by a signal
        code: i32,
    },

    /// The pipeline script itself raised an error
    #[error("script error: {0}")]
    Script(#[from] mlua::Error),
}

impl PipelineError {
    /// Create a missing-configuration error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingConfig(field.into())
    }

    /// Create an invalid-shape error
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape(message.into())
    }

    /// Check if this error came from an external process
    pub fn is_process_error(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::ExitStatus { .. })
    }
}
