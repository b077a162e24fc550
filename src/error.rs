use std::time::Duration;
use thiserror::Error;

/// Result type for ring pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or driving a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Buffer capacity must be at least one
    #[error("Buffer capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    /// Flush interval must be non-zero
    #[error("Flush interval must be non-zero, got {0:?}")]
    InvalidInterval(Duration),

    /// The pipeline has been cancelled and no longer accepts values
    #[error("Pipeline has been shut down")]
    ShutDown,

    /// The first stage was not ready to accept a value
    #[error("First stage is busy")]
    Full,

    /// The first stage did not accept a value in time
    #[error("Submit timed out after {0:?}")]
    Timeout(Duration),

    /// The first stage has exited and dropped its input
    #[error("First stage is no longer receiving")]
    Disconnected,

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// The input source failed
    #[error("Input source failed: {0}")]
    Input(#[from] std::io::Error),

    /// Writing user-facing output failed
    #[error("Output failed: {0}")]
    Output(#[source] std::io::Error),
}
