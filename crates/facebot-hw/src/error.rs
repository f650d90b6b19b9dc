use thiserror::Error;

/// Failure of a feedback or actuation device.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("device write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("device fault: {0}")]
    Fault(String),
}
