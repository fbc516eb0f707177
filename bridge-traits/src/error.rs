use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Connection, DNS or cross-origin failure reaching a remote endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote side answered but refused the credentials or token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The remote side confirmed the resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The host refused to start playback (e.g. a user gesture is required).
    #[error("Playback rejected by host: {0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Network(_) | BridgeError::OperationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
