use thiserror::Error;

/// Domain error for conversation operations. The gateway maps each variant
/// onto its HTTP status / wire error kind.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("resource not found")]
    NotFound,
    #[error("not a participant of this event")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Upload(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl MessagingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Wire-level name of the error kind, shared by both transports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "notFound",
            Self::Forbidden => "authorization",
            Self::Validation(_) => "validation",
            Self::Upload(_) => "upload",
            Self::Database(_) | Self::Storage(_) => "internal",
        }
    }
}
