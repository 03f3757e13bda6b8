use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DbError {
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Message without the variant prefix, suitable for a cell editor warning.
    pub fn detail(&self) -> String {
        match self {
            DbError::ConnectionFailed(msg)
            | DbError::QueryFailed(msg)
            | DbError::InvalidConfig(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
