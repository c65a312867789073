/// The error type for session store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The key-value store could not be reached (refused, dropped, timed out).
    ///
    /// Session operations recover from this locally; it only surfaces from the
    /// lower-level [`KeyValueStore`](crate::KeyValueStore) API.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes are not a session payload this crate wrote.
    #[error("Failed to deserialize session: {0}")]
    Deserialization(String),

    #[error("Failed to serialize session: {0}")]
    Serialization(String),

    #[error("Invalid session configuration: {0}")]
    Configuration(String),

    /// The store answered, but with an error
    #[error("Session store error: {0}")]
    Store(String),
}

impl SessionError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::Unavailable(err.to_string())
        } else {
            Self::Store(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
