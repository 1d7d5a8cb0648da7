//! Session store error types

/// Errors raised while reading or writing typed session values.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The value could not be encoded.
    #[error("serialization error for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: bincode::Error,
    },

    /// The stored bytes could not be decoded as the requested type.
    #[error("deserialization error for '{key}': {source}")]
    Deserialization {
        key: String,
        #[source]
        source: bincode::Error,
    },
}

impl SessionError {
    /// The session key the error relates to.
    pub fn key(&self) -> &str {
        match self {
            Self::Serialization { key, .. } | Self::Deserialization { key, .. } => key,
        }
    }
}
