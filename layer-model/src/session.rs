//! Transient per-document session data.
//!
//! A key-scoped bag of typed values that lives as long as the document
//! session. Views attach presentation state here so that it outlives any
//! single view instance without becoming process-global.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SessionError;

/// Cheap-to-clone handle to a document's session bag.
///
/// Values are stored as bincode bytes and decoded on read.
///
/// # Example
///
/// ```
/// use layer_model::SessionData;
///
/// let session = SessionData::new();
/// session.set("scroll", &42u32).unwrap();
/// assert_eq!(session.get::<u32>("scroll").unwrap(), Some(42));
/// assert_eq!(session.get::<u32>("missing").unwrap(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    store: Arc<DashMap<String, Vec<u8>>>,
}

impl SessionData {
    /// Create an empty session bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a typed value for a key.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let Some(entry) = self.store.get(key) else {
            return Ok(None);
        };
        bincode::deserialize(entry.value())
            .map(Some)
            .map_err(|source| SessionError::Deserialization {
                key: key.to_string(),
                source,
            })
    }

    /// Set a typed value for a key, overwriting any previous value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let bytes = bincode::serialize(value).map_err(|source| SessionError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.store.insert(key.to_string(), bytes);
        Ok(())
    }

    /// Store raw bytes for a key.
    pub fn set_bytes(&self, key: &str, bytes: Vec<u8>) {
        self.store.insert(key.to_string(), bytes);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }
}
