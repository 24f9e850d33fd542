#![forbid(unsafe_code)]

//! Encoding of the standups document.

use crate::model::Standup;
use standups_runtime::{IdentifiedVec, StorageBackend, StorageError, StorageKey, StorageResult};

/// Serialize the standups as a JSON array.
pub fn encode_standups(standups: &IdentifiedVec<Standup>) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(standups).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a JSON array of standups, rejecting duplicate ids.
pub fn decode_standups(bytes: &[u8]) -> StorageResult<IdentifiedVec<Standup>> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Write the standups under `key`.
pub fn save_standups(
    storage: &dyn StorageBackend,
    key: &StorageKey,
    standups: &IdentifiedVec<Standup>,
) -> StorageResult<()> {
    let bytes = encode_standups(standups)?;
    storage.save(key, &bytes)
}

/// Read the standups stored under `key`, `None` on first run.
pub fn load_standups(
    storage: &dyn StorageBackend,
    key: &StorageKey,
) -> StorageResult<Option<IdentifiedVec<Standup>>> {
    match storage.load(key)? {
        Some(bytes) => decode_standups(&bytes).map(Some),
        None => Ok(None),
    }
}
