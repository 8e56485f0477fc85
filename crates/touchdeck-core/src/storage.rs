//! Key/namespace persistence boundary
//!
//! The runtime only persists the calibration flag and the calibration points,
//! so the store contract is the smallest thing that covers them: booleans and
//! byte blobs addressed by `(namespace, key)`. Flash- or NVS-backed stores
//! implement [`KeyValueStore`] in the firmware; [`MemoryStore`] backs the
//! simulator and the tests.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("key not found")]
    NotFound,
    #[error("storage backend failure")]
    Backend,
    #[error("buffer too small: need {0} bytes")]
    BufferTooSmall(usize),
    #[error("failed to encode record")]
    Encode,
    #[error("failed to decode record")]
    Decode,
}

/// Persistent key/value store grouped by namespace.
///
/// `get_*` return `Ok(None)` when the key was never written; `Err` is reserved
/// for backend failures so callers can tell "uncalibrated" from "unreadable".
pub trait KeyValueStore {
    fn get_bool(&mut self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError>;

    fn put_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError>;

    /// Copy the stored bytes into `buf`, returning how many were written.
    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError>;

    fn put_bytes(&mut self, namespace: &str, key: &str, bytes: &[u8])
    -> Result<(), StorageError>;
}

/// Heap-backed store used by the simulator and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<(String, String), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(namespace: &str, key: &str) -> (String, String) {
        (String::from(namespace), String::from(key))
    }

    /// Whether anything was ever written under `(namespace, key)`.
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.entries.contains_key(&Self::slot(namespace, key))
    }
}

impl KeyValueStore for MemoryStore {
    fn get_bool(&mut self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError> {
        match self.entries.get(&Self::slot(namespace, key)) {
            Some(bytes) => match bytes.as_slice() {
                [0] => Ok(Some(false)),
                [1] => Ok(Some(true)),
                _ => Err(StorageError::Decode),
            },
            None => Ok(None),
        }
    }

    fn put_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.entries
            .insert(Self::slot(namespace, key), alloc::vec![value as u8]);
        Ok(())
    }

    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError> {
        let Some(bytes) = self.entries.get(&Self::slot(namespace, key)) else {
            return Ok(None);
        };
        if bytes.len() > buf.len() {
            return Err(StorageError::BufferTooSmall(bytes.len()));
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Some(bytes.len()))
    }

    fn put_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        self.entries
            .insert(Self::slot(namespace, key), Vec::from(bytes));
        Ok(())
    }
}
