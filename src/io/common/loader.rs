use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::io::archive::ArchiveError;

/// Immutable, cheaply clonable file contents. Decoded leaves keep theirs for re-export.
pub type Payload = Arc<[u8]>;

pub trait RawAssetLoader: Send + Sync {
    /// Reads (and, for archives, decompresses) the entry stored under `key`.
    fn load_raw_owned(&self, key: &str) -> Result<Payload, ArchiveError>;
}

/// A lazy handle to the bytes of one file entry. Nothing is read until [`PayloadAccessor::read`].
#[derive(Clone)]
pub struct PayloadAccessor {
    loader: Arc<dyn RawAssetLoader>,
    key: String,
}

impl PayloadAccessor {
    pub fn new(loader: Arc<dyn RawAssetLoader>, key: String) -> Self {
        Self { loader, key }
    }

    /// Wraps bytes that are already in memory, e.g. a plain file upload.
    pub fn in_memory(payload: Payload) -> Self {
        Self {
            loader: Arc::new(InMemoryLoader { payload }),
            key: String::new(),
        }
    }

    pub fn read(&self) -> Result<Payload, ArchiveError> {
        self.loader.load_raw_owned(&self.key)
    }
}

impl Debug for PayloadAccessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayloadAccessor {{ key: {:?} }}", self.key)
    }
}

struct InMemoryLoader {
    payload: Payload,
}

impl RawAssetLoader for InMemoryLoader {
    fn load_raw_owned(&self, _key: &str) -> Result<Payload, ArchiveError> {
        Ok(self.payload.clone())
    }
}
