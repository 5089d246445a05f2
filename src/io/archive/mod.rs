//! Turning a compressed upload into a tree of [`ArchiveEntry`]s and back.
//!
//! Decomposition is lazy: only the central directory is read up front, the contents of each file
//! are decompressed on demand through its [`PayloadAccessor`].

use thiserror::Error;

use crate::io::common::loader::{Payload, PayloadAccessor};

pub mod zip_service;

/// Fixed name of the metadata side-document at the archive root.
pub const MANIFEST_FILE_NAME: &str = "__cavern-seer-manifest.json";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("The payload is not a readable archive: {0}")]
    InvalidArchive(#[source] zip::result::ZipError),

    #[error("Entry {0} does not exist in the archive")]
    MissingEntry(String),

    #[error("The archive reader has been poisoned by a panic during a previous read")]
    Poisoned,

    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub enum EntryContent {
    /// Files before subdirectories, each in archive order.
    Directory(Vec<ArchiveEntry>),
    File(PayloadAccessor),
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// `/`-separated path relative to the archive root, `""` for the root itself.
    pub path: String,
    pub name: String,
    pub comment: String,
    pub content: EntryContent,
}

impl ArchiveEntry {
    pub fn directory(path: String, name: String, comment: String, children: Vec<ArchiveEntry>) -> Self {
        Self {
            path,
            name,
            comment,
            content: EntryContent::Directory(children),
        }
    }

    pub fn file(path: String, name: String, comment: String, accessor: PayloadAccessor) -> Self {
        Self {
            path,
            name,
            comment,
            content: EntryContent::File(accessor),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.content, EntryContent::Directory(_))
    }

    pub fn children(&self) -> &[ArchiveEntry] {
        match &self.content {
            EntryContent::Directory(children) => children,
            EntryContent::File(_) => &[],
        }
    }

    /// Removes the direct child file called `name`, returning it.
    pub fn take_file(&mut self, name: &str) -> Option<ArchiveEntry> {
        let EntryContent::Directory(children) = &mut self.content else {
            return None;
        };

        let idx = children
            .iter()
            .position(|child| !child.is_directory() && child.name == name)?;
        Some(children.remove(idx))
    }
}

/// A file to be written by [`ArchiveService::compose`].
#[derive(Debug, Clone)]
pub struct ComposeEntry {
    pub path: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeProgress {
    pub written: usize,
    pub total: usize,
}

pub trait ArchiveService: Send + Sync {
    /// Fails as a whole for invalid payloads, a partial tree is never returned.
    fn decompose(&self, name: &str, payload: Payload) -> Result<ArchiveEntry, ArchiveError>;

    /// Directories are implied by the path prefixes of `entries`.
    fn compose(
        &self,
        entries: Vec<ComposeEntry>,
        progress: &mut dyn FnMut(ComposeProgress),
    ) -> Result<Payload, ArchiveError>;
}
