//! The runtime model hierarchy: decoded content ([`types`]), the live [`tree::ModelTree`] that the
//! rest of the viewer mutates and observes, and [`export`] back into an archive.
//!
//! Nodes are addressed by paths built from identifiers: the tree root has the path `""`, its
//! children are addressed by their identifier alone and every further level appends
//! `/identifier`. This mirrors the layout of the uploaded archive, so the same paths key the
//! manifest and name the exported archive entries.

use thiserror::Error;

pub mod annotation;
pub mod classifier;
pub mod export;
pub mod tree;
pub mod types;

pub const PATH_SEPARATOR: char = '/';

pub fn child_path(parent_path: &str, identifier: &str) -> String {
    if parent_path.is_empty() {
        identifier.to_string()
    } else {
        format!("{parent_path}{PATH_SEPARATOR}{identifier}")
    }
}

/// Rejected mutations, checked before anything is changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The node does not exist (anymore)")]
    UnknownNode,

    #[error("Identifiers must not be empty")]
    EmptyIdentifier,

    #[error("Identifier {0:?} contains the path separator")]
    SeparatorInIdentifier(String),

    #[error("A sibling is already called {0:?}")]
    DuplicateIdentifier(String),

    #[error("The node already owns an annotation called {0:?}")]
    DuplicateAnnotation(String),

    #[error("The node has no annotation called {0:?}")]
    UnknownAnnotation(String),
}

/// A recoverable failure of a single node. The node itself is still part of the tree, as an
/// [`types::UnknownModel`] placeholder for failed decodes, or without the annotation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeFailure {
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Failed to restore annotation #{index} of {path}: {reason}")]
    Annotation { path: String, index: usize, reason: String },
}

impl NodeFailure {
    pub fn path(&self) -> &str {
        match self {
            NodeFailure::Decode { path, .. } | NodeFailure::Annotation { path, .. } => path,
        }
    }
}
