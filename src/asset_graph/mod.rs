//! This module contains the resource graph that is built for every load operation, to keep track
//! of the files of an upload and to decode each of them at most once.
//!
//! Building the graph is cheap: it mirrors the [`crate::io::archive::ArchiveEntry`] tree in an
//! arena of resource nodes, one per file or directory, indexed by id and by path. Nothing is read
//! or decoded until the first demand. Every node carries a one-shot completion cell
//! ([`tokio::sync::OnceCell`]), so whoever asks first runs the decoder (i.e. [`crate::loader`])
//! while concurrent requests await the very same initialization instead of racing a second decode.
//!
//! Decoding a directory fans out to all of its children concurrently and joins them in archive
//! order into a group. Decoding a file first asks its decoder which other files it references
//! (e.g. the `mtllib` of an OBJ mesh, the external buffers of a glTF) and resolves these names
//! against the siblings of the file. Auxiliary siblings like material libraries are decoded
//! through their own cell, which is what deduplicates a library that is shared by many meshes.
//! Visual siblings only ever hand out their bytes, which keeps the resolution acyclic: an edge
//! always goes from a visual file to an auxiliary one and never further.
//!
//! Note: The resolved references are only borrowed for the duration of the decode, the decoded
//! content keeps whatever it needs (e.g. the parsed material library) behind an [`std::sync::Arc`].
//!
//! A zip inside of the upload is not a leaf: it is decomposed into a nested graph whose paths are
//! prefixed with the path of the zip file, so the manifest can address its contents like those of
//! any other directory.
//!
//! The manifest hook runs last for every node: once the content is decoded, the manifest entry
//! for the node's path (if any) overwrites the position and rebuilds the annotations. A node is
//! thus never observable without its persisted metadata.
//!
//! Failures below the archive level never abort a load. A file that fails to decode becomes an
//! [`crate::model::types::UnknownModel`] keeping its bytes and contributes exactly one
//! [`crate::model::NodeFailure`], the failures are collected bottom-up by the directories.

pub mod loader;
pub mod resolver;
