use log::{debug, trace};
use thiserror::Error;

use crate::io::archive::{ArchiveError, ArchiveService, ComposeEntry, ComposeProgress, MANIFEST_FILE_NAME};
use crate::io::common::loader::Payload;
use crate::manifest::{Manifest, ManifestError};
use crate::model::tree::ModelTree;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    ArchiveError(#[from] ArchiveError),

    #[error(transparent)]
    ManifestError(#[from] ManifestError),
}

/// The archive layout of `tree`: a freshly built manifest first, then the original bytes of every
/// non-group node at its path. Groups are implied by the paths.
pub fn export_entries(tree: &ModelTree) -> Result<Vec<ComposeEntry>, ExportError> {
    let manifest = Manifest::build_from_tree(tree);
    let mut entries = vec![ComposeEntry {
        path: MANIFEST_FILE_NAME.to_string(),
        payload: Payload::from(manifest.to_json()?),
    }];

    for id in tree.depth_first(tree.root()) {
        let (Some(node), Some(path)) = (tree.node(id), tree.manifest_path(id)) else {
            continue;
        };
        let Some(payload) = node.content.payload() else {
            continue;
        };

        trace!("Exporting {} ({} bytes)", path, payload.len());
        entries.push(ComposeEntry {
            path,
            payload: payload.clone(),
        });
    }

    Ok(entries)
}

pub fn export(
    tree: &ModelTree,
    archive_service: &dyn ArchiveService,
    progress: &mut dyn FnMut(ComposeProgress),
) -> Result<Payload, ExportError> {
    let entries = export_entries(tree)?;
    debug!("Exporting {} entries", entries.len());
    Ok(archive_service.compose(entries, progress)?)
}
