use std::sync::Arc;

use cavern_seer_files::gltf::reader::GltfReader;
use cavern_seer_files::gltf::types::GltfBuffer;
use log::{trace, warn};

use crate::io::common::loader::Payload;
use crate::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use crate::model::types::{GltfModel, ModelContent};

pub struct GltfDecoder;

impl ModelDecoder for GltfDecoder {
    fn references(&self, payload: &Payload) -> Result<Vec<String>, DecodeError> {
        Ok(GltfReader::parse_document_only(payload)?.external_uris())
    }

    /// External buffers are required, external images are optional.
    fn decode(&self, payload: &Payload, references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        let asset = GltfReader::parse_asset(payload)?;

        let mut resources = Vec::new();
        for uri in asset.external_uris() {
            match references.get(&uri) {
                Some(reference) => {
                    trace!("Resolved {} ({} bytes)", uri, reference.payload.len());
                    resources.push((uri, reference.payload.clone()));
                }
                None if is_buffer(&asset.document.buffers, &uri) => {
                    return Err(DecodeError::MissingReference { name: uri });
                }
                None => warn!("Image {} is missing, the model will be untextured", uri),
            }
        }

        Ok(ModelContent::Gltf(GltfModel {
            payload: payload.clone(),
            asset: Arc::new(asset),
            resources,
        }))
    }
}

fn is_buffer(buffers: &[GltfBuffer], uri: &str) -> bool {
    buffers.iter().any(|buffer| buffer.uri.as_deref() == Some(uri))
}
