use serde::Deserialize;

use crate::common::types::{C3Vector, CAaBox};

pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
pub const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
pub const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

/// The subset of the glTF 2.0 JSON document that matters for loading and placing a model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfDocument {
    pub asset: GltfAssetInfo,
    #[serde(default)]
    pub buffers: Vec<GltfBuffer>,
    #[serde(default)]
    pub images: Vec<GltfImage>,
    #[serde(default)]
    pub accessors: Vec<GltfAccessor>,
    #[serde(default)]
    pub meshes: Vec<GltfMesh>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAssetInfo {
    pub version: String,
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfBuffer {
    /// Absent for the GLB binary chunk.
    pub uri: Option<String>,
    pub byte_length: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfImage {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAccessor {
    #[serde(default)]
    pub min: Vec<f32>,
    #[serde(default)]
    pub max: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GltfMesh {
    #[serde(default)]
    pub primitives: Vec<GltfPrimitive>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GltfPrimitive {
    #[serde(default)]
    pub attributes: std::collections::BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct GltfAsset {
    pub document: GltfDocument,
    pub binary: bool,
    /// Length of the embedded BIN chunk, `None` for JSON glTF and GLB files without one.
    pub binary_chunk_length: Option<u32>,
}

impl GltfAsset {
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn external_uris(&self) -> Vec<String> {
        self.document.external_uris()
    }

    pub fn position_bounds(&self) -> Option<CAaBox> {
        self.document.position_bounds()
    }
}

impl GltfDocument {
    /// URIs of buffers and images that live next to the model rather than inside of it.
    pub fn external_uris(&self) -> Vec<String> {
        let buffers = self.buffers.iter().filter_map(|buffer| buffer.uri.as_deref());
        let images = self.images.iter().filter_map(|image| image.uri.as_deref());

        let mut uris: Vec<String> = Vec::new();
        for uri in buffers.chain(images) {
            if !uri.starts_with("data:") && !uris.iter().any(|known| known == uri) {
                uris.push(uri.to_string());
            }
        }
        uris
    }

    /// Union of the `POSITION` accessor bounds, in mesh space (node transforms are ignored).
    pub fn position_bounds(&self) -> Option<CAaBox> {
        let accessors = &self.accessors;
        self.meshes
            .iter()
            .flat_map(|mesh| mesh.primitives.iter())
            .filter_map(|primitive| primitive.attributes.get("POSITION"))
            .filter_map(|&idx| accessors.get(idx))
            .filter(|accessor| accessor.min.len() == 3 && accessor.max.len() == 3)
            .map(|accessor| CAaBox {
                min: C3Vector::new(accessor.min[0], accessor.min[1], accessor.min[2]),
                max: C3Vector::new(accessor.max[0], accessor.max[1], accessor.max[2]),
            })
            .reduce(|a, b| a.union(&b))
    }
}
