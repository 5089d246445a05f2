use std::sync::Arc;

use cavern_seer_files::obj::reader::ObjReader;
use log::{debug, warn};

use crate::io::common::loader::Payload;
use crate::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use crate::model::types::{ModelContent, ObjMesh};

pub struct ObjDecoder;

impl ModelDecoder for ObjDecoder {
    fn references(&self, payload: &Payload) -> Result<Vec<String>, DecodeError> {
        Ok(ObjReader::parse_material_libraries(&mut payload.as_ref())?)
    }

    /// Missing or broken material libraries are not fatal, the mesh falls back to the default
    /// material for them.
    fn decode(&self, payload: &Payload, references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        let asset = ObjReader::parse_asset(&mut payload.as_ref())?;

        let mut material_libraries = Vec::with_capacity(asset.material_libraries.len());
        for name in &asset.material_libraries {
            match references.get(name).map(|reference| &reference.content) {
                Some(Some(ModelContent::MaterialLibrary(library))) => {
                    debug!("Applying material library {}", name);
                    material_libraries.push(library.asset.clone());
                }
                Some(_) => warn!("{} is no usable material library, using the default material", name),
                None => warn!("Material library {} is missing, using the default material", name),
            }
        }

        Ok(ModelContent::Obj(ObjMesh {
            payload: payload.clone(),
            asset: Arc::new(asset),
            material_libraries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use cavern_seer_files::mtl::reader::MtlReader;

    use super::*;
    use crate::loader::ResolvedReference;
    use crate::model::types::MaterialLibraryModel;

    const MESH: &[u8] = b"mtllib cave.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl Rock\nf 1 2 3\n";

    #[test]
    fn references_are_the_material_libraries() -> Result<(), anyhow::Error> {
        let payload: Payload = Arc::from(MESH);
        assert_eq!(ObjDecoder.references(&payload)?, vec!["cave.mtl".to_string()]);
        Ok(())
    }

    #[test]
    fn missing_library_uses_the_default_material() -> Result<(), anyhow::Error> {
        let payload: Payload = Arc::from(MESH);
        let ModelContent::Obj(mesh) = ObjDecoder.decode(&payload, &ResolvedReferences::default())? else {
            panic!("expected a mesh");
        };
        assert!(!mesh.has_custom_material());
        assert_eq!(mesh.asset.triangle_count(), 1);
        Ok(())
    }

    #[test]
    fn resolved_library_is_applied() -> Result<(), anyhow::Error> {
        let library_bytes: &[u8] = b"newmtl Rock\nKd 0.5 0.4 0.3\n";
        let library = MtlReader::parse_asset(&mut &library_bytes[..])?;

        let mut references = ResolvedReferences::default();
        references.insert(
            "cave.mtl".to_string(),
            ResolvedReference {
                payload: Arc::from(library_bytes),
                content: Some(ModelContent::MaterialLibrary(MaterialLibraryModel {
                    payload: Arc::from(library_bytes),
                    asset: Arc::new(library),
                })),
            },
        );

        let ModelContent::Obj(mesh) = ObjDecoder.decode(&Arc::from(MESH), &references)? else {
            panic!("expected a mesh");
        };
        assert!(mesh.has_custom_material());
        assert!(mesh.material("Rock").is_some());
        Ok(())
    }
}
