use std::sync::Arc;

use cavern_seer_files::mtl::reader::MtlReader;

use crate::io::common::loader::Payload;
use crate::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use crate::model::types::{MaterialLibraryModel, ModelContent};

pub struct MtlDecoder;

impl ModelDecoder for MtlDecoder {
    fn decode(&self, payload: &Payload, _references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        let asset = MtlReader::parse_asset(&mut payload.as_ref())?;
        Ok(ModelContent::MaterialLibrary(MaterialLibraryModel {
            payload: payload.clone(),
            asset: Arc::new(asset),
        }))
    }
}
