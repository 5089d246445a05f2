use crate::io::common::loader::Payload;
use crate::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use crate::model::types::{ModelContent, ScanModel};

/// The scan format is consumed opaquely. Embedders with a real scan decoder register it for
/// [`crate::model::classifier::ModelKind::Scan`] instead.
pub struct ScanDecoder;

impl ModelDecoder for ScanDecoder {
    fn decode(&self, payload: &Payload, _references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Invalid("The scan file is empty".to_string()));
        }

        Ok(ModelContent::Scan(ScanModel {
            payload: payload.clone(),
            bounds: None,
            point_count: None,
        }))
    }
}
