use std::sync::Arc;

use cavern_seer_files::wall_trace::reader::WallTraceReader;

use crate::io::common::loader::Payload;
use crate::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use crate::model::types::{ModelContent, WallTraceModel};

pub struct WallTraceDecoder;

impl ModelDecoder for WallTraceDecoder {
    fn decode(&self, payload: &Payload, _references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        let asset = WallTraceReader::parse_asset(&mut payload.as_ref())?;
        Ok(ModelContent::WallTrace(WallTraceModel {
            payload: payload.clone(),
            asset: Arc::new(asset),
        }))
    }
}
