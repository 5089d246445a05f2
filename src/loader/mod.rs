//! Decoders turn the bytes of one file into [`ModelContent`]. They are synchronous and know
//! nothing about archives: everything a file references is resolved by the resource graph first
//! and handed in as [`ResolvedReferences`].

use std::collections::HashMap;
use std::sync::Arc;

use cavern_seer_files::ParserError;
use thiserror::Error;

use crate::io::archive::ArchiveError;
use crate::io::common::loader::Payload;
use crate::loader::gltf_loader::GltfDecoder;
use crate::loader::mtl_loader::MtlDecoder;
use crate::loader::obj_loader::ObjDecoder;
use crate::loader::scan_loader::ScanDecoder;
use crate::loader::wall_trace_loader::WallTraceDecoder;
use crate::model::classifier::ModelKind;
use crate::model::types::{ModelContent, UnknownModel};

pub mod gltf_loader;
pub mod mtl_loader;
pub mod obj_loader;
pub mod scan_loader;
pub mod wall_trace_loader;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    ParserError(#[from] ParserError),

    #[error(transparent)]
    PayloadError(#[from] ArchiveError),

    #[error("The referenced file {name} could not be found")]
    MissingReference { name: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub payload: Payload,
    /// Only auxiliary siblings (e.g. material libraries) are decoded for their referrer, visual
    /// siblings only hand out their bytes.
    pub content: Option<ModelContent>,
}

/// The references a decoder asked for, keyed by the exact name it asked for. Names that could not
/// be resolved are absent.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    references: HashMap<String, ResolvedReference>,
}

impl ResolvedReferences {
    pub fn insert(&mut self, name: String, reference: ResolvedReference) {
        self.references.insert(name, reference);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedReference> {
        self.references.get(name)
    }
}

pub trait ModelDecoder: Send + Sync {
    /// Names of other files this payload needs, as written inside of it.
    fn references(&self, _payload: &Payload) -> Result<Vec<String>, DecodeError> {
        Ok(Vec::new())
    }

    fn decode(&self, payload: &Payload, references: &ResolvedReferences) -> Result<ModelContent, DecodeError>;
}

/// Keeps the bytes without looking at them.
pub struct PassthroughDecoder;

impl ModelDecoder for PassthroughDecoder {
    fn decode(&self, payload: &Payload, _references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        Ok(ModelContent::Unknown(UnknownModel {
            payload: payload.clone(),
        }))
    }
}

/// Decoders per [`ModelKind`]. Composite archives are not decoded by a decoder, they become
/// nested resource graphs.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<ModelKind, Arc<dyn ModelDecoder>>,
    fallback: Arc<dyn ModelDecoder>,
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
            fallback: Arc::new(PassthroughDecoder),
        }
    }

    pub fn with_decoder(mut self, kind: ModelKind, decoder: Arc<dyn ModelDecoder>) -> Self {
        self.decoders.insert(kind, decoder);
        self
    }

    /// Kinds without a registered decoder are kept as opaque bytes.
    pub fn decoder(&self, kind: ModelKind) -> &Arc<dyn ModelDecoder> {
        self.decoders.get(&kind).unwrap_or(&self.fallback)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::empty()
            .with_decoder(ModelKind::Obj, Arc::new(ObjDecoder))
            .with_decoder(ModelKind::Gltf, Arc::new(GltfDecoder))
            .with_decoder(ModelKind::Scan, Arc::new(ScanDecoder))
            .with_decoder(ModelKind::WallTrace, Arc::new(WallTraceDecoder))
            .with_decoder(ModelKind::MaterialLibrary, Arc::new(MtlDecoder))
    }
}
