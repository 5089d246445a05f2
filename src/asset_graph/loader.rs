use std::sync::Arc;

use futures::Stream;
use log::{debug, info};
use thiserror::Error;

use crate::asset_graph::resolver::{DecodeContext, ResourceGraph};
use crate::io::archive::zip_service::ZipArchiveService;
use crate::io::archive::{ArchiveEntry, ArchiveError, ArchiveService, EntryContent, MANIFEST_FILE_NAME};
use crate::io::common::loader::Payload;
use crate::loader::{DecoderRegistry, ModelDecoder};
use crate::manifest::annotation_builder::{AnnotationBuilder, DefaultAnnotationBuilder};
use crate::manifest::{Manifest, ManifestError};
use crate::model::NodeFailure;
use crate::model::classifier::{ModelKind, classify};
use crate::model::types::LoadedModel;
use crate::settings::LoaderSettings;

/// A user supplied file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub media_type: Option<String>,
    pub payload: Payload,
}

impl Upload {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            payload,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    /// `None` when the upload only carried metadata.
    pub result: Option<LoadedModel>,
    pub errors: Vec<NodeFailure>,
}

/// Failures that leave nothing to show. Everything below the archive level is a [`NodeFailure`].
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    ArchiveError(#[from] ArchiveError),

    #[error(transparent)]
    ManifestError(#[from] ManifestError),
}

pub struct ModelLoader {
    archive_service: Arc<dyn ArchiveService>,
    decoders: DecoderRegistry,
    annotation_builder: Arc<dyn AnnotationBuilder>,
    settings: LoaderSettings,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(LoaderSettings::default())
    }
}

impl ModelLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self {
            archive_service: Arc::new(ZipArchiveService::new(settings.skip_system_entries)),
            decoders: DecoderRegistry::default(),
            annotation_builder: Arc::new(DefaultAnnotationBuilder),
            settings,
        }
    }

    pub fn with_decoder(mut self, kind: ModelKind, decoder: Arc<dyn ModelDecoder>) -> Self {
        self.decoders = self.decoders.with_decoder(kind, decoder);
        self
    }

    pub fn with_archive_service(mut self, archive_service: Arc<dyn ArchiveService>) -> Self {
        self.archive_service = archive_service;
        self
    }

    pub fn with_annotation_builder(mut self, annotation_builder: Arc<dyn AnnotationBuilder>) -> Self {
        self.annotation_builder = annotation_builder;
        self
    }

    pub fn archive_service(&self) -> &dyn ArchiveService {
        self.archive_service.as_ref()
    }

    /// [`ModelLoader::load`] as a stream with exactly one item.
    pub fn load_stream(
        &self,
        upload: Upload,
        manifest: Option<Manifest>,
        siblings: Vec<Upload>,
    ) -> impl Stream<Item = Result<LoadOutcome, LoadError>> + '_ {
        futures::stream::once(self.load(upload, manifest, siblings))
    }

    /// Loads an archive, or a single file together with the `siblings` it may reference. A
    /// supplied `manifest` takes precedence over the one stored inside of an archive.
    pub async fn load(
        &self,
        upload: Upload,
        manifest: Option<Manifest>,
        siblings: Vec<Upload>,
    ) -> Result<LoadOutcome, LoadError> {
        if upload.name == MANIFEST_FILE_NAME {
            debug!("{} only carries metadata, nothing to load", upload.name);
            return Ok(LoadOutcome {
                result: None,
                errors: Vec::new(),
            });
        }

        match classify(upload.media_type.as_deref(), &upload.name) {
            ModelKind::CompositeArchive => self.load_archive(upload, manifest).await,
            _ => self.load_single_file(upload, manifest, siblings).await,
        }
    }

    async fn load_archive(&self, upload: Upload, manifest: Option<Manifest>) -> Result<LoadOutcome, LoadError> {
        let mut root = self.archive_service.decompose(&upload.name, upload.payload)?;

        let stored_manifest = root.take_file(MANIFEST_FILE_NAME);
        let manifest = match (manifest, stored_manifest) {
            (Some(manifest), _) => Some(manifest),
            (
                None,
                Some(ArchiveEntry {
                    content: EntryContent::File(accessor),
                    ..
                }),
            ) => Some(Manifest::parse(&accessor.read()?)?),
            (None, _) => None,
        };

        let graph = ResourceGraph::from_archive(root, "");
        let (model, errors) = graph.decode(graph.root(), self.context(manifest.as_ref())).await;
        info!("Loaded {} with {} failures", upload.name, errors.len());

        Ok(LoadOutcome {
            result: Some(model),
            errors,
        })
    }

    async fn load_single_file(
        &self,
        upload: Upload,
        manifest: Option<Manifest>,
        siblings: Vec<Upload>,
    ) -> Result<LoadOutcome, LoadError> {
        let name = upload.name.clone();
        let files = std::iter::once(upload)
            .chain(siblings)
            .map(|file| (file.name, file.media_type, file.payload))
            .collect();

        let (graph, ids) = ResourceGraph::from_files(files);
        let Some(&upload_id) = ids.first() else {
            return Ok(LoadOutcome {
                result: None,
                errors: Vec::new(),
            });
        };

        let (model, errors) = graph.decode(upload_id, self.context(manifest.as_ref())).await;
        info!("Loaded {} with {} failures", name, errors.len());

        Ok(LoadOutcome {
            result: Some(model),
            errors,
        })
    }

    fn context<'a>(&'a self, manifest: Option<&'a Manifest>) -> DecodeContext<'a> {
        DecodeContext {
            decoders: &self.decoders,
            archive_service: self.archive_service.as_ref(),
            annotation_builder: self.annotation_builder.as_ref(),
            manifest,
            settings: &self.settings,
        }
    }
}
