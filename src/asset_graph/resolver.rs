use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use log::{debug, trace, warn};
use tokio::sync::OnceCell;

use crate::io::archive::{ArchiveEntry, ArchiveService, EntryContent};
use crate::io::common::loader::{Payload, PayloadAccessor};
use crate::loader::{DecodeError, DecoderRegistry, ResolvedReference, ResolvedReferences};
use crate::manifest::Manifest;
use crate::manifest::annotation_builder::AnnotationBuilder;
use crate::model::classifier::{ModelKind, classify};
use crate::model::types::{LoadedModel, ModelContent, ModelNode, UnknownModel};
use crate::model::{NodeFailure, PATH_SEPARATOR, child_path};
use crate::settings::LoaderSettings;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(usize);

/// The decoded subtree of a resource node and every failure that happened inside of it.
pub type Decoded = (LoadedModel, Vec<NodeFailure>);

/// Everything a decode needs besides the graph itself, shared by all nodes of one load.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub decoders: &'a DecoderRegistry,
    pub archive_service: &'a dyn ArchiveService,
    pub annotation_builder: &'a dyn AnnotationBuilder,
    pub manifest: Option<&'a Manifest>,
    pub settings: &'a LoaderSettings,
}

enum ResourceContent {
    File { accessor: PayloadAccessor, kind: ModelKind },
    Directory { children: Vec<ResourceId> },
}

struct ResourceNode {
    path: String,
    name: String,
    comment: String,
    parent: Option<ResourceId>,
    content: ResourceContent,
    decoded: OnceCell<Decoded>,
}

impl ResourceNode {
    fn is_file(&self) -> bool {
        matches!(self.content, ResourceContent::File { .. })
    }
}

pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    by_path: HashMap<String, ResourceId>,
    root: ResourceId,
}

impl ResourceGraph {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            by_path: HashMap::new(),
            root: ResourceId(0),
        }
    }

    /// Mirrors a decomposed archive. The root gets `root_path`, which is `""` for an upload and
    /// the path of the zip file for nested archives.
    pub fn from_archive(root: ArchiveEntry, root_path: &str) -> Self {
        let mut graph = Self::empty();
        graph.root = graph.push_entry(root, root_path.to_string(), None);
        graph
    }

    /// A virtual directory holding loose files, as `(name, media type, bytes)`. Returns the ids of
    /// the files in the order they have been passed.
    pub fn from_files(files: Vec<(String, Option<String>, Payload)>) -> (Self, Vec<ResourceId>) {
        let mut graph = Self::empty();
        graph.root = graph.push_node(String::new(), String::new(), String::new(), None, ResourceContent::Directory {
            children: Vec::new(),
        });

        let mut ids = Vec::with_capacity(files.len());
        for (name, media_type, payload) in files {
            let kind = classify(media_type.as_deref(), &name);
            let content = ResourceContent::File {
                accessor: PayloadAccessor::in_memory(payload),
                kind,
            };
            ids.push(graph.push_node(name.clone(), name, String::new(), Some(graph.root), content));
        }

        graph.nodes[graph.root.0].content = ResourceContent::Directory { children: ids.clone() };
        (graph, ids)
    }

    fn push_node(
        &mut self,
        path: String,
        name: String,
        comment: String,
        parent: Option<ResourceId>,
        content: ResourceContent,
    ) -> ResourceId {
        let id = ResourceId(self.nodes.len());
        if self.by_path.insert(path.clone(), id).is_some() {
            warn!("Duplicate resource path {:?}, references resolve to the last one", path);
        }

        self.nodes.push(ResourceNode {
            path,
            name,
            comment,
            parent,
            content,
            decoded: OnceCell::new(),
        });
        id
    }

    fn push_entry(&mut self, entry: ArchiveEntry, path: String, parent: Option<ResourceId>) -> ResourceId {
        let ArchiveEntry {
            name, comment, content, ..
        } = entry;

        match content {
            EntryContent::File(accessor) => {
                let kind = classify(None, &name);
                trace!("{} classified as {}", path, kind);
                self.push_node(path, name, comment, parent, ResourceContent::File { accessor, kind })
            }
            EntryContent::Directory(entries) => {
                let id = self.push_node(path.clone(), name, comment, parent, ResourceContent::Directory {
                    children: Vec::new(),
                });

                let children = entries
                    .into_iter()
                    .map(|child| {
                        let entry_path = child_path(&path, &child.name);
                        self.push_entry(child, entry_path, Some(id))
                    })
                    .collect();

                self.nodes[id.0].content = ResourceContent::Directory { children };
                id
            }
        }
    }

    pub fn root(&self) -> ResourceId {
        self.root
    }

    pub fn find(&self, path: &str) -> Option<ResourceId> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, id: ResourceId) -> &str {
        &self.node(id).path
    }

    fn node(&self, id: ResourceId) -> &ResourceNode {
        &self.nodes[id.0]
    }

    /// Resolves a name written inside of `from` against its siblings: exact name first, then
    /// ignoring case, then as a path relative to the parent directory.
    pub fn resolve(&self, from: ResourceId, name: &str, case_insensitive: bool) -> Option<ResourceId> {
        let parent = self.node(from).parent?;
        let normalized = name.replace('\\', "/");
        let name = normalized.trim_start_matches("./");

        let siblings: &[ResourceId] = match &self.node(parent).content {
            ResourceContent::Directory { children } => children,
            ResourceContent::File { .. } => &[],
        };
        let files = || siblings.iter().copied().filter(|&id| self.node(id).is_file());

        if let Some(found) = files().find(|&id| self.node(id).name == name) {
            return Some(found);
        }
        if case_insensitive {
            if let Some(found) = files().find(|&id| same_ignoring_case(&self.node(id).name, name)) {
                return Some(found);
            }
        }

        let joined = join_relative(&self.node(parent).path, name)?;
        if let Some(found) = self.find(&joined).filter(|&id| self.node(id).is_file()) {
            return Some(found);
        }
        if case_insensitive {
            return self
                .nodes
                .iter()
                .position(|node| node.is_file() && same_ignoring_case(&node.path, &joined))
                .map(ResourceId);
        }
        None
    }

    /// Decodes `id` and its descendants. Concurrent and repeated calls share one decode.
    pub fn decode<'a>(&'a self, id: ResourceId, ctx: DecodeContext<'a>) -> BoxFuture<'a, Decoded> {
        Box::pin(async move {
            self.node(id)
                .decoded
                .get_or_init(|| self.decode_uncached(id, ctx))
                .await
                .clone()
        })
    }

    async fn decode_uncached(&self, id: ResourceId, ctx: DecodeContext<'_>) -> Decoded {
        let node = self.node(id);
        let (mut model, mut errors) = match &node.content {
            ResourceContent::Directory { children } => self.decode_directory(node, children, ctx).await,
            ResourceContent::File {
                accessor,
                kind: ModelKind::CompositeArchive,
            } => match Self::open_nested(node, accessor, ctx) {
                // the nested root shares our path, it applies the manifest itself
                Ok(nested) => return nested.decode(nested.root(), ctx).await,
                Err(failed) => failed,
            },
            ResourceContent::File { accessor, kind } => self.decode_file(id, node, accessor, *kind, ctx).await,
        };

        if let Some(manifest) = ctx.manifest {
            errors.extend(manifest.apply_to_node(&node.path, &mut model.node, ctx.annotation_builder));
        }
        (model, errors)
    }

    async fn decode_directory(&self, node: &ResourceNode, children: &[ResourceId], ctx: DecodeContext<'_>) -> Decoded {
        let decoded = join_all(children.iter().map(|&child| self.decode(child, ctx))).await;

        let mut errors = Vec::new();
        let children = decoded
            .into_iter()
            .map(|(model, child_errors)| {
                errors.extend(child_errors);
                model
            })
            .collect();

        let group = ModelNode::group(node.name.clone()).with_comment(node.comment.clone());
        (LoadedModel { node: group, children }, errors)
    }

    fn open_nested(node: &ResourceNode, accessor: &PayloadAccessor, ctx: DecodeContext<'_>) -> Result<ResourceGraph, Decoded> {
        let payload = accessor
            .read()
            .map_err(|err| Self::failed(node, Arc::from(&[][..]), DecodeError::PayloadError(err).to_string()))?;

        let mut entry = ctx
            .archive_service
            .decompose(&node.name, payload.clone())
            .map_err(|err| Self::failed(node, payload, err.to_string()))?;

        if !node.comment.is_empty() {
            entry.comment = node.comment.clone();
        }
        debug!("Descending into nested archive {}", node.path);
        Ok(ResourceGraph::from_archive(entry, &node.path))
    }

    async fn decode_file(
        &self,
        id: ResourceId,
        node: &ResourceNode,
        accessor: &PayloadAccessor,
        kind: ModelKind,
        ctx: DecodeContext<'_>,
    ) -> Decoded {
        let payload = match accessor.read() {
            Ok(payload) => payload,
            Err(err) => return Self::failed(node, Arc::from(&[][..]), DecodeError::PayloadError(err).to_string()),
        };

        let decoder = ctx.decoders.decoder(kind);
        let names = match decoder.references(&payload) {
            Ok(names) => names,
            Err(err) => return Self::failed(node, payload, err.to_string()),
        };

        let mut references = ResolvedReferences::default();
        for name in names {
            let Some(target) = self.resolve(id, &name, ctx.settings.case_insensitive_references) else {
                debug!("{} references {}, which does not exist", node.path, name);
                continue;
            };
            if target == id {
                continue;
            }

            let ResourceContent::File {
                accessor: target_accessor,
                kind: target_kind,
            } = &self.node(target).content
            else {
                continue;
            };

            let reference = if kind.is_visual() && !target_kind.is_visual() {
                let (model, _) = self.decode(target, ctx).await;
                let Some(payload) = model.node.content.payload().cloned() else {
                    continue;
                };
                ResolvedReference {
                    payload,
                    content: Some(model.node.content),
                }
            } else {
                match target_accessor.read() {
                    Ok(payload) => ResolvedReference { payload, content: None },
                    Err(err) => {
                        warn!("Failed to read {} for {}: {}", name, node.path, err);
                        continue;
                    }
                }
            };

            trace!("{} resolved {} to {}", node.path, name, self.node(target).path);
            references.insert(name, reference);
        }

        match decoder.decode(&payload, &references) {
            Ok(content) => {
                debug!("Decoded {} as {}", node.path, kind);
                let model = ModelNode::new(node.name.clone(), content).with_comment(node.comment.clone());
                (LoadedModel::leaf(model), Vec::new())
            }
            Err(err) => Self::failed(node, payload, err.to_string()),
        }
    }

    /// The placeholder for a file that could not be decoded, it keeps the bytes for re-export.
    fn failed(node: &ResourceNode, payload: Payload, reason: String) -> Decoded {
        warn!("Failed to decode {}: {}", node.path, reason);
        let placeholder = ModelNode::new(node.name.clone(), ModelContent::Unknown(UnknownModel { payload }))
            .with_comment(node.comment.clone());

        let failure = NodeFailure::Decode {
            path: node.path.clone(),
            reason,
        };
        (LoadedModel::leaf(placeholder), vec![failure])
    }
}

fn same_ignoring_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Joins `relative` onto the directory `base`, `None` if it escapes the root.
fn join_relative(base: &str, relative: &str) -> Option<String> {
    let mut segments: Vec<&str> = base.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect();
    for segment in relative.split(PATH_SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::io::archive::zip_service::ZipArchiveService;
    use crate::io::archive::{ArchiveError, ComposeEntry};
    use crate::io::common::loader::RawAssetLoader;
    use crate::loader::mtl_loader::MtlDecoder;
    use crate::loader::ModelDecoder;
    use crate::manifest::annotation_builder::DefaultAnnotationBuilder;

    struct CountingDecoder {
        inner: MtlDecoder,
        calls: Arc<AtomicUsize>,
    }

    impl ModelDecoder for CountingDecoder {
        fn decode(&self, payload: &Payload, references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(payload, references)
        }
    }

    struct Harness {
        decoders: DecoderRegistry,
        archive_service: ZipArchiveService,
        settings: LoaderSettings,
        manifest: Option<Manifest>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                decoders: DecoderRegistry::default(),
                archive_service: ZipArchiveService::default(),
                settings: LoaderSettings::default(),
                manifest: None,
            }
        }

        fn ctx(&self) -> DecodeContext<'_> {
            DecodeContext {
                decoders: &self.decoders,
                archive_service: &self.archive_service,
                annotation_builder: &DefaultAnnotationBuilder,
                manifest: self.manifest.as_ref(),
                settings: &self.settings,
            }
        }
    }

    fn file(path: &str, data: &[u8]) -> ArchiveEntry {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        ArchiveEntry::file(
            path.to_string(),
            name,
            String::new(),
            PayloadAccessor::in_memory(Arc::from(data)),
        )
    }

    fn directory(path: &str, children: Vec<ArchiveEntry>) -> ArchiveEntry {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        ArchiveEntry::directory(path.to_string(), name, String::new(), children)
    }

    const MESH: &[u8] = b"mtllib a.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    const LIBRARY: &[u8] = b"newmtl Rock\nKd 0.5 0.5 0.5\n";

    #[tokio::test]
    async fn shared_library_is_decoded_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut harness = Harness::new();
        harness.decoders = DecoderRegistry::default().with_decoder(
            ModelKind::MaterialLibrary,
            Arc::new(CountingDecoder {
                inner: MtlDecoder,
                calls: calls.clone(),
            }),
        );

        let graph = ResourceGraph::from_archive(
            directory("", vec![file("a.obj", MESH), file("b.obj", MESH), file("a.mtl", LIBRARY)]),
            "",
        );

        let ((model, errors), again) = futures::join!(
            graph.decode(graph.root(), harness.ctx()),
            graph.decode(graph.root(), harness.ctx())
        );

        assert!(errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.0.children.len(), 3);

        for name in ["a.obj", "b.obj"] {
            let Some(ModelContent::Obj(mesh)) = model.find(name).map(|m| &m.node.content) else {
                panic!("{name} is no mesh");
            };
            assert!(mesh.has_custom_material());
        }
    }

    #[tokio::test]
    async fn case_insensitive_resolution_is_configurable() {
        let root = || directory("", vec![file("a.obj", MESH), file("A.MTL", LIBRARY)]);
        let mut harness = Harness::new();

        let graph = ResourceGraph::from_archive(root(), "");
        let (model, _) = graph.decode(graph.root(), harness.ctx()).await;
        assert!(matches!(&model.children[0].node.content, ModelContent::Obj(mesh) if mesh.has_custom_material()));

        harness.settings.case_insensitive_references = false;
        let graph = ResourceGraph::from_archive(root(), "");
        let (model, errors) = graph.decode(graph.root(), harness.ctx()).await;
        assert!(errors.is_empty());
        assert!(matches!(&model.children[0].node.content, ModelContent::Obj(mesh) if !mesh.has_custom_material()));
    }

    #[tokio::test]
    async fn relative_references_are_joined() {
        let mesh: &[u8] = b"mtllib ../materials/a.mtl\nv 0 0 0\n";
        let graph = ResourceGraph::from_archive(
            directory("", vec![
                directory("meshes", vec![file("meshes/a.obj", mesh)]),
                directory("materials", vec![file("materials/a.mtl", LIBRARY)]),
            ]),
            "",
        );

        let harness = Harness::new();
        let mesh_id = graph.find("meshes/a.obj").expect("mesh exists");
        assert_eq!(graph.resolve(mesh_id, "../materials/a.mtl", false), graph.find("materials/a.mtl"));

        let (model, _) = graph.decode(mesh_id, harness.ctx()).await;
        assert!(matches!(&model.node.content, ModelContent::Obj(mesh) if mesh.has_custom_material()));
    }

    #[tokio::test]
    async fn failed_decode_keeps_the_bytes() {
        let graph = ResourceGraph::from_archive(
            directory("", vec![directory("sub", vec![file("sub/broken.obj", b"f 1 2 3\n")])]),
            "",
        );

        let harness = Harness::new();
        let (model, errors) = graph.decode(graph.root(), harness.ctx()).await;

        let broken = model.find("sub/broken.obj").expect("placeholder exists");
        assert!(matches!(&broken.node.content, ModelContent::Unknown(unknown) if unknown.payload.as_ref() == b"f 1 2 3\n"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "sub/broken.obj");
    }

    #[tokio::test]
    async fn nested_archives_are_prefixed() -> Result<(), anyhow::Error> {
        let service = ZipArchiveService::default();
        let inner = service.compose(
            vec![
                ComposeEntry {
                    path: "deep/trace.walltrace".to_string(),
                    payload: Arc::from(&b"0,0,0\n1,1,1\n"[..]),
                },
                ComposeEntry {
                    path: "broken.walltrace".to_string(),
                    payload: Arc::from(&b"nope"[..]),
                },
            ],
            &mut |_| {},
        )?;

        let graph = ResourceGraph::from_archive(
            directory("", vec![directory("sub", vec![file("sub/inner.zip", &inner)])]),
            "",
        );
        let harness = Harness::new();
        let (model, errors) = graph.decode(graph.root(), harness.ctx()).await;

        let inner = model.find("sub/inner.zip").expect("nested group exists");
        assert!(inner.node.content.is_group());
        assert!(matches!(
            model.find("sub/inner.zip/deep/trace.walltrace").map(|m| &m.node.content),
            Some(ModelContent::WallTrace(_))
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "sub/inner.zip/broken.walltrace");
        Ok(())
    }

    struct UnreadableLoader;

    impl RawAssetLoader for UnreadableLoader {
        fn load_raw_owned(&self, key: &str) -> Result<Payload, ArchiveError> {
            Err(ArchiveError::MissingEntry(key.to_string()))
        }
    }

    #[tokio::test]
    async fn unreadable_entries_become_placeholders() {
        let unreadable = ArchiveEntry::file(
            "gone.walltrace".to_string(),
            "gone.walltrace".to_string(),
            String::new(),
            PayloadAccessor::new(Arc::new(UnreadableLoader), "gone.walltrace".to_string()),
        );
        let graph = ResourceGraph::from_archive(directory("", vec![unreadable]), "");
        let harness = Harness::new();
        let (model, errors) = graph.decode(graph.root(), harness.ctx()).await;

        let Some(ModelContent::Unknown(placeholder)) = model.find("gone.walltrace").map(|m| &m.node.content) else {
            panic!("expected a placeholder");
        };
        assert!(placeholder.payload.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], NodeFailure::Decode { reason, .. } if reason.contains("does not exist")));
    }

    #[test]
    fn relative_paths_cannot_escape_the_root() {
        assert_eq!(join_relative("a/b", "../c.mtl").as_deref(), Some("a/c.mtl"));
        assert_eq!(join_relative("", "./x/./y.bin").as_deref(), Some("x/y.bin"));
        assert_eq!(join_relative("a", "../../c.mtl"), None);
    }
}
