use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use cavern_seer_files::common::types::{C3Vector, CAaBox};
use cavern_seer_files::gltf::types::GltfAsset;
use cavern_seer_files::mtl::types::{MtlAsset, MtlMaterial};
use cavern_seer_files::obj::types::ObjAsset;
use cavern_seer_files::wall_trace::types::WallTraceAsset;
use glam::Vec3;

use crate::io::common::loader::Payload;
use crate::model::ValidationError;
use crate::model::annotation::Annotation;
use crate::model::classifier::ModelKind;

pub fn to_vec3(vector: &C3Vector) -> Vec3 {
    Vec3::new(vector.x, vector.y, vector.z)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn translated(&self, offset: Vec3) -> BoundingBox {
        BoundingBox {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl From<CAaBox> for BoundingBox {
    fn from(value: CAaBox) -> Self {
        Self {
            min: to_vec3(&value.min),
            max: to_vec3(&value.max),
        }
    }
}

#[derive(Clone)]
pub struct ObjMesh {
    pub payload: Payload,
    pub asset: Arc<ObjAsset>,
    /// The `mtllib`s that could be resolved, in reference order.
    pub material_libraries: Vec<Arc<MtlAsset>>,
}

impl ObjMesh {
    /// Whether at least one companion material library has been applied, otherwise the mesh is
    /// rendered with the default material.
    pub fn has_custom_material(&self) -> bool {
        !self.material_libraries.is_empty()
    }

    /// Earlier libraries take precedence, like a renderer applying them in order would do.
    pub fn material(&self, name: &str) -> Option<&MtlMaterial> {
        self.material_libraries.iter().find_map(|library| library.material(name))
    }
}

impl Debug for ObjMesh {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}], ", self.payload.len())?;
        write!(f, "positions: [{}], ", self.asset.positions.len())?;
        write!(f, "faces: [{}], ", self.asset.faces.len())?;
        write!(f, "material_libraries: [{}] }}", self.material_libraries.len())
    }
}

#[derive(Clone)]
pub struct GltfModel {
    pub payload: Payload,
    pub asset: Arc<GltfAsset>,
    /// External buffers and images, keyed by the URI used inside of the document.
    pub resources: Vec<(String, Payload)>,
}

impl Debug for GltfModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}], ", self.payload.len())?;
        write!(f, "binary: {}, ", self.asset.is_binary())?;
        write!(f, "resources: [{}] }}", self.resources.len())
    }
}

/// The proprietary scan format is decoded elsewhere, we only keep what placement needs.
#[derive(Clone)]
pub struct ScanModel {
    pub payload: Payload,
    pub bounds: Option<BoundingBox>,
    pub point_count: Option<usize>,
}

impl Debug for ScanModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}], ", self.payload.len())?;
        write!(f, "point_count: {:?} }}", self.point_count)
    }
}

#[derive(Clone)]
pub struct WallTraceModel {
    pub payload: Payload,
    pub asset: Arc<WallTraceAsset>,
}

impl Debug for WallTraceModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}], ", self.payload.len())?;
        write!(f, "segments: [{}] }}", self.asset.segments.len())
    }
}

#[derive(Clone)]
pub struct MaterialLibraryModel {
    pub payload: Payload,
    pub asset: Arc<MtlAsset>,
}

impl Debug for MaterialLibraryModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}], ", self.payload.len())?;
        write!(f, "materials: [{}] }}", self.asset.materials.len())
    }
}

/// Opaque passthrough, also the placeholder for files that failed to decode.
#[derive(Clone)]
pub struct UnknownModel {
    pub payload: Payload,
}

impl Debug for UnknownModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ payload: [{}] }}", self.payload.len())
    }
}

#[derive(Debug, Clone)]
pub enum ModelContent {
    Group,
    Obj(ObjMesh),
    Gltf(GltfModel),
    Scan(ScanModel),
    WallTrace(WallTraceModel),
    MaterialLibrary(MaterialLibraryModel),
    Unknown(UnknownModel),
}

impl ModelContent {
    /// `None` for groups, which only exist through their descendants.
    pub fn kind(&self) -> Option<ModelKind> {
        match self {
            ModelContent::Group => None,
            ModelContent::Obj(_) => Some(ModelKind::Obj),
            ModelContent::Gltf(_) => Some(ModelKind::Gltf),
            ModelContent::Scan(_) => Some(ModelKind::Scan),
            ModelContent::WallTrace(_) => Some(ModelKind::WallTrace),
            ModelContent::MaterialLibrary(_) => Some(ModelKind::MaterialLibrary),
            ModelContent::Unknown(_) => Some(ModelKind::Unknown),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ModelContent::Group)
    }

    /// The original bytes, for every variant but [`ModelContent::Group`].
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ModelContent::Group => None,
            ModelContent::Obj(mesh) => Some(&mesh.payload),
            ModelContent::Gltf(model) => Some(&model.payload),
            ModelContent::Scan(scan) => Some(&scan.payload),
            ModelContent::WallTrace(trace) => Some(&trace.payload),
            ModelContent::MaterialLibrary(library) => Some(&library.payload),
            ModelContent::Unknown(unknown) => Some(&unknown.payload),
        }
    }

    /// Bounds of the content itself in node space, not including any children.
    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            ModelContent::Obj(mesh) => mesh.asset.bounding_box().map(BoundingBox::from),
            ModelContent::Gltf(model) => model.asset.position_bounds().map(BoundingBox::from),
            ModelContent::Scan(scan) => scan.bounds,
            ModelContent::WallTrace(trace) => trace.asset.bounding_box().map(BoundingBox::from),
            ModelContent::Group | ModelContent::MaterialLibrary(_) | ModelContent::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub identifier: String,
    pub comment: String,
    /// Offset relative to the parent.
    pub position: Vec3,
    pub annotations: Vec<Annotation>,
    pub content: ModelContent,
}

impl ModelNode {
    pub fn new(identifier: impl Into<String>, content: ModelContent) -> Self {
        Self {
            identifier: identifier.into(),
            comment: String::new(),
            position: Vec3::ZERO,
            annotations: Vec::new(),
            content,
        }
    }

    pub fn group(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ModelContent::Group)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn annotation(&self, identifier: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.identifier() == identifier)
    }

    /// Rejects identifiers that are already taken on this node.
    pub fn attach_annotation(&mut self, annotation: Annotation) -> Result<(), ValidationError> {
        if annotation.identifier().is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        if self.annotation(annotation.identifier()).is_some() {
            return Err(ValidationError::DuplicateAnnotation(annotation.identifier().to_string()));
        }
        self.annotations.push(annotation);
        Ok(())
    }

    pub fn is_visual(&self) -> bool {
        self.content.kind().is_some_and(|kind| kind.is_visual())
    }
}

/// A decoded, not yet attached subtree: the output of the loader.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub node: ModelNode,
    pub children: Vec<LoadedModel>,
}

impl LoadedModel {
    pub fn leaf(node: ModelNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Looks up a descendant by its `/`-separated identifier path relative to this node.
    pub fn find(&self, path: &str) -> Option<&LoadedModel> {
        if path.is_empty() {
            return Some(self);
        }

        let (head, tail) = match path.split_once('/') {
            Some((head, tail)) => (head, tail),
            None => (path, ""),
        };

        self.children
            .iter()
            .find(|child| child.node.identifier == head)
            .and_then(|child| child.find(tail))
    }
}
