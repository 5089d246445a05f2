use crate::common::types::{C2Vector, C3Vector, CAaBox};

/// One corner of a face, all indices are zero based and already validated against the
/// respective attribute list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ObjFaceVertex {
    pub position: u32,
    pub texcoord: Option<u32>,
    pub normal: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ObjFace {
    pub vertices: Vec<ObjFaceVertex>,
    /// Index into [`ObjAsset::material_names`], set by the last `usemtl` statement.
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjAsset {
    /// `mtllib` references in order of appearance, relative to the OBJ file.
    pub material_libraries: Vec<String>,
    /// Distinct `usemtl` names in order of first appearance.
    pub material_names: Vec<String>,
    pub object_names: Vec<String>,
    pub positions: Vec<C3Vector>,
    pub texcoords: Vec<C2Vector>,
    pub normals: Vec<C3Vector>,
    pub faces: Vec<ObjFace>,
}

impl ObjAsset {
    pub fn bounding_box(&self) -> Option<CAaBox> {
        CAaBox::from_points(&self.positions)
    }

    /// Number of triangles after fan triangulation of every face.
    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|face| face.vertices.len().saturating_sub(2))
            .sum()
    }
}
