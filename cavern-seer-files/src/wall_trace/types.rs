use crate::common::types::{C3Vector, CAaBox};

/// A traced cave wall: one or more polylines of surveyed points.
#[derive(Debug, Clone, Default)]
pub struct WallTraceAsset {
    pub segments: Vec<Vec<C3Vector>>,
}

impl WallTraceAsset {
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn bounding_box(&self) -> Option<CAaBox> {
        CAaBox::from_points(self.segments.iter().flatten())
    }
}
