use glam::Vec3;

/// Vertical distance from a point on the floor to the ceiling above it.
#[derive(Debug, Clone, PartialEq)]
pub struct CeilingHeight {
    pub identifier: String,
    pub anchor_point: Vec3,
    pub distance: f32,
}

/// A polyline measurement starting at `anchor_point`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureDistance {
    pub identifier: String,
    pub anchor_point: Vec3,
    pub additional_points: Vec<Vec3>,
}

impl MeasureDistance {
    pub fn total_length(&self) -> f32 {
        let mut previous = self.anchor_point;
        let mut length = 0.0;
        for point in &self.additional_points {
            length += previous.distance(*point);
            previous = *point;
        }
        length
    }
}

/// A cutting box through a passage, rotated around the up axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub identifier: String,
    pub dimensions: Vec3,
    pub center_point: Vec3,
    pub angle_to_north_around_y: f32,
}

/// Scratch markup while the user is still placing points. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryAnnotation {
    pub identifier: String,
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    CeilingHeight(CeilingHeight),
    MeasureDistance(MeasureDistance),
    CrossSection(CrossSection),
    Temporary(TemporaryAnnotation),
}

impl Annotation {
    pub fn identifier(&self) -> &str {
        match self {
            Annotation::CeilingHeight(a) => &a.identifier,
            Annotation::MeasureDistance(a) => &a.identifier,
            Annotation::CrossSection(a) => &a.identifier,
            Annotation::Temporary(a) => &a.identifier,
        }
    }

    pub(crate) fn set_identifier(&mut self, identifier: String) {
        match self {
            Annotation::CeilingHeight(a) => a.identifier = identifier,
            Annotation::MeasureDistance(a) => a.identifier = identifier,
            Annotation::CrossSection(a) => a.identifier = identifier,
            Annotation::Temporary(a) => a.identifier = identifier,
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, Annotation::Temporary(_))
    }
}
