//! The on-disk schema, version 0.
//!
//! ```json
//! {
//!   "version": 0,
//!   "metadata": {
//!     "sub/scan.obj": {
//!       "position": { "x": 0, "y": 1.5, "z": 0 },
//!       "annotations": [
//!         { "type": "ceiling-height", "identifier": "h1", "anchorPoint": { "x": 0, "y": 0, "z": 0 }, "distance": 2.1 }
//!       ]
//!     }
//!   }
//! }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::model::annotation::{Annotation, CeilingHeight, CrossSection, MeasureDistance};

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3V0 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vector3V0 {
    fn from(value: Vec3) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

impl From<Vector3V0> for Vec3 {
    fn from(value: Vector3V0) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeilingHeightV0 {
    pub identifier: String,
    pub anchor_point: Vector3V0,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureDistanceV0 {
    pub identifier: String,
    pub anchor_point: Vector3V0,
    pub additional_points: Vec<Vector3V0>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionV0 {
    pub identifier: String,
    pub dimensions: Vector3V0,
    pub center_point: Vector3V0,
    pub angle_to_north_around_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnnotationV0 {
    CeilingHeight(CeilingHeightV0),
    MeasureDistance(MeasureDistanceV0),
    CrossSection(CrossSectionV0),
}

impl AnnotationV0 {
    /// `None` for annotations that are never persisted.
    pub fn from_annotation(annotation: &Annotation) -> Option<AnnotationV0> {
        match annotation {
            Annotation::CeilingHeight(a) => Some(AnnotationV0::CeilingHeight(CeilingHeightV0 {
                identifier: a.identifier.clone(),
                anchor_point: a.anchor_point.into(),
                distance: a.distance,
            })),
            Annotation::MeasureDistance(a) => Some(AnnotationV0::MeasureDistance(MeasureDistanceV0 {
                identifier: a.identifier.clone(),
                anchor_point: a.anchor_point.into(),
                additional_points: a.additional_points.iter().map(|&point| point.into()).collect(),
            })),
            Annotation::CrossSection(a) => Some(AnnotationV0::CrossSection(CrossSectionV0 {
                identifier: a.identifier.clone(),
                dimensions: a.dimensions.into(),
                center_point: a.center_point.into(),
                angle_to_north_around_y: a.angle_to_north_around_y,
            })),
            Annotation::Temporary(_) => None,
        }
    }
}

impl From<&AnnotationV0> for Annotation {
    fn from(value: &AnnotationV0) -> Self {
        match value {
            AnnotationV0::CeilingHeight(a) => Annotation::CeilingHeight(CeilingHeight {
                identifier: a.identifier.clone(),
                anchor_point: a.anchor_point.into(),
                distance: a.distance,
            }),
            AnnotationV0::MeasureDistance(a) => Annotation::MeasureDistance(MeasureDistance {
                identifier: a.identifier.clone(),
                anchor_point: a.anchor_point.into(),
                additional_points: a.additional_points.iter().map(|&point| point.into()).collect(),
            }),
            AnnotationV0::CrossSection(a) => Annotation::CrossSection(CrossSection {
                identifier: a.identifier.clone(),
                dimensions: a.dimensions.into(),
                center_point: a.center_point.into(),
                angle_to_north_around_y: a.angle_to_north_around_y,
            }),
        }
    }
}

/// Annotations are read leniently, so that one annotation of an unknown type only fails itself
/// instead of the whole manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestAnnotation {
    Known(AnnotationV0),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadataV0 {
    #[serde(default)]
    pub position: Vector3V0,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<ManifestAnnotation>,
}
