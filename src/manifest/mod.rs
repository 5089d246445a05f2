//! The manifest is a sparse, path-keyed side-document, stored next to the models in the archive.
//! It keeps what cannot be derived from the model files themselves: the position offset of a node
//! and the annotations the user has placed on it.
//!
//! Only one schema version exists ([`v0`]). Any other version is rejected instead of migrated.

use std::collections::BTreeMap;

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::annotation_builder::AnnotationBuilder;
use crate::manifest::v0::{AnnotationV0, ManifestAnnotation, NodeMetadataV0};
use crate::model::NodeFailure;
use crate::model::tree::ModelTree;
use crate::model::types::ModelNode;

pub mod annotation_builder;
pub mod v0;

pub const SUPPORTED_VERSION: u32 = 0;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Unsupported manifest version {0}, only version 0 can be read")]
    UnsupportedVersion(String),

    #[error("Malformed manifest: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    // checked by the version probe before
    #[serde(default, skip_deserializing)]
    pub version: u32,
    #[serde(default)]
    pub metadata: BTreeMap<String, NodeMetadataV0>,
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<serde_json::Value>,
}

impl Manifest {
    /// A missing `version` is read as version 0, so is any number equal to 0 (e.g. `0.0`). Every
    /// other explicit version is an error.
    pub fn parse(data: &[u8]) -> Result<Manifest, ManifestError> {
        let probe: VersionProbe = serde_json::from_slice(data)?;
        if let Some(version) = probe.version {
            if version.as_f64() != Some(SUPPORTED_VERSION as f64) {
                return Err(ManifestError::UnsupportedVersion(version.to_string()));
            }
        }

        let manifest: Manifest = serde_json::from_slice(data)?;
        debug!("Parsed manifest with {} entries", manifest.metadata.len());
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn entry(&self, path: &str) -> Option<&NodeMetadataV0> {
        self.metadata.get(path)
    }

    /// Records every node of `tree` that has a non-zero position or a persistent annotation, keyed
    /// by [`ModelTree::manifest_path`].
    pub fn build_from_tree(tree: &ModelTree) -> Manifest {
        let mut metadata = BTreeMap::new();

        for id in tree.depth_first(tree.root()) {
            let (Some(node), Some(path)) = (tree.node(id), tree.manifest_path(id)) else {
                continue;
            };
            let Some(entry) = Self::entry_for_node(node) else {
                continue;
            };

            if metadata.insert(path.clone(), entry).is_some() {
                warn!("Duplicate node path {:?}, only the last node is recorded", path);
            }
        }

        Manifest {
            version: SUPPORTED_VERSION,
            metadata,
        }
    }

    fn entry_for_node(node: &ModelNode) -> Option<NodeMetadataV0> {
        let annotations: Vec<ManifestAnnotation> = node
            .annotations
            .iter()
            .filter_map(AnnotationV0::from_annotation)
            .map(ManifestAnnotation::Known)
            .collect();

        if node.position == Vec3::ZERO && annotations.is_empty() {
            return None;
        }

        Some(NodeMetadataV0 {
            position: node.position.into(),
            annotations,
        })
    }

    /// Overwrites the position of a node that has not been exposed yet and attaches its
    /// annotations. Annotations that cannot be rebuilt are skipped and reported.
    pub fn apply_to_node(&self, path: &str, node: &mut ModelNode, builder: &dyn AnnotationBuilder) -> Vec<NodeFailure> {
        let Some(entry) = self.entry(path) else {
            return Vec::new();
        };

        node.position = entry.position.into();

        let mut failures = Vec::new();
        for (index, annotation) in entry.annotations.iter().enumerate() {
            let attached = builder
                .build(annotation)
                .map_err(|err| err.to_string())
                .and_then(|annotation| node.attach_annotation(annotation).map_err(|err| err.to_string()));

            if let Err(reason) = attached {
                warn!("Dropping annotation #{} of {:?}: {}", index, path, reason);
                failures.push(NodeFailure::Annotation {
                    path: path.to_string(),
                    index,
                    reason,
                });
            }
        }
        failures
    }

    /// Like [`Manifest::apply_to_node`], but for every node of a live tree. Changes are published
    /// as regular tree events.
    pub fn apply_to_tree(&self, tree: &mut ModelTree, builder: &dyn AnnotationBuilder) -> Vec<NodeFailure> {
        let mut failures = Vec::new();

        for id in tree.depth_first(tree.root()) {
            let Some(path) = tree.manifest_path(id) else {
                continue;
            };
            let Some(entry) = self.entry(&path) else {
                continue;
            };

            tree.set_position(id, entry.position.into());

            for (index, annotation) in entry.annotations.iter().enumerate() {
                let attached = builder
                    .build(annotation)
                    .map_err(|err| err.to_string())
                    .and_then(|annotation| tree.add_annotation(id, annotation).map_err(|err| err.to_string()));

                if let Err(reason) = attached {
                    failures.push(NodeFailure::Annotation {
                        path: path.clone(),
                        index,
                        reason,
                    });
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::manifest::annotation_builder::DefaultAnnotationBuilder;
    use crate::model::annotation::{Annotation, CeilingHeight, CrossSection, MeasureDistance, TemporaryAnnotation};
    use crate::model::types::{LoadedModel, ModelContent, UnknownModel};

    const DOCUMENT: &str = r#"{
        "metadata": {
            "scan.obj": {
                "position": {"x": 1, "y": 2, "z": 3},
                "annotations": [
                    {"type": "ceiling-height", "identifier": "h1", "anchorPoint": {"x": 0, "y": 0, "z": 0}, "distance": 2.5},
                    {"type": "graffiti", "identifier": "g1"},
                    {"type": "cross-section", "identifier": "c1", "dimensions": {"x": 1, "y": 2, "z": 0.1},
                     "centerPoint": {"x": 0, "y": 1, "z": 0}, "angleToNorthAroundY": 0.5}
                ]
            },
            "sub/trace.walltrace": {"position": {"x": 0, "y": -1, "z": 0}}
        }
    }"#;

    fn leaf(name: &str) -> LoadedModel {
        LoadedModel::leaf(ModelNode::new(
            name,
            ModelContent::Unknown(UnknownModel {
                payload: Arc::from(&b""[..]),
            }),
        ))
    }

    fn fresh_tree() -> ModelTree {
        ModelTree::new(LoadedModel {
            node: ModelNode::group("cave.zip"),
            children: vec![
                leaf("scan.obj"),
                LoadedModel {
                    node: ModelNode::group("sub"),
                    children: vec![leaf("trace.walltrace")],
                },
            ],
        })
    }

    #[test]
    fn missing_version_equals_version_zero() -> Result<(), anyhow::Error> {
        let without = Manifest::parse(DOCUMENT.as_bytes())?;
        let with = Manifest::parse(DOCUMENT.replacen('{', r#"{"version": 0,"#, 1).as_bytes())?;
        assert_eq!(without, with);
        assert_eq!(without.version, 0);
        assert_eq!(without.metadata.len(), 2);
        Ok(())
    }

    #[test]
    fn other_versions_are_rejected() {
        for version in ["1", "-1", "0.5", "\"0\""] {
            let document = DOCUMENT.replacen('{', &format!(r#"{{"version": {version},"#), 1);
            let result = Manifest::parse(document.as_bytes());
            assert!(
                matches!(result, Err(ManifestError::UnsupportedVersion(_))),
                "version {version} has been accepted"
            );
        }
    }

    #[test]
    fn numeric_zero_is_version_zero() -> Result<(), anyhow::Error> {
        for version in ["0.0", "-0", "0e0"] {
            let document = DOCUMENT.replacen('{', &format!(r#"{{"version": {version},"#), 1);
            assert_eq!(Manifest::parse(document.as_bytes())?.version, 0, "version {version}");
        }
        Ok(())
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(Manifest::parse(b"{ nope"), Err(ManifestError::JsonError(_))));
    }

    #[test]
    fn apply_to_node_skips_unknown_annotations() -> Result<(), anyhow::Error> {
        let manifest = Manifest::parse(DOCUMENT.as_bytes())?;
        let mut node = ModelNode::group("scan.obj");
        node.position = Vec3::new(9.0, 9.0, 9.0);

        let failures = manifest.apply_to_node("scan.obj", &mut node, &DefaultAnnotationBuilder);

        assert_eq!(node.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.annotations.len(), 2);
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], NodeFailure::Annotation { index: 1, path, .. } if path == "scan.obj"));
        Ok(())
    }

    #[test]
    fn round_trip_through_a_fresh_tree() -> Result<(), anyhow::Error> {
        let mut original = fresh_tree();
        let scan = original.find_by_path("scan.obj").expect("scan exists");
        let sub = original.find_by_path("sub").expect("sub exists");

        original.set_position(sub, Vec3::new(0.25, 0.0, -4.0));
        original
            .add_annotation(
                scan,
                Annotation::CeilingHeight(CeilingHeight {
                    identifier: "h1".to_string(),
                    anchor_point: Vec3::new(1.0, 0.0, 1.0),
                    distance: 3.5,
                }),
            )
            .expect("valid");
        original
            .add_annotation(
                scan,
                Annotation::MeasureDistance(MeasureDistance {
                    identifier: "m1".to_string(),
                    anchor_point: Vec3::ZERO,
                    additional_points: vec![Vec3::X, Vec3::Y],
                }),
            )
            .expect("valid");
        original
            .add_annotation(
                sub,
                Annotation::CrossSection(CrossSection {
                    identifier: "c1".to_string(),
                    dimensions: Vec3::new(1.0, 2.0, 0.1),
                    center_point: Vec3::ONE,
                    angle_to_north_around_y: 1.25,
                }),
            )
            .expect("valid");
        original
            .add_annotation(
                sub,
                Annotation::Temporary(TemporaryAnnotation {
                    identifier: "t".to_string(),
                    points: vec![],
                }),
            )
            .expect("valid");

        let manifest = Manifest::build_from_tree(&original);
        // the root and the untouched trace are not recorded
        assert_eq!(manifest.metadata.keys().collect::<Vec<_>>(), vec!["scan.obj", "sub"]);

        let reparsed = Manifest::parse(&manifest.to_json()?)?;
        assert_eq!(reparsed, manifest);

        let mut restored = fresh_tree();
        let failures = reparsed.apply_to_tree(&mut restored, &DefaultAnnotationBuilder);
        assert!(failures.is_empty());

        for path in ["scan.obj", "sub", "sub/trace.walltrace"] {
            let before = original.node(original.find_by_path(path).expect("exists")).expect("exists");
            let after = restored.node(restored.find_by_path(path).expect("exists")).expect("exists");
            assert!(before.position.abs_diff_eq(after.position, 1e-6));

            let persistent: Vec<&Annotation> = before.annotations.iter().filter(|a| a.is_persistent()).collect();
            assert_eq!(persistent, after.annotations.iter().collect::<Vec<_>>());
        }
        Ok(())
    }
}
