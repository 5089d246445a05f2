use thiserror::Error;

use crate::manifest::v0::{AnnotationV0, ManifestAnnotation};
use crate::model::annotation::Annotation;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("Unknown annotation type {0:?}")]
    UnknownType(String),

    #[error("The annotation has no type")]
    MissingType,

    #[error("Malformed {kind} annotation: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Reconstructs runtime annotations from their manifest representation.
pub trait AnnotationBuilder: Send + Sync {
    fn build(&self, annotation: &ManifestAnnotation) -> Result<Annotation, AnnotationError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnnotationBuilder;

impl AnnotationBuilder for DefaultAnnotationBuilder {
    fn build(&self, annotation: &ManifestAnnotation) -> Result<Annotation, AnnotationError> {
        let value = match annotation {
            ManifestAnnotation::Known(known) => return Ok(Annotation::from(known)),
            ManifestAnnotation::Other(value) => value,
        };

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(AnnotationError::MissingType)?;

        // a known type only ends up here if its fields don't match, so re-parse for the reason
        match serde_json::from_value::<AnnotationV0>(value.clone()) {
            Ok(known) => Ok(Annotation::from(&known)),
            Err(err) if matches!(kind, "ceiling-height" | "measure-distance" | "cross-section") => {
                Err(AnnotationError::Malformed {
                    kind: kind.to_string(),
                    reason: err.to_string(),
                })
            }
            Err(_) => Err(AnnotationError::UnknownType(kind.to_string())),
        }
    }
}
