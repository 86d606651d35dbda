//! Image-definitions manifest
//!
//! The manifest is the artifact that triggers rollout: a JSON array of
//! `{"name": ..., "imageUri": ...}` objects, exactly one per deployment in this
//! design. The orchestrator parses it structurally, so the rendered bytes are a
//! wire format: rendering is direct string formatting, never a serializer,
//! and must stay stable across releases.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::domain::image::ImageReference;
use crate::error::DeploymentError;

/// Default file name for the manifest inside its artifact
pub const DEFAULT_MANIFEST_FILE: &str = "imagedefinitions.json";

/// One container-name-to-image-URI entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageDefinition {
    pub name: String,
    #[serde(rename = "imageUri")]
    pub image_uri: String,
}

impl ImageDefinition {
    pub fn new(name: impl Into<String>, image: &ImageReference) -> Self {
        Self {
            name: name.into(),
            image_uri: image.uri(),
        }
    }
}

/// Render the manifest in its exact wire shape:
/// `[{"name":"<container-name>","imageUri":"<registry-uri>:<tag>"}]`
pub fn render_image_definitions(definitions: &[ImageDefinition]) -> String {
    let entries: Vec<String> = definitions
        .iter()
        .map(|definition| {
            format!(
                "{{\"name\":\"{}\",\"imageUri\":\"{}\"}}",
                definition.name, definition.image_uri
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}

/// Parse manifest content produced by [`render_image_definitions`].
///
/// Accepts any structurally valid JSON array of definitions, then enforces the
/// single-entry single-container shape with non-empty fields.
pub fn parse_image_definitions(content: &str) -> Result<Vec<ImageDefinition>, DeploymentError> {
    let definitions: Vec<ImageDefinition> =
        serde_json::from_str(content).map_err(|e| DeploymentError::MalformedManifest {
            message: e.to_string(),
        })?;

    if definitions.is_empty() {
        return Err(DeploymentError::MalformedManifest {
            message: "manifest contains no image definitions".to_string(),
        });
    }
    for definition in &definitions {
        if definition.name.is_empty() || definition.image_uri.is_empty() {
            return Err(DeploymentError::MalformedManifest {
                message: format!(
                    "image definition has empty fields: name={:?} imageUri={:?}",
                    definition.name, definition.image_uri
                ),
            });
        }
    }
    Ok(definitions)
}

/// Hex SHA-256 of manifest content, logged for idempotence checks across runs
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
