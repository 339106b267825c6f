//! JSON response bodies.
//!
//! Field names follow the wire format clients already consume (`fileUrl`,
//! `pageCount`), hence the camelCase renaming.

use crate::artifact::ArtifactName;
use serde::{Deserialize, Serialize};

/// Response for operations producing exactly one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleArtifactResponse {
    pub success: bool,
    /// `/outputs/<filename>`.
    pub file_url: String,
    pub filename: String,
    /// Set only by image compression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl SingleArtifactResponse {
    pub fn new(name: &ArtifactName) -> Self {
        Self {
            success: true,
            file_url: name.reference(),
            filename: name.as_str().to_string(),
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Response for per-page operations (rasterise, split).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactListResponse {
    pub success: bool,
    /// References in page order.
    pub files: Vec<String>,
    pub page_count: usize,
}

impl ArtifactListResponse {
    pub fn new(names: &[ArtifactName]) -> Self {
        Self {
            success: true,
            files: names.iter().map(ArtifactName::reference).collect(),
            page_count: names.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
}
