//! Artifact naming and references.
//!
//! Every artifact is stored as `<prefix>_<uuid-hex>.<ext>`. The random part is
//! a v4 UUID in simple form (32 lowercase hex chars, 122 random bits), so two
//! requests never pick the same name and nothing the client sends ends up in
//! a path.

use std::fmt;
use uuid::Uuid;

/// URL prefix artifacts are served under.
pub const OUTPUTS_MOUNT: &str = "/outputs";

/// A generated or validated artifact file name.
///
/// Construct with [`ArtifactName::generate`] for new artifacts or
/// [`ArtifactName::parse`] for names arriving from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Fresh unique name: `<prefix>_<uuid-hex>.<ext>`.
    pub fn generate(prefix: &str, ext: &str) -> Self {
        Self(format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), ext))
    }

    /// Accept a client-supplied name only if it is a single, plain path segment.
    pub fn parse(name: &str) -> Option<Self> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0'])
            && !name.contains("..");
        plain.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public relative URL of this artifact.
    pub fn reference(&self) -> String {
        format!("{}/{}", OUTPUTS_MOUNT, self.0)
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A converted byte stream waiting to be persisted.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub prefix: String,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(prefix: impl Into<String>, extension: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            prefix: prefix.into(),
            extension,
            bytes,
        }
    }

    /// One artifact per page, prefixed `<stem>_<n>` with 1-based `n`.
    pub fn numbered(stem: &str, extension: &'static str, pages: Vec<Vec<u8>>) -> Vec<Self> {
        pages
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| Self::new(format!("{}_{}", stem, i + 1), extension, bytes))
            .collect()
    }
}
