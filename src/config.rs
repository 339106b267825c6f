//! Configuration for the conversion gateway.
//!
//! Everything the gateway needs at startup lives in [`GatewayConfig`], built
//! through [`GatewayConfigBuilder`]. The CLI maps its flags (and their
//! environment fallbacks) onto the builder, and tests build configs directly.

use crate::error::GatewayError;
use std::fmt;
use std::path::PathBuf;

/// Default upload ceiling applied by the HTTP layer: 64 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Default service name reported by `/health`.
pub const DEFAULT_SERVICE_NAME: &str = "conversion-gateway";

/// Process-wide gateway configuration.
///
/// # Example
/// ```rust
/// use conversion_gateway::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .output_dir("/var/lib/converter/outputs")
///     .api_secret("s3cret")
///     .build()
///     .unwrap();
/// assert!(config.api_secret.is_some());
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Directory artifacts are written to. Created at startup if absent. Default: `./outputs`.
    pub output_dir: PathBuf,

    /// Shared secret expected in `X-Api-Key`. `None` disables the check.
    pub api_secret: Option<String>,

    /// Name reported by `/health`. Default: `conversion-gateway`.
    pub service_name: String,

    /// Maximum accepted request body in bytes. Default: 64 MiB.
    ///
    /// Uploads are buffered fully in memory, so this bounds per-request
    /// memory as well.
    pub max_upload_bytes: usize,

    /// Path to the pdfium shared library, or a directory containing it.
    /// `None` binds the system library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            api_secret: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pdfium_library: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("output_dir", &self.output_dir)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("service_name", &self.service_name)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("pdfium_library", &self.pdfium_library)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the shared secret. An empty string leaves auth disabled.
    pub fn api_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.config.api_secret = if secret.is_empty() { None } else { Some(secret) };
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if c.max_upload_bytes < 1024 {
            return Err(GatewayError::InvalidConfig(format!(
                "max upload size must be ≥ 1 KiB, got {} bytes",
                c.max_upload_bytes
            )));
        }
        if c.service_name.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "service name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
