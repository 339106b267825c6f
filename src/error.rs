//! Error types for the conversion gateway.
//!
//! Every request either produces its artifacts or fails with exactly one
//! [`GatewayError`]. Variants split into two families:
//!
//! * **Client errors**: the upload or its parameters are wrong
//!   (`Unauthorized`, `BadUpload`, `InvalidImage`, `InvalidPdf`,
//!   `InvalidParameter`). Surfaced verbatim with a 4xx status.
//!
//! * **Server errors**: a codec or the artifact store failed
//!   (`ConversionError`, `StorageError`, `Internal`). Surfaced as 500 with the
//!   underlying message included.
//!
//! `InvalidConfig` is raised at startup by the configuration builder and
//! never reaches a client.
//!
//! Nothing is retried. A failure after some artifacts were already written
//! leaves those artifacts in place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::io;
use thiserror::Error;

/// All errors returned by the gateway's conversion lifecycle.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// A secret is configured and the request did not present it.
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing, insufficient or unreadable uploads.
    #[error("{message}")]
    BadUpload { message: String },

    /// An upload could not be decoded as an image.
    #[error("{}", invalid_input_message("image", filename.as_deref()))]
    InvalidImage { filename: Option<String> },

    /// An upload could not be parsed as a PDF document.
    #[error("{}", invalid_input_message("PDF", filename.as_deref()))]
    InvalidPdf { filename: Option<String> },

    /// Out-of-range quality or unsupported target format.
    #[error("{message}")]
    InvalidParameter { message: String },

    // ── Server errors ─────────────────────────────────────────────────────
    /// The underlying image or PDF codec failed on validated input.
    #[error("Failed to {operation}: {detail}")]
    ConversionError { operation: String, detail: String },

    /// Writing an artifact to the store failed.
    #[error("Failed to write artifact '{name}': {source}")]
    StorageError {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The configuration builder rejected a setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn bad_upload(message: impl Into<String>) -> Self {
        Self::BadUpload {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn conversion(operation: impl Into<String>, detail: impl ToString) -> Self {
        Self::ConversionError {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::BadUpload { .. }
                | Self::InvalidImage { .. }
                | Self::InvalidPdf { .. }
                | Self::InvalidParameter { .. }
        )
    }
}

impl GatewayError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadUpload { .. }
            | Self::InvalidImage { .. }
            | Self::InvalidPdf { .. }
            | Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::ConversionError { .. }
            | Self::StorageError { .. }
            | Self::InvalidConfig(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unauthorized => tracing::info!("Rejected request: {}", self),
            e if e.is_client_error() => tracing::debug!("Client error: {}", self),
            _ => tracing::error!("Conversion failed: {}", self),
        }

        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

fn invalid_input_message(kind: &str, filename: Option<&str>) -> String {
    match filename {
        Some(name) => format!("Uploaded file {name} is not a valid {kind}."),
        None => format!("Invalid {kind} file"),
    }
}

/// Errors raised by [`crate::store::ArtifactStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error("I/O error on artifact '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(name) => GatewayError::StorageError {
                source: io::Error::new(io::ErrorKind::NotFound, "artifact not found"),
                name,
            },
            StoreError::Io { name, source } => GatewayError::StorageError { name, source },
        }
    }
}
