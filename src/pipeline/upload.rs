//! Upload ingestion: buffer every multipart part of a request in memory.
//!
//! File parts become [`UploadedAsset`]s; plain text parts become form
//! values. Nothing here inspects the bytes; the validator does that.

use crate::error::GatewayError;
use axum::extract::Multipart;
use std::collections::HashMap;
use tracing::debug;

/// Field names that carry files on multi-file endpoints.
pub const MULTI_FILE_FIELDS: &[&str] = &["files", "files[]", "file"];

/// Field name that carries the file on single-file endpoints.
pub const SINGLE_FILE_FIELD: &str = "file";

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    /// Multipart field the part arrived under.
    pub field: String,
    /// Client-declared filename. Used for messages only.
    pub filename: Option<String>,
    /// Client-declared content type.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedAsset {
    pub fn new(field: impl Into<String>, filename: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            filename: filename.map(str::to_string),
            content_type: None,
            bytes,
        }
    }

    /// Name to show in error messages.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or(&self.field)
    }
}

/// Everything a multipart request carried.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedAsset>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain a multipart body. Parts with a filename, or sent under one of the
    /// file field names, are files; the rest are text fields (last value wins).
    pub async fn read(mut multipart: Multipart) -> Result<Self, GatewayError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| GatewayError::bad_upload(format!("Failed to parse multipart data: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            if filename.is_some() || MULTI_FILE_FIELDS.contains(&name.as_str()) {
                let bytes = field.bytes().await.map_err(|e| {
                    GatewayError::bad_upload(format!("Failed to read upload '{name}': {e}"))
                })?;
                debug!(
                    field = %name,
                    filename = ?filename,
                    size = bytes.len(),
                    "Buffered upload"
                );
                form.files.push(UploadedAsset {
                    field: name,
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    GatewayError::bad_upload(format!("Failed to read form field '{name}': {e}"))
                })?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// All files sent under any of `names`, in upload order.
    pub fn files_named(&mut self, names: &[&str]) -> Vec<UploadedAsset> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| names.contains(&f.field.as_str()));
        self.files = rest;
        taken
    }

    /// At least `min` files under the multi-file field names.
    pub fn take_files(&mut self, min: usize, message: &str) -> Result<Vec<UploadedAsset>, GatewayError> {
        let files = self.files_named(MULTI_FILE_FIELDS);
        if files.len() < min {
            return Err(GatewayError::bad_upload(message));
        }
        Ok(files)
    }

    /// Exactly one file under `file`.
    pub fn take_single(&mut self) -> Result<UploadedAsset, GatewayError> {
        let mut files = self.files_named(&[SINGLE_FILE_FIELD]);
        match files.len() {
            1 => Ok(files.remove(0)),
            0 => Err(GatewayError::bad_upload(
                "No file uploaded. Use field name \"file\".",
            )),
            n => Err(GatewayError::bad_upload(format!(
                "Expected exactly one file under \"file\", got {n}"
            ))),
        }
    }
}
