//! The conversion lifecycle shared by every endpoint.
//!
//! ```text
//! UploadForm ──▶ parameter check ──▶ validate ──▶ convert ──▶ persist ──▶ reference
//! ```
//!
//! Parameters are checked before any decoding, and decoding happens before
//! any write, so a rejected request never leaves an artifact behind. Codec
//! work (validation included) runs on the blocking pool; only persistence is
//! async.
//!
//! Authentication is not repeated here: [`Gateway::authorize`] is called by
//! the HTTP layer before the body is read.

use crate::artifact::{Artifact, ArtifactName};
use crate::auth::ApiKeyGuard;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::output::{ArtifactListResponse, CleanupResponse, HealthResponse, SingleArtifactResponse};
use crate::pipeline::image::{self as imaging, Quality, TargetFormat};
use crate::pipeline::upload::UploadForm;
use crate::pipeline::validate::{decode_image, open_pdf, ValidatedImage, ValidatedPdf};
use crate::pipeline::{pack, pdf, render};
use crate::store::{self, ArtifactStore};
use std::sync::Arc;
use tracing::info;

/// Owns the process-wide state every conversion needs: the artifact store,
/// the auth guard and the configuration. Cheap to share behind an `Arc`.
pub struct Gateway {
    config: GatewayConfig,
    guard: ApiKeyGuard,
    store: Arc<dyn ArtifactStore>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, store: Arc<dyn ArtifactStore>) -> Self {
        let guard = ApiKeyGuard::new(config.api_secret.clone());
        Self {
            config,
            guard,
            store,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Check the client's `X-Api-Key` against the configured secret.
    pub fn authorize(&self, supplied: Option<&str>) -> Result<(), GatewayError> {
        self.guard.check(supplied)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            ok: true,
            service: self.config.service_name.clone(),
        }
    }

    // ── Image operations ─────────────────────────────────────────────────

    /// Pack every uploaded image into one PDF, one page per image.
    pub async fn image_to_pdf(&self, mut form: UploadForm) -> Result<SingleArtifactResponse, GatewayError> {
        let assets = form.take_files(1, "No files uploaded. Use field name \"file\".")?;
        let count = assets.len();

        let bytes = blocking("image-to-pdf", move || {
            let images = assets
                .into_iter()
                .map(|asset| decode_image(asset, true))
                .collect::<Result<Vec<ValidatedImage>, _>>()?;
            pack::images_to_pdf(&images)
        })
        .await?;

        let name = self.persist_one(Artifact::new("converted", "pdf", bytes)).await?;
        info!("image-to-pdf: {} images → {}", count, name);
        Ok(SingleArtifactResponse::new(&name))
    }

    /// Scanned pages are just images; same conversion as [`Self::image_to_pdf`].
    pub async fn scan_to_pdf(&self, form: UploadForm) -> Result<SingleArtifactResponse, GatewayError> {
        self.image_to_pdf(form).await
    }

    /// Re-encode one image as `target_format`.
    pub async fn image_to_image(&self, mut form: UploadForm) -> Result<SingleArtifactResponse, GatewayError> {
        let asset = form.take_single()?;
        let target = TargetFormat::parse(form.field("target_format").unwrap_or_default())?;

        let bytes = blocking("image-to-image", move || {
            let image = decode_image(asset, false)?;
            imaging::reformat(&image, target)
        })
        .await?;

        let name = self
            .persist_one(Artifact::new("converted_img", target.extension(), bytes))
            .await?;
        info!("image-to-image: {:?} → {}", target, name);
        Ok(SingleArtifactResponse::new(&name))
    }

    /// Recompress one image as JPEG at the requested quality.
    pub async fn image_compress(&self, mut form: UploadForm) -> Result<SingleArtifactResponse, GatewayError> {
        let asset = form.take_single()?;
        let quality = Quality::parse(form.field("quality"))?;

        let bytes = blocking("image-compress", move || {
            let image = decode_image(asset, false)?;
            imaging::compress(&image, quality)
        })
        .await?;

        let name = self.persist_one(Artifact::new("compressed", "jpg", bytes)).await?;
        info!("image-compress: quality {} → {}", quality.value(), name);
        Ok(SingleArtifactResponse::new(&name).with_quality(quality.value()))
    }

    // ── PDF operations ───────────────────────────────────────────────────

    /// Rasterise every page to PNG.
    pub async fn pdf_to_images(&self, mut form: UploadForm) -> Result<ArtifactListResponse, GatewayError> {
        let asset = form.take_single()?;
        let document = blocking("pdf-to-images", move || open_pdf(asset, false)).await?;

        let pages = render::rasterize(document, self.config.pdfium_library.clone()).await?;
        let names = store::persist_all(self.store(), Artifact::numbered("page", "png", pages)).await?;
        info!("pdf-to-images: {} pages", names.len());
        Ok(ArtifactListResponse::new(&names))
    }

    /// Concatenate two or more PDFs in upload order.
    pub async fn pdf_merge(&self, mut form: UploadForm) -> Result<SingleArtifactResponse, GatewayError> {
        let assets = form.take_files(2, "Upload two or more PDF files to merge")?;
        let count = assets.len();

        let bytes = blocking("pdf-merge", move || {
            let documents = assets
                .into_iter()
                .map(|asset| open_pdf(asset, true))
                .collect::<Result<Vec<ValidatedPdf>, _>>()?;
            pdf::merge(documents)
        })
        .await?;

        let name = self.persist_one(Artifact::new("merged", "pdf", bytes)).await?;
        info!("pdf-merge: {} documents → {}", count, name);
        Ok(SingleArtifactResponse::new(&name))
    }

    /// One single-page PDF per page.
    pub async fn pdf_split(&self, mut form: UploadForm) -> Result<ArtifactListResponse, GatewayError> {
        let asset = form.take_single()?;

        let pages = blocking("pdf-split", move || pdf::split(open_pdf(asset, false)?)).await?;

        let names = store::persist_all(self.store(), Artifact::numbered("split", "pdf", pages)).await?;
        info!("pdf-split: {} pages", names.len());
        Ok(ArtifactListResponse::new(&names))
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Delete every artifact in the store, best effort.
    pub async fn cleanup(&self) -> Result<CleanupResponse, GatewayError> {
        let removed = store::sweep(self.store()).await?;
        Ok(CleanupResponse {
            success: true,
            removed,
        })
    }

    /// Look up an artifact for static serving. Invalid names read as absent.
    pub async fn fetch(&self, name: &str) -> Result<Option<(ArtifactName, Vec<u8>)>, GatewayError> {
        let Some(name) = ArtifactName::parse(name) else {
            return Ok(None);
        };
        let bytes = self.store.read(&name).await?;
        Ok(bytes.map(|b| (name, b)))
    }

    async fn persist_one(&self, artifact: Artifact) -> Result<ArtifactName, GatewayError> {
        store::persist_all(self.store(), vec![artifact])
            .await?
            .pop()
            .ok_or_else(|| GatewayError::Internal("artifact was not persisted".into()))
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Run CPU-bound codec work on the blocking pool.
async fn blocking<T, F>(operation: &'static str, work: F) -> Result<T, GatewayError>
where
    F: FnOnce() -> Result<T, GatewayError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GatewayError::Internal(format!("{} task panicked: {}", operation, e)))?
}
