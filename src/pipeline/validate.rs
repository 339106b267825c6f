//! Format validation: prove an upload decodes before any converter sees it.
//!
//! Converters only accept [`ValidatedImage`] and [`ValidatedPdf`], and the
//! only way to build those is through this module, so an unchecked buffer
//! cannot reach a codec.

use crate::error::GatewayError;
use crate::pipeline::upload::UploadedAsset;
use image::{DynamicImage, ImageFormat};
use lopdf::Document;
use tracing::debug;

/// An upload that decoded as an image.
pub struct ValidatedImage {
    pub image: DynamicImage,
    /// Container format detected from the bytes.
    pub format: ImageFormat,
    /// Original encoded bytes, kept for lossless passthrough.
    pub encoded: Vec<u8>,
}

/// An upload that parsed as a PDF document.
pub struct ValidatedPdf {
    pub document: Document,
    /// Original bytes, needed by the rasteriser.
    pub bytes: Vec<u8>,
}

impl ValidatedPdf {
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

/// Decode an upload as an image.
///
/// `name_upload` controls whether the error message names the file; multi-file
/// endpoints set it so the client knows which upload was rejected.
pub fn decode_image(asset: UploadedAsset, name_upload: bool) -> Result<ValidatedImage, GatewayError> {
    let invalid = || GatewayError::InvalidImage {
        filename: name_upload.then(|| asset.display_name().to_string()),
    };

    let format = image::guess_format(&asset.bytes).map_err(|_| invalid())?;
    let decoded = image::load_from_memory_with_format(&asset.bytes, format).map_err(|e| {
        debug!("Rejected {}: {}", asset.display_name(), e);
        invalid()
    })?;

    debug!(
        "Validated image {} ({:?}, {}x{})",
        asset.display_name(),
        format,
        decoded.width(),
        decoded.height()
    );

    Ok(ValidatedImage {
        image: decoded,
        format,
        encoded: asset.bytes,
    })
}

/// Parse an upload as a PDF document.
pub fn open_pdf(asset: UploadedAsset, name_upload: bool) -> Result<ValidatedPdf, GatewayError> {
    let document = Document::load_mem(&asset.bytes).map_err(|e| {
        debug!("Rejected {}: {}", asset.display_name(), e);
        GatewayError::InvalidPdf {
            filename: name_upload.then(|| asset.display_name().to_string()),
        }
    })?;

    debug!(
        "Validated PDF {} ({} pages)",
        asset.display_name(),
        document.get_pages().len()
    );

    Ok(ValidatedPdf {
        document,
        bytes: asset.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil;

    #[test]
    fn png_is_accepted() {
        let bytes = testutil::png(7, 5);
        let v = decode_image(UploadedAsset::new("file", Some("a.png"), bytes), false).unwrap();
        assert_eq!(v.format, ImageFormat::Png);
        assert_eq!((v.image.width(), v.image.height()), (7, 5));
    }

    #[test]
    fn text_is_rejected_as_image() {
        let asset = UploadedAsset::new("files", Some("notes.txt"), b"just some text".to_vec());
        let err = decode_image(asset, true).err().unwrap();
        assert_eq!(err.to_string(), "Uploaded file notes.txt is not a valid image.");
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut bytes = testutil::png(16, 16);
        bytes.truncate(30);
        let asset = UploadedAsset::new("file", Some("broken.png"), bytes);
        assert!(matches!(
            decode_image(asset, false),
            Err(GatewayError::InvalidImage { filename: None })
        ));
    }

    #[test]
    fn pdf_is_accepted_with_page_count() {
        let v = open_pdf(UploadedAsset::new("file", None, testutil::pdf(3)), false).unwrap();
        assert_eq!(v.page_count(), 3);
    }

    #[test]
    fn image_is_rejected_as_pdf() {
        let asset = UploadedAsset::new("file", Some("photo.png"), testutil::png(2, 2));
        assert!(matches!(open_pdf(asset, false), Err(GatewayError::InvalidPdf { .. })));
    }
}
