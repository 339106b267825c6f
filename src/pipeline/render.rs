//! PDF rasterisation: render every page to PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with process-global state; `thread_safe` serialises
//! calls into it but every call still blocks. Rendering therefore runs on the
//! blocking pool so Tokio workers keep serving other requests.
//!
//! Pages are rendered at a fixed 2× scale (144 DPI for a 72 pt/inch page).

use crate::error::GatewayError;
use crate::pipeline::validate::ValidatedPdf;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scale factor applied to every page.
pub const RENDER_SCALE: f32 = 2.0;

const OPERATION: &str = "render PDF pages";

/// Bind to libpdfium.
///
/// `library` may name the shared library itself or a directory containing it
/// under the platform's usual file name. `None` uses the system loader path.
pub fn bind(library: Option<&Path>) -> Result<Pdfium, GatewayError> {
    let bindings = match library {
        Some(dir) if dir.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        }
        Some(file) => Pdfium::bind_to_library(file),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| GatewayError::conversion("load pdfium", e))?;
    Ok(Pdfium::new(bindings))
}

/// Rasterise every page of `pdf` to PNG bytes, in page order.
///
/// A document without pages yields an empty vector.
pub async fn rasterize(
    pdf: ValidatedPdf,
    library: Option<PathBuf>,
) -> Result<Vec<Vec<u8>>, GatewayError> {
    if pdf.page_count() == 0 {
        debug!("PDF has no pages; nothing to render");
        return Ok(Vec::new());
    }

    tokio::task::spawn_blocking(move || rasterize_blocking(&pdf.bytes, library.as_deref()))
        .await
        .map_err(|e| GatewayError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterize_blocking(bytes: &[u8], library: Option<&Path>) -> Result<Vec<Vec<u8>>, GatewayError> {
    let pdfium = bind(library)?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        debug!("pdfium rejected document: {:?}", e);
        GatewayError::InvalidPdf { filename: None }
    })?;

    let pages = document.pages();
    info!("Rendering {} pages at {}x", pages.len(), RENDER_SCALE);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);
    let mut outputs = Vec::with_capacity(pages.len() as usize);

    for (index, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| GatewayError::conversion(OPERATION, format!("page {}: {:?}", index + 1, e)))?;
        let image = bitmap.as_image();

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| GatewayError::conversion(OPERATION, e))?;

        debug!(
            "Rendered page {} → {}x{} px, {} bytes",
            index + 1,
            image.width(),
            image.height(),
            png.len()
        );
        outputs.push(png);
    }

    Ok(outputs)
}
