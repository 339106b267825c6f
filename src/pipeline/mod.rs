//! Conversion pipeline stages.
//!
//! Each submodule implements one step of the request lifecycle. Handlers in
//! [`crate::convert`] chain them; none of them touch HTTP or storage.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ validate ──▶ image / pack / pdf / render
//! (multipart) (decode)     (re-encode, pack, merge/split, rasterise)
//! ```
//!
//! 1. [`upload`]   : buffer multipart parts into [`upload::UploadedAsset`]s
//! 2. [`validate`] : prove each upload decodes; the only constructor of
//!    [`validate::ValidatedImage`] and [`validate::ValidatedPdf`]
//! 3. [`image`]    : format conversion and JPEG recompression
//! 4. [`pack`]     : images to a multi-page PDF
//! 5. [`pdf`]      : structural merge and split (lopdf)
//! 6. [`render`]   : page rasterisation (pdfium); the only stage with a
//!    native dependency

pub mod image;
pub mod pack;
pub mod pdf;
pub mod render;
pub mod upload;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;
