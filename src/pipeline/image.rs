//! Image re-encoding: format conversion and JPEG recompression.
//!
//! Both operations first flatten the source to 8-bit RGB, so alpha channels,
//! palettes and 16-bit depths never leak into the output encoders.

use crate::error::GatewayError;
use crate::pipeline::validate::ValidatedImage;
use image::{DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType, Encoder};
use std::io::Cursor;
use tracing::debug;

/// Lowest accepted JPEG quality.
pub const MIN_QUALITY: u8 = 5;
/// Highest accepted JPEG quality.
pub const MAX_QUALITY: u8 = 95;
/// Quality used when the client sends none.
pub const DEFAULT_QUALITY: u8 = 75;

/// Output format for image→image conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Png,
    Jpeg,
    WebP,
}

impl TargetFormat {
    /// Parse a client-supplied format name (trimmed, case-insensitive).
    /// `jpg` and `jpeg` both select JPEG.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        match raw.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            _ => Err(GatewayError::invalid_parameter(
                "Unsupported target_format. Use png, jpeg, webp",
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// JPEG quality percentage, guaranteed within `MIN_QUALITY..=MAX_QUALITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Result<Self, GatewayError> {
        if (MIN_QUALITY as i64..=MAX_QUALITY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(GatewayError::invalid_parameter(format!(
                "Quality must be between {MIN_QUALITY} and {MAX_QUALITY}"
            )))
        }
    }

    /// Parse the optional `quality` form field; absent or blank means the default.
    pub fn parse(raw: Option<&str>) -> Result<Self, GatewayError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self(DEFAULT_QUALITY)),
            Some(s) => {
                let value: i64 = s.parse().map_err(|_| {
                    GatewayError::invalid_parameter(format!("Quality must be an integer, got '{s}'"))
                })?;
                Self::new(value)
            }
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

fn to_rgb(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageRgb8(image.to_rgb8())
}

/// Re-encode an image in `target` format.
pub fn reformat(source: &ValidatedImage, target: TargetFormat) -> Result<Vec<u8>, GatewayError> {
    let rgb = to_rgb(&source.image);
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), target.image_format())
        .map_err(|e| GatewayError::conversion("convert image", e))?;
    debug!(
        "Re-encoded {:?} → {:?}: {} bytes",
        source.format,
        target,
        buf.len()
    );
    Ok(buf)
}

/// Re-encode an image as JPEG at `quality` with per-image optimised
/// Huffman tables.
pub fn compress(source: &ValidatedImage, quality: Quality) -> Result<Vec<u8>, GatewayError> {
    let rgb = source.image.to_rgb8();
    let (width, height) = match (u16::try_from(rgb.width()), u16::try_from(rgb.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(GatewayError::conversion(
                "compress image",
                format!("{}x{} exceeds the JPEG size limit", rgb.width(), rgb.height()),
            ))
        }
    };
    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, quality.value());
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| GatewayError::conversion("compress image", e))?;
    debug!(
        "Compressed {} → {} bytes at quality {}",
        source.encoded.len(),
        buf.len(),
        quality.value()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil;
    use crate::pipeline::upload::UploadedAsset;
    use crate::pipeline::validate::decode_image;

    fn validated(bytes: Vec<u8>) -> ValidatedImage {
        decode_image(UploadedAsset::new("file", None, bytes), false).unwrap()
    }

    #[test]
    fn target_format_parsing() {
        assert_eq!(TargetFormat::parse("png").unwrap(), TargetFormat::Png);
        assert_eq!(TargetFormat::parse("  JPG ").unwrap(), TargetFormat::Jpeg);
        assert_eq!(TargetFormat::parse("jpeg").unwrap(), TargetFormat::Jpeg);
        assert_eq!(TargetFormat::parse("WebP").unwrap(), TargetFormat::WebP);
        assert!(matches!(
            TargetFormat::parse("gif"),
            Err(GatewayError::InvalidParameter { .. })
        ));
        assert!(TargetFormat::parse("").is_err());
    }

    #[test]
    fn jpeg_aliases_share_extension() {
        assert_eq!(TargetFormat::parse("jpeg").unwrap().extension(), "jpg");
        assert_eq!(TargetFormat::parse("jpg").unwrap().extension(), "jpg");
    }

    #[test]
    fn quality_bounds() {
        assert!(Quality::new(5).is_ok());
        assert!(Quality::new(95).is_ok());
        for bad in [4, 96, 0, -1, 100] {
            let err = Quality::new(bad).unwrap_err();
            assert_eq!(err.to_string(), "Quality must be between 5 and 95");
        }
    }

    #[test]
    fn quality_parse_defaults_and_rejects_garbage() {
        assert_eq!(Quality::parse(None).unwrap().value(), 75);
        assert_eq!(Quality::parse(Some(" ")).unwrap().value(), 75);
        assert_eq!(Quality::parse(Some("40")).unwrap().value(), 40);
        assert!(matches!(
            Quality::parse(Some("high")),
            Err(GatewayError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn webp_keeps_dimensions() {
        let src = validated(testutil::rgba_png(13, 9));
        let out = reformat(&src, TargetFormat::WebP).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (13, 9));
    }

    #[test]
    fn reformat_to_png_and_jpeg() {
        let src = validated(testutil::jpeg(20, 10));
        let png = reformat(&src, TargetFormat::Png).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let jpg = reformat(&src, TargetFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn compress_outputs_rgb_jpeg() {
        let src = validated(testutil::rgba_png(32, 24));
        let out = compress(&src, Quality::new(5).unwrap()).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
        assert!(decoded.color().channel_count() == 3);
    }

    /// Symbol counts of every Huffman table, keyed by (class, id).
    fn huffman_symbol_counts(jpeg: &[u8]) -> Vec<((u8, u8), usize)> {
        let mut tables = Vec::new();
        let mut i = 2;
        while i + 4 <= jpeg.len() && jpeg[i] == 0xFF && jpeg[i + 1] != 0xDA {
            let len = u16::from_be_bytes([jpeg[i + 2], jpeg[i + 3]]) as usize;
            if jpeg[i + 1] == 0xC4 {
                let mut j = i + 4;
                while j < i + 2 + len {
                    let class_id = (jpeg[j] >> 4, jpeg[j] & 0x0F);
                    let count: usize = jpeg[j + 1..j + 17].iter().map(|&n| n as usize).sum();
                    tables.push((class_id, count));
                    j += 17 + count;
                }
            }
            i += 2 + len;
        }
        tables
    }

    #[test]
    fn compress_uses_optimised_huffman_tables() {
        let src = validated(testutil::png(64, 64));
        let out = compress(&src, Quality::new(75).unwrap()).unwrap();
        let tables = huffman_symbol_counts(&out);
        let luma_dc = tables
            .iter()
            .find(|(class_id, _)| *class_id == (0, 0))
            .map(|(_, count)| *count)
            .unwrap();
        // The stock luminance DC table defines all 12 categories.
        assert!(luma_dc < 12, "luminance DC table has {luma_dc} symbols");
    }
}
