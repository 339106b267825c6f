//! Image → PDF packing: one page per image, in upload order.
//!
//! Each page is exactly the image's pixel size in points (1 px = 1 pt) and
//! holds a single image XObject stretched over the whole MediaBox.
//!
//! JPEG uploads with one (gray) or three (YCbCr/RGB) components are embedded
//! byte-for-byte with `DCTDecode`, so packing them is lossless and cheap.
//! The decoder reports CMYK/YCCK JPEGs as RGB, so the component count is read
//! from the frame header itself. Everything else, four-component JPEGs
//! included, is flattened to 8-bit RGB and stored zlib-compressed with
//! `FlateDecode`.

use crate::error::GatewayError;
use crate::pipeline::validate::ValidatedImage;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ColorType, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use tracing::debug;

const OPERATION: &str = "convert image to pdf";

/// Pack validated images into a single PDF, preserving their order.
pub fn images_to_pdf(images: &[ValidatedImage]) -> Result<Vec<u8>, GatewayError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for (i, source) in images.iter().enumerate() {
        let (width, height) = (source.image.width(), source.image.height());
        let image_id = doc.add_object(image_xobject(source)?);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        (width as i64).into(),
                        0.into(),
                        0.into(),
                        (height as i64).into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| GatewayError::conversion(OPERATION, e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(page_id.into());
        debug!("Packed image {} as {}x{} pt page", i + 1, width, height);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| GatewayError::conversion(OPERATION, e))?;
    Ok(out)
}

/// Build the image XObject stream for one source image.
fn image_xobject(source: &ValidatedImage) -> Result<Stream, GatewayError> {
    let (width, height) = (source.image.width() as i64, source.image.height() as i64);

    let passthrough = match source.format {
        ImageFormat::Jpeg => match (jpeg_components(&source.encoded), source.image.color()) {
            (Some(3), ColorType::Rgb8) => Some("DeviceRGB"),
            (Some(1), ColorType::L8) => Some("DeviceGray"),
            _ => None,
        },
        _ => None,
    };

    if let Some(color_space) = passthrough {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        return Ok(Stream::new(dict, source.encoded.clone()).with_compression(false));
    }

    let rgb = source.image.to_rgb8();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .map_err(|e| GatewayError::conversion(OPERATION, e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| GatewayError::conversion(OPERATION, e))?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Component count from a JPEG's start-of-frame header, if one is found
/// before the scan data.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut i = 2;
    while i + 3 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        match marker {
            // Fill byte.
            0xFF => {
                i += 1;
                continue;
            }
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            // Start of scan: no frame header seen.
            0xDA => return None,
            _ => {}
        }
        let length = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        // SOF0..SOF15, minus DHT (C4), JPG (C8) and DAC (CC).
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return bytes.get(i + 9).copied();
        }
        i += 2 + length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil;
    use crate::pipeline::upload::UploadedAsset;
    use crate::pipeline::validate::decode_image;

    fn validated(bytes: Vec<u8>) -> ValidatedImage {
        decode_image(UploadedAsset::new("files", None, bytes), true).unwrap()
    }

    fn xobject_filters(pdf: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|&page_id| {
                let page = doc.get_dictionary(page_id).unwrap();
                let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
                let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
                let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
                let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
                stream.dict.get(b"Filter").unwrap().as_name().unwrap().to_vec()
            })
            .collect()
    }

    #[test]
    fn one_page_per_image_in_upload_order() {
        let images = vec![
            validated(testutil::png(101, 50)),
            validated(testutil::jpeg(102, 60)),
            validated(testutil::rgba_png(103, 70)),
        ];
        let pdf = images_to_pdf(&images).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(testutil::page_widths(&pdf), vec![101, 102, 103]);
    }

    #[test]
    fn jpeg_is_embedded_without_reencoding() {
        let images = vec![validated(testutil::jpeg(8, 8)), validated(testutil::png(8, 8))];
        let pdf = images_to_pdf(&images).unwrap();
        assert_eq!(
            xobject_filters(&pdf),
            vec![b"DCTDecode".to_vec(), b"FlateDecode".to_vec()]
        );
    }

    fn xobject_color_spaces(pdf: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| matches!(s.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image")))
            .map(|s| s.dict.get(b"ColorSpace").unwrap().as_name().unwrap().to_vec())
            .collect()
    }

    #[test]
    fn gray_jpeg_is_embedded_as_device_gray() {
        let pdf = images_to_pdf(&[validated(testutil::gray_jpeg(9, 7))]).unwrap();
        assert_eq!(xobject_filters(&pdf), vec![b"DCTDecode".to_vec()]);
        assert_eq!(xobject_color_spaces(&pdf), vec![b"DeviceGray".to_vec()]);
        assert_eq!(testutil::page_widths(&pdf), vec![9]);
    }

    #[test]
    fn cmyk_jpeg_is_reencoded_as_rgb() {
        let cmyk = testutil::cmyk_jpeg(8, 8);
        assert_eq!(jpeg_components(&cmyk), Some(4));

        let pdf = images_to_pdf(&[validated(cmyk)]).unwrap();
        assert_eq!(xobject_filters(&pdf), vec![b"FlateDecode".to_vec()]);
        assert_eq!(xobject_color_spaces(&pdf), vec![b"DeviceRGB".to_vec()]);
    }

    #[test]
    fn frame_header_component_counts() {
        assert_eq!(jpeg_components(&testutil::jpeg(4, 4)), Some(3));
        assert_eq!(jpeg_components(&testutil::gray_jpeg(4, 4)), Some(1));
        assert_eq!(jpeg_components(&testutil::png(4, 4)), None);
        assert_eq!(jpeg_components(&[0xFF, 0xD8, 0xFF]), None);
    }

    #[test]
    fn single_image() {
        let pdf = images_to_pdf(&[validated(testutil::png(4, 4))]).unwrap();
        assert_eq!(testutil::page_widths(&pdf), vec![4]);
    }
}
