//! Fixtures shared by the pipeline unit tests.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object};
use std::io::Cursor;

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn png(w: u32, h: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 200, 30]))),
        ImageFormat::Png,
    )
}

pub fn rgba_png(w: u32, h: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 128]))),
        ImageFormat::Png,
    )
}

pub fn jpeg(w: u32, h: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 255]))),
        ImageFormat::Jpeg,
    )
}

pub fn gray_jpeg(w: u32, h: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([128]))),
        ImageFormat::Jpeg,
    )
}

/// A four-component (Adobe CMYK) JPEG.
pub fn cmyk_jpeg(w: u16, h: u16) -> Vec<u8> {
    let pixels: Vec<u8> = (0..w as usize * h as usize)
        .flat_map(|_| [0u8, 200, 255, 30])
        .collect();
    let mut buf = Vec::new();
    jpeg_encoder::Encoder::new(&mut buf, 90)
        .encode(&pixels, w, h, jpeg_encoder::ColorType::Cmyk)
        .unwrap();
    buf
}

/// A PDF with `pages` blank pages. Page `i` (0-based) is `100 + i` points
/// wide so tests can recover page order from the MediaBox.
pub fn pdf(pages: usize) -> Vec<u8> {
    pdf_with_widths(&(0..pages).map(|i| 100 + i as i64).collect::<Vec<_>>())
}

pub fn pdf_with_widths(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = widths
        .iter()
        .map(|&w| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), w.into(), 200.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => widths.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// MediaBox widths of every page, in page order.
pub fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}
