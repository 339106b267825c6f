//! Structural PDF operations: merge and split.
//!
//! Pages can inherit `Resources`, `MediaBox`, `CropBox` and `Rotate` from
//! their ancestors in the page tree. Both operations re-parent pages, so the
//! inherited values are copied onto each page first; otherwise a page would
//! lose its fonts or size the moment it leaves its original tree.

use crate::error::GatewayError;
use crate::pipeline::validate::ValidatedPdf;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;
use tracing::debug;

const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Copy inheritable attributes from a page's ancestors onto the page itself.
fn flatten_inherited(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        // Guards against cyclic Parent chains in damaged files.
        depth += 1;
        if depth > 64 {
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(page)
}

/// Page ids of `doc` in page order.
fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Concatenate all pages of `sources`, document by document, page by page.
pub fn merge(sources: Vec<ValidatedPdf>) -> Result<Vec<u8>, GatewayError> {
    let fail = |e: lopdf::Error| GatewayError::conversion("merge PDFs", e);

    let mut merged = Document::with_version("1.5");
    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    let mut next_id = merged.max_id + 1;

    for (index, source) in sources.into_iter().enumerate() {
        let mut doc = source.document;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let ids = page_ids(&doc);
        let mut pages = Vec::with_capacity(ids.len());
        for &id in &ids {
            let mut page = flatten_inherited(&doc, id).map_err(fail)?;
            page.set("Parent", pages_id);
            pages.push((id, page));
        }
        debug!("Merging document {} ({} pages)", index + 1, pages.len());

        // Keep everything except the old page-tree scaffolding; pruning below
        // drops objects nothing references any more.
        for (id, object) in doc.objects {
            let skip = matches!(
                object.type_name().unwrap_or(""),
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline"
            );
            if !skip {
                merged.objects.insert(id, object);
            }
        }
        for (id, page) in pages {
            merged.objects.insert(id, Object::Dictionary(page));
            kids.push(id.into());
        }
    }

    merged.max_id = next_id.saturating_sub(1).max(pages_id.0);
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    merged.renumber_objects();

    let mut out = Vec::new();
    merged.save_to(&mut out).map_err(|e| fail(e.into()))?;
    Ok(out)
}

/// Push every indirect reference inside `object` onto `out`.
fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| collect_references(value, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, value)| collect_references(value, out)),
        _ => {}
    }
}

/// Build a one-page document holding `page` and only the objects it reaches.
///
/// Page-tree nodes and other pages are never followed, so a link to another
/// page becomes a dangling (null) reference instead of dragging that page in.
fn single_page(
    doc: &Document,
    page_id: ObjectId,
    mut page: Dictionary,
) -> Result<Vec<u8>, lopdf::Error> {
    page.remove(b"Parent");

    let mut out = Document::with_version(doc.version.clone());
    let mut pending = Vec::new();
    collect_references(&Object::Dictionary(page.clone()), &mut pending);

    let mut seen = BTreeSet::from([page_id]);
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Ok(object) = doc.get_object(id) else {
            continue;
        };
        if matches!(object.type_name(), Ok("Page" | "Pages" | "Catalog")) {
            continue;
        }
        collect_references(object, &mut pending);
        out.objects.insert(id, object.clone());
    }

    out.max_id = doc.max_id;
    let pages_id = out.new_object_id();
    page.set("Parent", pages_id);
    out.objects.insert(page_id, Object::Dictionary(page));
    out.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![Object::Reference(page_id)],
        }),
    );
    let catalog_id = out.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    out.trailer.set("Root", catalog_id);
    out.renumber_objects();

    let mut bytes = Vec::new();
    out.save_to(&mut bytes)?;
    Ok(bytes)
}

/// One single-page PDF per page, in page order.
///
/// Each output carries only what its page references, so the cost per page
/// tracks the page's own size rather than the whole document's.
pub fn split(source: ValidatedPdf) -> Result<Vec<Vec<u8>>, GatewayError> {
    let fail = |e: lopdf::Error| GatewayError::conversion("split PDF", e);
    let doc = source.document;

    let mut outputs = Vec::new();
    for (index, id) in page_ids(&doc).into_iter().enumerate() {
        let page = flatten_inherited(&doc, id).map_err(fail)?;
        let out = single_page(&doc, id, page).map_err(fail)?;
        debug!("Split page {} → {} bytes", index + 1, out.len());
        outputs.push(out);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil;
    use crate::pipeline::upload::UploadedAsset;
    use crate::pipeline::validate::open_pdf;
    use lopdf::Stream;

    fn validated(bytes: Vec<u8>) -> ValidatedPdf {
        open_pdf(UploadedAsset::new("file", None, bytes), false).unwrap()
    }

    #[test]
    fn merge_concatenates_in_upload_order() {
        let a = validated(testutil::pdf_with_widths(&[110, 111]));
        let b = validated(testutil::pdf_with_widths(&[220, 221, 222]));
        let merged = merge(vec![a, b]).unwrap();
        assert_eq!(testutil::page_widths(&merged), vec![110, 111, 220, 221, 222]);
    }

    #[test]
    fn merge_reversed_order() {
        let a = validated(testutil::pdf_with_widths(&[110]));
        let b = validated(testutil::pdf_with_widths(&[220, 221]));
        let merged = merge(vec![b, a]).unwrap();
        assert_eq!(testutil::page_widths(&merged), vec![220, 221, 110]);
    }

    #[test]
    fn merge_with_empty_document() {
        let a = validated(testutil::pdf(0));
        let b = validated(testutil::pdf_with_widths(&[300]));
        let merged = merge(vec![a, b]).unwrap();
        assert_eq!(testutil::page_widths(&merged), vec![300]);
    }

    #[test]
    fn merge_keeps_inherited_media_box() {
        // MediaBox lives on the Pages node only.
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![page_id.into()],
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let merged = merge(vec![
            validated(bytes.clone()),
            validated(testutil::pdf_with_widths(&[100])),
        ])
        .unwrap();
        assert_eq!(testutil::page_widths(&merged), vec![612, 100]);

        let pages = split(validated(bytes)).unwrap();
        assert_eq!(testutil::page_widths(&pages[0]), vec![612]);
    }

    #[test]
    fn split_yields_one_document_per_page() {
        let src = validated(testutil::pdf_with_widths(&[101, 102, 103, 104]));
        let pages = split(src).unwrap();
        assert_eq!(pages.len(), 4);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(testutil::page_widths(page), vec![101 + i as i64]);
        }
    }

    #[test]
    fn split_pages_carry_only_their_own_content() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = [b"0 0 m".as_slice(), b"1 1 m", b"2 2 m"]
            .iter()
            .map(|content| {
                let contents = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                    "Contents" => contents,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Count" => 3, "Kids" => kids }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let pages = split(validated(bytes)).unwrap();
        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            let single = Document::load_mem(page).unwrap();
            let streams: Vec<Vec<u8>> = single
                .objects
                .values()
                .filter_map(|o| o.as_stream().ok())
                .map(|s| s.content.clone())
                .collect();
            assert_eq!(streams, vec![format!("{i} {i} m").into_bytes()]);
        }
    }

    #[test]
    fn split_of_empty_document_is_empty() {
        assert!(split(validated(testutil::pdf(0))).unwrap().is_empty());
    }
}
