//! N-up sheet composition using lopdf
//!
//! Each selected source page is wrapped into a Form XObject, the source
//! objects are copied into the output document under fresh IDs, and every
//! output sheet draws its Forms at the slot positions from [`crate::layout`].

use std::collections::HashMap;
use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::layout::{slot_placement, Packing};

/// Letter MediaBox used when a page tree carries none
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A source page ready to be placed on a sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedPage {
    /// Form XObject holding the page, valid in the output document
    pub form_id: ObjectId,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
}

/// Sheet geometry shared by every sheet of a run
#[derive(Debug, Clone, Copy)]
pub struct SheetSpec {
    /// Grid of pages on each sheet
    pub packing: Packing,
    /// How many pages go on each sheet (may be less than the grid capacity)
    pub pages_per_sheet: usize,
    /// Slot pitch in points
    pub cell: (f64, f64),
}

/// Output document under construction
pub struct SheetWriter {
    doc: Document,
    pages: Vec<PlacedPage>,
}

impl Default for SheetWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetWriter {
    /// Start an empty output document
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            pages: Vec::new(),
        }
    }

    /// Pages queued so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Queue `page_numbers` (1-based, in order) of `source` for placement
    ///
    /// The source document is consumed: its objects move into the output
    /// document under IDs above everything already there.
    pub fn add_pages(&mut self, mut source: Document, page_numbers: &[u32]) -> Result<()> {
        if page_numbers.is_empty() {
            return Ok(());
        }

        let page_ids = source.get_pages();
        let mut forms = Vec::with_capacity(page_numbers.len());

        for number in page_numbers {
            let page_id = *page_ids.get(number).ok_or_else(|| {
                Error::General(format!("Page {} does not exist", number))
            })?;
            forms.push(page_to_form(&mut source, page_id)?);
        }

        let id_map = import_objects(&mut self.doc, source);

        for (form_id, width, height) in forms {
            self.pages.push(PlacedPage {
                form_id: id_map[&form_id],
                width,
                height,
            });
        }

        Ok(())
    }

    /// Lay the queued pages out on sheets and return the finished document
    pub fn finish(mut self, spec: &SheetSpec) -> Result<(Document, usize)> {
        if self.pages.is_empty() {
            return Err(Error::NothingToCombine);
        }

        let per_sheet = spec.pages_per_sheet.max(1);
        let pages_id = self.doc.new_object_id();

        let mut kids = Vec::new();
        for sheet in self.pages.chunks(per_sheet) {
            let sheet_id = write_sheet(&mut self.doc, pages_id, sheet, spec);
            kids.push(Object::Reference(sheet_id));
        }
        let sheet_count = kids.len();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(sheet_count as i64));
        pages_object.set("Kids", Object::Array(kids));
        self.doc.objects.insert(pages_id, Object::Dictionary(pages_object));

        let catalog_id = self.doc.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        self.doc.objects.insert(catalog_id, Object::Dictionary(catalog));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        // Source page trees are no longer reachable from the new catalog
        let pruned = self.doc.prune_objects();
        log::debug!("Pruned {} unreferenced objects", pruned.len());

        Ok((self.doc, sheet_count))
    }

    /// Lay out, compress and save; returns the number of sheets written
    pub fn save(self, spec: &SheetSpec, output_path: &Path) -> Result<usize> {
        let (mut doc, sheets) = self.finish(spec)?;
        doc.compress();
        doc.save(output_path)?;
        Ok(sheets)
    }
}

/// Write one sheet page drawing `pages` in slot order
fn write_sheet(doc: &mut Document, parent: ObjectId, pages: &[PlacedPage], spec: &SheetSpec) -> ObjectId {
    let mut xobjects = Dictionary::new();
    let mut content = String::new();
    let mut bounds: Option<[f32; 4]> = None;

    for (slot, page) in pages.iter().enumerate() {
        let name = format!("P{}", slot);
        let origin = slot_placement(slot, &spec.packing, spec.cell);
        let (x, y) = (origin.x as f32, origin.y as f32);

        xobjects.set(name.as_bytes().to_vec(), Object::Reference(page.form_id));
        content.push_str(&format!("q\n1 0 0 1 {:.3} {:.3} cm\n/{} Do\nQ\n", x, y, name));

        let rect = [x, y, x + page.width, y + page.height];
        bounds = Some(match bounds {
            None => rect,
            Some(b) => [b[0].min(rect[0]), b[1].min(rect[1]), b[2].max(rect[2]), b[3].max(rect[3])],
        });
    }

    let media_box = bounds.unwrap_or(DEFAULT_MEDIA_BOX);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(parent));
    page.set("MediaBox", Object::Array(media_box.iter().map(|v| Object::Real(*v)).collect()));
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));

    doc.add_object(Object::Dictionary(page))
}

/// Wrap a page into a Form XObject inside its own document
///
/// Returns the Form's ID together with the placed width and height.
fn page_to_form(doc: &mut Document, page_id: ObjectId) -> Result<(ObjectId, f32, f32)> {
    let content = page_content(doc, page_id)?;
    let resources = effective_resources(doc, page_id);
    let geometry = PageGeometry::of(doc, page_id);

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("FormType", Object::Integer(1));
    form.set("BBox", Object::Array(geometry.bbox.iter().map(|v| Object::Real(*v)).collect()));
    form.set("Matrix", Object::Array(geometry.matrix().iter().map(|v| Object::Real(*v)).collect()));
    form.set("Resources", Object::Dictionary(resources));

    let (width, height) = geometry.size();
    let form_id = doc.add_object(Object::Stream(Stream::new(form, content)));
    Ok((form_id, width, height))
}

/// Decoded content of every stream of a page, newline separated
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();

    for content_id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(content_id)?.as_stream()?;
        match stream.decompressed_content() {
            Ok(data) => content.extend_from_slice(&data),
            Err(_) => content.extend_from_slice(&stream.content),
        }
        // A stream boundary is always a token boundary
        content.push(b'\n');
    }

    Ok(content)
}

/// Visible area and display orientation of a source page
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageGeometry {
    /// CropBox, or MediaBox when no CropBox is set
    bbox: [f32; 4],
    /// Clockwise rotation: 0, 90, 180 or 270
    rotate: i64,
}

impl PageGeometry {
    fn of(doc: &Document, page_id: ObjectId) -> Self {
        let media_box = inherited_box(doc, page_id, b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX);
        let bbox = inherited_box(doc, page_id, b"CropBox").unwrap_or(media_box);

        let raw = inherited_attribute(doc, page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        let mut rotate = raw.rem_euclid(360);
        if rotate % 90 != 0 {
            log::warn!("Ignoring /Rotate {} (not a multiple of 90)", raw);
            rotate = 0;
        }

        Self { bbox, rotate }
    }

    /// Width and height once rotated for display
    fn size(&self) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.bbox;
        let (w, h) = (urx - llx, ury - lly);
        match self.rotate {
            90 | 270 => (h, w),
            _ => (w, h),
        }
    }

    /// Form matrix moving the box corner to the origin and applying the rotation
    fn matrix(&self) -> [f32; 6] {
        let [llx, lly, urx, ury] = self.bbox;
        match self.rotate {
            90 => [0.0, -1.0, 1.0, 0.0, -lly, urx],
            180 => [-1.0, 0.0, 0.0, -1.0, urx, ury],
            270 => [0.0, 1.0, -1.0, 0.0, ury, -llx],
            _ => [1.0, 0.0, 0.0, 1.0, -llx, -lly],
        }
    }
}

/// Copy every object of `source` into `target` above its current max ID
fn import_objects(target: &mut Document, source: Document) -> HashMap<ObjectId, ObjectId> {
    let id_offset = target.max_id;

    let id_map: HashMap<ObjectId, ObjectId> = source
        .objects
        .keys()
        .map(|old_id| (*old_id, (old_id.0 + id_offset, old_id.1)))
        .collect();

    for (old_id, object) in source.objects.iter() {
        target.objects.insert(id_map[old_id], renumber_object_references(object, &id_map));
    }

    target.max_id = target.max_id.max(source.max_id + id_offset);
    id_map
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => {
            Object::Reference(id_map.get(old_id).copied().unwrap_or(*old_id))
        }
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => Object::Stream(Stream {
            dict: renumber_dictionary(&stream.dict, id_map),
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: stream.start_position,
        }),
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Resources of a page, following inheritance through the page tree
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dictionary(doc, obj))
        .unwrap_or_else(Dictionary::new)
}

/// A page box (MediaBox, CropBox) following inheritance; `None` when absent or malformed
fn inherited_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<[f32; 4]> {
    let values = inherited_attribute(doc, page_id, key)
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().filter_map(as_f32).collect::<Vec<f32>>())?;

    match values.as_slice() {
        &[x0, y0, x1, y1] if x0 != x1 && y0 != y1 => {
            Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
        }
        _ => None,
    }
}

/// Look a key up on the page, then on each ancestor Pages node
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;

    // Depth cap guards against Parent cycles in broken files
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }

    None
}

fn resolve_dictionary(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok().cloned(),
        _ => None,
    }
}

fn as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{best_packing, cell_size, PageDimensions};
    use lopdf::content::Content;

    /// One-document fixture with `count` empty Letter pages
    fn blank_document(count: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for i in 0..count {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("0 0 {} 10 re f\n", i + 1).into_bytes(),
            ));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(count as i64));
        pages.set("Kids", Object::Array(kids));
        pages.set("MediaBox", Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn spec(pages_per_sheet: usize) -> SheetSpec {
        let letter = PageDimensions::letter();
        SheetSpec {
            packing: best_packing(pages_per_sheet, &letter),
            pages_per_sheet,
            cell: cell_size(&letter, 0.92),
        }
    }

    fn first_page(doc: &Document) -> ObjectId {
        *doc.get_pages().get(&1).unwrap()
    }

    fn set_on_first_page(doc: &mut Document, key: &str, value: Object) {
        let page_id = first_page(doc);
        doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap().set(key, value);
    }

    fn rect(values: [i64; 4]) -> Object {
        Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
    }

    fn stream_of(doc: &Document, form_id: ObjectId) -> &Stream {
        doc.get_object(form_id).unwrap().as_stream().unwrap()
    }

    fn numbers(obj: &Object) -> Vec<f32> {
        obj.as_array().unwrap().iter().filter_map(as_f32).collect()
    }

    fn operators(content: &[u8]) -> Vec<String> {
        Content::decode(content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_media_box_is_inherited() {
        let doc = blank_document(1);
        let geometry = PageGeometry::of(&doc, first_page(&doc));
        assert_eq!(geometry.bbox, [0.0, 0.0, 612.0, 792.0]);
        assert_eq!(geometry.rotate, 0);
    }

    #[test]
    fn test_form_keeps_content_streams_apart() {
        let mut doc = blank_document(1);
        let first = doc.add_object(Stream::new(Dictionary::new(), b"q 0 0 10 10 re f Q".to_vec()));
        let second = doc.add_object(Stream::new(Dictionary::new(), b"q 0 0 20 20 re f Q".to_vec()));
        set_on_first_page(&mut doc, "Contents", Object::Array(vec![
            Object::Reference(first),
            Object::Reference(second),
        ]));

        let page_id = first_page(&doc);
        let (form_id, _, _) = page_to_form(&mut doc, page_id).unwrap();

        assert_eq!(
            operators(&stream_of(&doc, form_id).content),
            vec!["q", "re", "f", "Q", "q", "re", "f", "Q"]
        );
    }

    #[test]
    fn test_form_decodes_compressed_content() {
        let mut doc = blank_document(1);
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            "0 0 10 10 re f\n".repeat(50).into_bytes(),
        ));
        set_on_first_page(&mut doc, "Contents", Object::Reference(content_id));
        doc.compress();
        assert!(stream_of(&doc, content_id).dict.has(b"Filter"));

        let page_id = first_page(&doc);
        let (form_id, _, _) = page_to_form(&mut doc, page_id).unwrap();
        let ops = operators(&stream_of(&doc, form_id).content);
        assert_eq!(ops.len(), 100);
        assert!(ops.chunks(2).all(|pair| pair == ["re", "f"]));
    }

    #[test]
    fn test_form_is_clipped_to_crop_box() {
        let mut doc = blank_document(1);
        set_on_first_page(&mut doc, "CropBox", rect([36, 36, 576, 756]));

        let page_id = first_page(&doc);
        let (form_id, width, height) = page_to_form(&mut doc, page_id).unwrap();
        assert_eq!((width, height), (540.0, 720.0));

        let form = &stream_of(&doc, form_id).dict;
        assert_eq!(numbers(form.get(b"BBox").unwrap()), vec![36.0, 36.0, 576.0, 756.0]);
        assert_eq!(numbers(form.get(b"Matrix").unwrap()), vec![1.0, 0.0, 0.0, 1.0, -36.0, -36.0]);
    }

    #[test]
    fn test_rotated_page_is_placed_upright() {
        let mut doc = blank_document(1);
        set_on_first_page(&mut doc, "Rotate", Object::Integer(90));

        let page_id = first_page(&doc);
        let (form_id, width, height) = page_to_form(&mut doc, page_id).unwrap();
        assert_eq!((width, height), (792.0, 612.0));

        let form = &stream_of(&doc, form_id).dict;
        assert_eq!(numbers(form.get(b"Matrix").unwrap()), vec![0.0, -1.0, 1.0, 0.0, 0.0, 612.0]);
    }

    #[test]
    fn test_rotation_maps_box_onto_placed_area() {
        let bbox = [10.0, 20.0, 110.0, 220.0];
        for rotate in [0, 90, 180, 270] {
            let geometry = PageGeometry { bbox, rotate };
            let [a, b, c, d, e, f] = geometry.matrix();
            let (width, height) = geometry.size();

            let corners = [(10.0, 20.0), (110.0, 20.0), (10.0, 220.0), (110.0, 220.0)];
            let mapped: Vec<(f32, f32)> = corners
                .iter()
                .map(|(x, y)| (a * x + c * y + e, b * x + d * y + f))
                .collect();

            let min_x = mapped.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
            let min_y = mapped.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
            let max_x = mapped.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
            let max_y = mapped.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
            assert_eq!((min_x, min_y, max_x, max_y), (0.0, 0.0, width, height), "rotate {}", rotate);
        }
    }

    #[test]
    fn test_odd_rotation_is_ignored() {
        let mut doc = blank_document(1);
        set_on_first_page(&mut doc, "Rotate", Object::Integer(-90));
        assert_eq!(PageGeometry::of(&doc, first_page(&doc)).rotate, 270);

        set_on_first_page(&mut doc, "Rotate", Object::Integer(45));
        assert_eq!(PageGeometry::of(&doc, first_page(&doc)).rotate, 0);
    }

    #[test]
    fn test_sheet_translates_each_slot() {
        let mut writer = SheetWriter::new();
        writer.add_pages(blank_document(4), &[1, 2, 3, 4]).unwrap();
        let (doc, _) = writer.finish(&spec(4)).unwrap();

        let sheet_id = first_page(&doc);
        let content = doc.get_page_content(sheet_id).unwrap();
        let operations = Content::decode(&content).unwrap().operations;

        let translations: Vec<(f32, f32)> = operations
            .iter()
            .filter(|op| op.operator == "cm")
            .map(|op| {
                let values: Vec<f32> = op.operands.iter().filter_map(as_f32).collect();
                assert_eq!(&values[..4], &[1.0, 0.0, 0.0, 1.0]);
                (values[4], values[5])
            })
            .collect();
        let drawn: Vec<Vec<u8>> = operations
            .iter()
            .filter(|op| op.operator == "Do")
            .map(|op| op.operands[0].as_name().unwrap().to_vec())
            .collect();

        let (w, h) = (612.0 * 0.92, 792.0 * 0.92);
        let expected = [(0.0, h), (w, h), (0.0, 0.0), (w, 0.0)];
        assert_eq!(translations.len(), 4);
        for ((x, y), (ex, ey)) in translations.iter().zip(expected) {
            assert!((x - ex).abs() < 0.01 && (y - ey).abs() < 0.01, "({}, {}) != ({}, {})", x, y, ex, ey);
        }
        assert_eq!(drawn, vec![b"P0".to_vec(), b"P1".to_vec(), b"P2".to_vec(), b"P3".to_vec()]);
    }

    #[test]
    fn test_sheets_include_partial_last_sheet() {
        let mut writer = SheetWriter::new();
        writer.add_pages(blank_document(5), &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(writer.page_count(), 5);

        let (doc, sheets) = writer.finish(&spec(4)).unwrap();
        assert_eq!(sheets, 2);
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_documents_do_not_collide() {
        let mut writer = SheetWriter::new();
        writer.add_pages(blank_document(2), &[1, 2]).unwrap();
        writer.add_pages(blank_document(2), &[2]).unwrap();

        let forms: Vec<ObjectId> = writer.pages.iter().map(|p| p.form_id).collect();
        assert_eq!(forms.len(), 3);
        assert!(forms[0] != forms[2] && forms[1] != forms[2]);
    }

    #[test]
    fn test_full_sheet_media_box_spans_grid() {
        let mut writer = SheetWriter::new();
        writer.add_pages(blank_document(4), &[1, 2, 3, 4]).unwrap();
        let (doc, _) = writer.finish(&spec(4)).unwrap();

        let sheet_id = *doc.get_pages().get(&1).unwrap();
        let sheet = doc.get_object(sheet_id).unwrap().as_dict().unwrap();
        let media_box: Vec<f32> = sheet
            .get(b"MediaBox").unwrap()
            .as_array().unwrap()
            .iter()
            .filter_map(as_f32)
            .collect();

        assert_eq!(media_box.len(), 4);
        assert!((media_box[2] - (612.0 * 0.92 + 612.0)).abs() < 0.1);
        assert!((media_box[3] - (792.0 * 0.92 + 792.0)).abs() < 0.1);
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let mut writer = SheetWriter::new();
        assert!(writer.add_pages(blank_document(1), &[3]).is_err());
    }

    #[test]
    fn test_empty_writer_has_nothing_to_combine() {
        let result = SheetWriter::new().finish(&spec(2));
        assert!(matches!(result, Err(Error::NothingToCombine)));
    }
}
