//! PDF inspection for the `info` command

use std::path::Path;
use lopdf::{Dictionary, Document, Object};
use crate::error::{Error, Result};
use crate::pdf::references::{find_reference_page_in, ReferenceHit, ScanOptions};

/// What we know about a single source PDF
#[derive(Debug, Clone)]
pub struct PdfInfo {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Where the references section starts, if a marker was found
    pub reference: Option<ReferenceHit>,
}

impl PdfInfo {
    /// Pages that a trimmed combine run would keep
    pub fn kept_pages(&self) -> usize {
        self.reference
            .as_ref()
            .map_or(self.page_count, |hit| (hit.page as usize).min(self.page_count))
    }
}

/// Load a PDF and report its page count, Info strings and reference cut
pub fn inspect(path: &Path, scan: &ScanOptions) -> Result<PdfInfo> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len();

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let info = info_dictionary(&doc);
    let title = info.and_then(|d| info_string(d, b"Title"));
    let author = info.and_then(|d| info_string(d, b"Author"));

    Ok(PdfInfo {
        page_count,
        title,
        author,
        reference: find_reference_page_in(&doc, scan),
    })
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}
