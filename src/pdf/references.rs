//! Locate the start of a document's references section
//!
//! Papers usually end with references, a bibliography or acknowledgments that
//! are not worth printing. The first page (from page 5 on) whose extracted text
//! contains one of the end markers becomes the last page kept.

use std::path::{Path, PathBuf};
use lopdf::Document;
use rayon::prelude::*;
use crate::error::{Error, Result};

/// Default section headings that mark the end of the body text
pub const DEFAULT_END_MARKERS: [&str; 3] = ["Referen", "Bibliog", "Acknowl"];

/// First page (1-based) considered by default
pub const DEFAULT_FIRST_SCAN_PAGE: u32 = 5;

/// Settings for the reference scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Marker prefixes; each also matches fully upper- and lower-cased
    pub markers: Vec<String>,
    /// Pages before this one (1-based) are never checked
    pub first_page: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            markers: DEFAULT_END_MARKERS.iter().map(|m| m.to_string()).collect(),
            first_page: DEFAULT_FIRST_SCAN_PAGE,
        }
    }
}

/// Where a marker was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceHit {
    /// 1-based page number containing the marker
    pub page: u32,
    /// The text that matched
    pub marker: String,
}

/// Sliding window over the most recent characters of a page
///
/// The window is as wide as the longest marker; shorter markers match its tail.
#[derive(Debug, Clone)]
pub struct MarkerWindow {
    variants: Vec<String>,
    width: usize,
    buffer: String,
}

impl MarkerWindow {
    /// Build a window matching each marker as given, upper-cased and lower-cased
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        let mut variants = Vec::new();
        for marker in markers {
            let marker = marker.as_ref();
            if marker.is_empty() {
                continue;
            }
            for variant in [marker.to_string(), marker.to_uppercase(), marker.to_lowercase()] {
                if !variants.contains(&variant) {
                    variants.push(variant);
                }
            }
        }

        let width = variants.iter().map(|v| v.chars().count()).max().unwrap_or(0);

        Self {
            variants,
            width,
            buffer: String::new(),
        }
    }

    /// Forget everything seen so far
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Feed one character; returns the marker if the window now matches one
    pub fn push(&mut self, c: char) -> Option<&str> {
        if self.width == 0 {
            return None;
        }

        self.buffer.push(c);
        if self.buffer.chars().count() > self.width {
            let drop = self.buffer.chars().next().map(char::len_utf8).unwrap_or(0);
            self.buffer.drain(..drop);
        }

        self.variants
            .iter()
            .find(|v| self.buffer.ends_with(v.as_str()))
            .map(String::as_str)
    }

    /// Feed a page worth of text, skipping line breaks
    pub fn scan(&mut self, text: &str) -> Option<String> {
        for c in text.chars().filter(|c| *c != '\n' && *c != '\r') {
            if let Some(hit) = self.push(c) {
                return Some(hit.to_string());
            }
        }
        None
    }
}

/// Find the first page at or after `first_page` containing an end marker
pub fn find_reference_page_in(doc: &Document, options: &ScanOptions) -> Option<ReferenceHit> {
    let mut window = MarkerWindow::new(&options.markers);

    for page in doc.get_pages().into_keys().filter(|p| *p >= options.first_page) {
        let text = match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Skipping text of page {}: {}", page, e);
                continue;
            }
        };

        window.reset();
        if let Some(marker) = window.scan(&text) {
            return Some(ReferenceHit { page, marker });
        }
        log::debug!("Page {}: no end marker in {} chars", page, text.len());
    }

    None
}

/// Load a PDF and find the page where its references begin
pub fn find_reference_page(path: &Path, options: &ScanOptions) -> Result<Option<ReferenceHit>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let hit = find_reference_page_in(&doc, options);

    let name = display_name(path);
    match &hit {
        Some(hit) => log::info!("{}: page {}, \"{}\"", name, hit.page, hit.marker),
        None => log::info!("{}: not found", name),
    }

    Ok(hit)
}

/// Scan every file in parallel; results keep the input order
pub fn scan_references(paths: &[PathBuf], options: &ScanOptions) -> Result<Vec<Option<ReferenceHit>>> {
    paths
        .par_iter()
        .map(|path| find_reference_page(path, options))
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
