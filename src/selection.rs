//! Per-file page selection

use std::collections::BTreeSet;
use crate::error::{Error, Result};

/// Parse a page list such as `1-3,5,8-9` into 1-based page numbers
pub fn parse_page_ranges(expr: &str) -> Result<BTreeSet<u32>> {
    let invalid = || Error::InvalidPageRange(expr.to_string());
    let mut pages = BTreeSet::new();

    for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end.trim().parse().map_err(|_| invalid())?;
                if start == 0 || end < start {
                    return Err(invalid());
                }
                pages.extend(start..=end);
            }
            None => {
                let page: u32 = part.parse().map_err(|_| invalid())?;
                if page == 0 {
                    return Err(invalid());
                }
                pages.insert(page);
            }
        }
    }

    if pages.is_empty() {
        return Err(invalid());
    }

    Ok(pages)
}

/// Parse a `file.pdf=1-3,5` assignment into the file name and its pages
pub fn parse_file_pages(expr: &str) -> Result<(String, BTreeSet<u32>)> {
    let (name, ranges) = expr
        .rsplit_once('=')
        .ok_or_else(|| Error::InvalidPageRange(expr.to_string()))?;

    if name.trim().is_empty() {
        return Err(Error::InvalidPageRange(expr.to_string()));
    }

    Ok((name.trim().to_string(), parse_page_ranges(ranges)?))
}

/// Pages of a `page_count`-page document that survive subset and cut
///
/// `cut` is the last page kept (inclusive). The result is ascending.
pub fn select_pages(page_count: u32, subset: Option<&BTreeSet<u32>>, cut: Option<u32>) -> Vec<u32> {
    let last = cut.map_or(page_count, |c| c.min(page_count));

    (1..=last)
        .filter(|page| subset.map_or(true, |s| s.contains(page)))
        .collect()
}
