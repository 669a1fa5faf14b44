//! PDF manipulation module

pub mod compose;
pub mod metadata;
pub mod references;

// Re-export commonly used items
pub use compose::{PlacedPage, SheetSpec, SheetWriter};
pub use metadata::{inspect, PdfInfo};
pub use references::{
    find_reference_page, find_reference_page_in, scan_references, MarkerWindow, ReferenceHit,
    ScanOptions, DEFAULT_END_MARKERS,
};
