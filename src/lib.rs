//! PDF Combine Library
//!
//! Packs a directory of PDF documents into a single "N-up" PDF for compact
//! printing and review. This library provides functionality to:
//! - Discover and filter the PDFs in a directory
//! - Find where each document's references/bibliography/acknowledgments begin
//! - Choose the most compact grid for a number of pages per sheet
//! - Tile the selected source pages onto output sheets
//!
//! # Example
//!
//! ```no_run
//! use pdf_combine::{combine_pdfs, CombineOptions};
//! use std::path::PathBuf;
//!
//! let options = CombineOptions {
//!     input_dir: PathBuf::from("papers"),
//!     pages_per_sheet: 4,
//!     ..Default::default()
//! };
//!
//! combine_pdfs(&options).expect("Failed to combine PDFs");
//! ```

pub mod error;
pub mod pdf;
pub mod layout;
pub mod discover;
pub mod selection;
pub mod combine;

// Re-export commonly used items
pub use error::{Error, Result};
pub use combine::{combine_pdfs, CombineOptions, CombineReport};
