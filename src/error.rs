//! Error types for the PDF combine library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF combine library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern or directory scan
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Pages per sheet must be a positive integer
    #[error("Pages per sheet must be an integer > 0, got {0}")]
    InvalidPagesPerSheet(usize),

    /// Malformed page range expression
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Every page was filtered out
    #[error("No pages left to combine after trimming and page selection")]
    NothingToCombine,

    /// General error
    #[error("{0}")]
    General(String),
}
