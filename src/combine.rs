//! Combine a directory of PDFs into one N-up document

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use lopdf::Document;
use crate::discover::{discover_inputs, file_name, output_name, FileFilter, DEFAULT_OUTPUT_NAME};
use crate::error::{Error, Result};
use crate::layout::{best_packing, cell_size, Packing, PageDimensions};
use crate::pdf::compose::{SheetSpec, SheetWriter};
use crate::pdf::references::{scan_references, ScanOptions};
use crate::selection::select_pages;

/// Default slot pitch relative to the page size
pub const DEFAULT_SCALE: f64 = 0.92;

/// Default number of source pages per output sheet
pub const DEFAULT_PAGES_PER_SHEET: usize = 4;

/// Options for a combine run
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Directory holding the source PDFs
    pub input_dir: PathBuf,
    /// Output file name inside `input_dir`
    pub output_name: String,
    /// Explicit output path; overrides `output_name` when set
    pub output_path: Option<PathBuf>,
    /// Source pages placed on each output sheet
    pub pages_per_sheet: usize,
    /// Include/exclude lists by file name
    pub filter: FileFilter,
    /// 1-based page numbers to keep, by file name
    pub page_subsets: HashMap<String, BTreeSet<u32>>,
    /// Cut each document after the page where its references begin
    pub remove_references: bool,
    /// Reference scan settings
    pub scan: ScanOptions,
    /// Slot pitch as a fraction of the nominal page size
    pub scale: f64,
    /// Nominal source page size used for packing and slot pitch
    pub page: PageDimensions,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            output_path: None,
            pages_per_sheet: DEFAULT_PAGES_PER_SHEET,
            filter: FileFilter::default(),
            page_subsets: HashMap::new(),
            remove_references: true,
            scan: ScanOptions::default(),
            scale: DEFAULT_SCALE,
            page: PageDimensions::letter(),
        }
    }
}

impl CombineOptions {
    /// Where the combined PDF will be written
    pub fn resolved_output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => self.input_dir.join(output_name(&self.filter, &self.output_name)),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CombineReport {
    /// Written file
    pub output_path: PathBuf,
    /// Number of source files combined
    pub files: usize,
    /// Pages across all source files before trimming and selection
    pub total_pages: usize,
    /// Pages placed on sheets
    pub placed_pages: usize,
    /// Grid used on each sheet
    pub packing: Packing,
    /// Sheets written
    pub sheets: usize,
    /// Sheets an untrimmed run would have needed
    pub baseline_sheets: usize,
}

impl CombineReport {
    /// Percentage of sheets saved relative to the untrimmed baseline
    pub fn reduction_percent(&self) -> f64 {
        100.0 - self.sheets as f64 / self.baseline_sheets.max(1) as f64 * 100.0
    }
}

/// Combine the PDFs in `options.input_dir` into one packed PDF
///
/// # Example
///
/// ```no_run
/// use pdf_combine::{combine_pdfs, CombineOptions};
/// use std::path::PathBuf;
///
/// let options = CombineOptions {
///     input_dir: PathBuf::from("papers"),
///     pages_per_sheet: 2,
///     ..Default::default()
/// };
///
/// let report = combine_pdfs(&options).expect("Failed to combine");
/// println!("{} sheets", report.sheets);
/// ```
pub fn combine_pdfs(options: &CombineOptions) -> Result<CombineReport> {
    if options.pages_per_sheet < 1 {
        return Err(Error::InvalidPagesPerSheet(options.pages_per_sheet));
    }
    if options.scale.is_nan() || options.scale <= 0.0 {
        return Err(Error::General(format!("Scale must be positive, got {}", options.scale)));
    }

    let output_path = options.resolved_output_path();
    let files = discover_inputs(&options.input_dir, &options.filter, &output_path)?;
    log::info!("Found {} files to combine", files.len());

    for name in options.page_subsets.keys() {
        if !files.iter().any(|f| file_name(f) == *name) {
            log::warn!("Page selection for {} matches no input file", name);
        }
    }

    let cuts: Vec<Option<u32>> = if options.remove_references {
        log::info!("Searching for end markers...");
        scan_references(&files, &options.scan)?
            .into_iter()
            .map(|hit| hit.map(|h| h.page))
            .collect()
    } else {
        vec![None; files.len()]
    };

    let mut writer = SheetWriter::new();
    let mut total_pages = 0;

    for (path, cut) in files.iter().zip(cuts) {
        let doc = Document::load(path)?;
        let page_count = doc.get_pages().len();
        total_pages += page_count;

        if page_count == 0 {
            log::warn!("{} has no pages", path.display());
            continue;
        }

        let name = file_name(path);
        let selected = select_pages(page_count as u32, options.page_subsets.get(&name), cut);
        log::debug!("{}: keeping {} of {} pages", name, selected.len(), page_count);

        writer.add_pages(doc, &selected)?;
    }

    let placed_pages = writer.page_count();
    if placed_pages == 0 {
        return Err(Error::NothingToCombine);
    }

    let packing = best_packing(options.pages_per_sheet, &options.page);
    log::info!("Packing parameters: {} x {}", packing.columns, packing.rows);

    let spec = SheetSpec {
        packing,
        pages_per_sheet: options.pages_per_sheet,
        cell: cell_size(&options.page, options.scale),
    };
    let sheets = writer.save(&spec, &output_path)?;

    let report = CombineReport {
        output_path,
        files: files.len(),
        total_pages,
        placed_pages,
        packing,
        sheets,
        baseline_sheets: total_pages.div_ceil(options.pages_per_sheet),
    };

    log::info!(
        "Final sheets ({} pages/sheet): {} of {} ({:.1}% reduced)",
        options.pages_per_sheet,
        report.sheets,
        report.baseline_sheets,
        report.reduction_percent()
    );
    log::info!("Output to: {}", report.output_path.display());

    Ok(report)
}
