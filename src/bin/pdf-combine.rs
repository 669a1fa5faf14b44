//! PDF Combine CLI tool
//!
//! A command-line tool for packing a directory of PDFs into one N-up PDF.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;

use pdf_combine::discover::FileFilter;
use pdf_combine::layout::{best_packing, PageDimensions};
use pdf_combine::pdf::{inspect, ScanOptions};
use pdf_combine::selection::parse_file_pages;
use pdf_combine::{combine_pdfs, CombineOptions};

/// PDF Combine - Pack a directory of PDFs into one N-up PDF
#[derive(Parser)]
#[command(name = "pdf-combine")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Pack every PDF in papers/ four pages to a sheet
    pdf-combine combine papers

    # Two pages per sheet, keep reference sections
    pdf-combine combine papers -n 2 --keep-references

    # Summarize one paper, only pages 1-6
    pdf-combine combine papers --include paper.pdf --pages \"paper.pdf=1-6\"

    # Show where a paper's references begin
    pdf-combine info \"papers/*.pdf\"")]
struct Cli {
    /// Show per-page detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Paper {
    Letter,
    A4,
}

impl Paper {
    fn dimensions(self) -> PageDimensions {
        match self {
            Paper::Letter => PageDimensions::letter(),
            Paper::A4 => PageDimensions::a4(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Combine the PDFs in a directory into one packed PDF
    Combine {
        /// Directory containing the PDFs
        dir: PathBuf,

        /// Output file name, written inside the directory
        #[arg(short, long, default_value = "combined.pdf")]
        output: String,

        /// Source pages per output sheet
        #[arg(short = 'n', long, default_value_t = 4,
              value_parser = clap::value_parser!(u32).range(1..))]
        pages_per_sheet: u32,

        /// Only combine this file (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Skip this file (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Page selection for one file, e.g. "paper.pdf=1-3,5" (repeatable)
        #[arg(long = "pages")]
        page_subsets: Vec<String>,

        /// Keep references/bibliography/acknowledgments pages
        #[arg(long)]
        keep_references: bool,

        /// Section heading prefix that ends a document (repeatable, replaces defaults)
        #[arg(long = "marker")]
        markers: Vec<String>,

        /// First page (1-based) searched for a section heading
        #[arg(long, default_value_t = 5)]
        first_scan_page: u32,

        /// Slot pitch as a fraction of the page size
        #[arg(long, default_value_t = 0.92)]
        scale: f64,

        /// Nominal source page size
        #[arg(long, value_enum, default_value_t = Paper::Letter)]
        paper: Paper,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about PDF files. Supports glob patterns like "*.pdf"
    Info {
        /// PDF files to inspect
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Show the grid chosen for a number of pages per sheet
    Layout {
        /// Source pages per output sheet
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        pages_per_sheet: u32,

        /// Nominal source page size
        #[arg(long, value_enum, default_value_t = Paper::Letter)]
        paper: Paper,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Combine {
            dir, output, pages_per_sheet, include, exclude, page_subsets,
            keep_references, markers, first_scan_page, scale, paper, open,
        } => {
            cmd_combine(CombineArgs {
                dir, output, pages_per_sheet, include, exclude, page_subsets,
                keep_references, markers, first_scan_page, scale, paper, open,
            })
        }
        Commands::Info { inputs } => cmd_info(inputs),
        Commands::Layout { pages_per_sheet, paper } => cmd_layout(pages_per_sheet, paper),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Configure env_logger; RUST_LOG wins over the flags
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    paths.sort();

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &PathBuf) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

struct CombineArgs {
    dir: PathBuf,
    output: String,
    pages_per_sheet: u32,
    include: Vec<String>,
    exclude: Vec<String>,
    page_subsets: Vec<String>,
    keep_references: bool,
    markers: Vec<String>,
    first_scan_page: u32,
    scale: f64,
    paper: Paper,
    open: bool,
}

fn scan_options(markers: Vec<String>, first_page: u32) -> ScanOptions {
    let defaults = ScanOptions::default();
    ScanOptions {
        markers: if markers.is_empty() { defaults.markers } else { markers },
        first_page,
    }
}

/// Combine the PDFs in a directory
fn cmd_combine(args: CombineArgs) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("Input directory not found: {}", args.dir.display());
    }

    let mut page_subsets = HashMap::new();
    for expr in &args.page_subsets {
        let (name, pages) = parse_file_pages(expr)?;
        page_subsets.insert(name, pages);
    }

    let options = CombineOptions {
        input_dir: args.dir,
        output_name: args.output,
        output_path: None,
        pages_per_sheet: args.pages_per_sheet as usize,
        filter: FileFilter {
            include: (!args.include.is_empty()).then_some(args.include),
            exclude: (!args.exclude.is_empty()).then_some(args.exclude),
        },
        page_subsets,
        remove_references: !args.keep_references,
        scan: scan_options(args.markers, args.first_scan_page),
        scale: args.scale,
        page: args.paper.dimensions(),
    };

    let report = combine_pdfs(&options).context("Failed to combine PDFs")?;

    if args.open {
        open_file(&report.output_path)?;
    }

    Ok(())
}

/// Show information about PDFs
fn cmd_info(inputs: Vec<String>) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let scan = ScanOptions::default();

    for input in inputs {
        if !input.exists() {
            bail!("Input file not found: {}", input.display());
        }

        let info = inspect(&input, &scan)
            .with_context(|| format!("Failed to read {}", input.display()))?;

        println!("File: {}", input.display());
        println!("Pages: {}", info.page_count);

        if let Some(title) = &info.title {
            println!("Title: {}", title);
        }
        if let Some(author) = &info.author {
            println!("Author: {}", author);
        }
        match &info.reference {
            Some(hit) => println!(
                "References: page {} (\"{}\"), keeping {} pages",
                hit.page, hit.marker, info.kept_pages()
            ),
            None => println!("References: not found"),
        }
        println!();
    }

    Ok(())
}

/// Show the packing grid
fn cmd_layout(pages_per_sheet: u32, paper: Paper) -> Result<()> {
    let packing = best_packing(pages_per_sheet as usize, &paper.dimensions());
    println!(
        "{} pages/sheet: {} x {} ({} across, {} down)",
        pages_per_sheet, packing.columns, packing.rows, packing.columns, packing.rows
    );
    Ok(())
}
