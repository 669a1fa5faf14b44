//! Input discovery: which PDFs in a directory take part in a run

use std::path::{Path, PathBuf};
use glob::{glob, Pattern};
use crate::error::{Error, Result};

/// Default output file name
pub const DEFAULT_OUTPUT_NAME: &str = "combined.pdf";

/// Prefix for the output when a single file is summarized
pub const SUMMARY_PREFIX: &str = "summarized_";

/// File name filters applied to a directory listing
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Keep only these file names (all files when `None`)
    pub include: Option<Vec<String>>,
    /// Drop these file names
    pub exclude: Option<Vec<String>>,
}

impl FileFilter {
    /// Whether a file name passes both lists
    pub fn accepts(&self, name: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == name));
        included && !excluded
    }
}

/// List files directly inside `dir` whose name contains `.pdf`, sorted by name
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.to_path_buf()));
    }

    let dir_str = dir
        .to_str()
        .ok_or_else(|| Error::General(format!("Directory path is not valid UTF-8: {}", dir.display())))?;
    let pattern = format!("{}/*.pdf*", Pattern::escape(dir_str));

    let mut paths = Vec::new();
    for entry in glob(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unreadable entry: {}", e),
        }
    }

    paths.sort_by_key(|p| file_name(p));
    Ok(paths)
}

/// Apply `filter` to the PDFs in `dir`, never returning `output` itself
pub fn discover_inputs(dir: &Path, filter: &FileFilter, output: &Path) -> Result<Vec<PathBuf>> {
    let output_name = file_name(output);
    let same_dir = output.parent().map_or(true, |p| p.as_os_str().is_empty() || p == dir);

    let files: Vec<PathBuf> = list_pdfs(dir)?
        .into_iter()
        .filter(|path| {
            let name = file_name(path);
            filter.accepts(&name) && !(same_dir && name == output_name)
        })
        .collect();

    if files.is_empty() {
        return Err(Error::NoFilesMatched(format!("{}/*.pdf", dir.display())));
    }

    Ok(files)
}

/// Output file name for a run
///
/// Summarizing exactly one included file yields `summarized_<file>`.
pub fn output_name(filter: &FileFilter, default_name: &str) -> String {
    match filter.include.as_deref() {
        Some([single]) => format!("{}{}", SUMMARY_PREFIX, single),
        _ => default_name.to_string(),
    }
}

/// File name of a path as an owned string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"%PDF-1.5\n").expect("Failed to write file");
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn test_list_pdfs_sorted_and_filtered() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(temp_dir.path(), "b.pdf");
        touch(temp_dir.path(), "a.pdf");
        touch(temp_dir.path(), "notes.txt");
        fs::create_dir(temp_dir.path().join("sub.pdf")).unwrap();

        let listed = list_pdfs(temp_dir.path()).unwrap();
        assert_eq!(names(&listed), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_list_pdfs_missing_directory() {
        let result = list_pdfs(Path::new("no-such-directory"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_discover_applies_include_and_exclude() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            touch(temp_dir.path(), name);
        }

        let filter = FileFilter {
            include: Some(vec!["a.pdf".into(), "b.pdf".into()]),
            exclude: Some(vec!["b.pdf".into()]),
        };
        let output = temp_dir.path().join(DEFAULT_OUTPUT_NAME);
        let files = discover_inputs(temp_dir.path(), &filter, &output).unwrap();
        assert_eq!(names(&files), vec!["a.pdf"]);
    }

    #[test]
    fn test_discover_skips_previous_output() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(temp_dir.path(), "a.pdf");
        touch(temp_dir.path(), DEFAULT_OUTPUT_NAME);

        let output = temp_dir.path().join(DEFAULT_OUTPUT_NAME);
        let files = discover_inputs(temp_dir.path(), &FileFilter::default(), &output).unwrap();
        assert_eq!(names(&files), vec!["a.pdf"]);
    }

    #[test]
    fn test_discover_nothing_matched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output = temp_dir.path().join(DEFAULT_OUTPUT_NAME);
        let result = discover_inputs(temp_dir.path(), &FileFilter::default(), &output);
        assert!(matches!(result.unwrap_err(), Error::NoFilesMatched(_)));
    }

    #[test]
    fn test_output_name_for_single_file() {
        let filter = FileFilter {
            include: Some(vec!["paper.pdf".into()]),
            exclude: None,
        };
        assert_eq!(output_name(&filter, DEFAULT_OUTPUT_NAME), "summarized_paper.pdf");
        assert_eq!(output_name(&FileFilter::default(), DEFAULT_OUTPUT_NAME), "combined.pdf");
    }
}
