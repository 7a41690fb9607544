//! Converting many files in one go.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{default_output_path, ConversionResult, Converter};
use crate::detect::has_pdf_extension;
use crate::error::Result;

/// Options for batch conversion.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Write every output here; `None` writes next to each source
    pub output_dir: Option<PathBuf>,

    /// Descend into subdirectories when collecting inputs
    pub recursive: bool,

    /// Keep going after a failed file
    pub continue_on_error: bool,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn continue_on_error(mut self, keep_going: bool) -> Self {
        self.continue_on_error = keep_going;
        self
    }

    fn output_for(&self, input: &Path) -> PathBuf {
        match (&self.output_dir, input.file_name()) {
            (Some(dir), Some(name)) => default_output_path(&dir.join(name)),
            _ => default_output_path(input),
        }
    }
}

/// Results of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<ConversionResult>,
    /// Inputs never attempted because an earlier file failed
    pub skipped: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Every `*.pdf` file under `dir`, sorted by path.
pub fn collect_pdfs(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if has_pdf_extension(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

impl Converter {
    /// Convert each of `inputs`. Only an unusable output directory is an
    /// error; per-file failures are recorded in the report.
    pub fn batch_convert(&self, inputs: &[PathBuf], batch: &BatchOptions) -> Result<BatchReport> {
        self.batch_convert_with(inputs, batch, |_, _| {})
    }

    /// [`Converter::batch_convert`], calling `on_file` after every file.
    pub fn batch_convert_with<F>(&self, inputs: &[PathBuf], batch: &BatchOptions, mut on_file: F) -> Result<BatchReport>
    where
        F: FnMut(usize, &ConversionResult),
    {
        if let Some(dir) = &batch.output_dir {
            fs::create_dir_all(dir)?;
        }

        let mut report = BatchReport::default();
        for (i, input) in inputs.iter().enumerate() {
            let output = batch.output_for(input);
            let result = self.convert(input, Some(&output));
            on_file(i, &result);
            let stop = !result.success && !batch.continue_on_error;
            report.results.push(result);
            if stop {
                report.skipped = inputs.len() - i - 1;
                log::warn!("Stopping batch after failure; {} files not converted", report.skipped);
                break;
            }
        }
        log::info!(
            "Batch finished: {} converted, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Convert every PDF in `dir`.
    pub fn convert_directory(&self, dir: &Path, batch: &BatchOptions) -> Result<BatchReport> {
        let inputs = collect_pdfs(dir, batch.recursive)?;
        log::info!("Found {} PDF files in {}", inputs.len(), dir.display());
        self.batch_convert(&inputs, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConvertOptions;

    fn touch(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_pdfs_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.pdf"), b"x");
        touch(&dir.path().join("a.PDF"), b"x");
        touch(&dir.path().join("notes.txt"), b"x");
        touch(&dir.path().join("sub").join("c.pdf"), b"x");

        let flat = collect_pdfs(dir.path(), false).unwrap();
        let names: Vec<_> = flat.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);

        let deep = collect_pdfs(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_output_paths() {
        let batch = BatchOptions::new().with_output_dir("/out");
        assert_eq!(batch.output_for(Path::new("/in/a.pdf")), PathBuf::from("/out/a.docx"));
        assert_eq!(
            BatchOptions::new().output_for(Path::new("/in/a.pdf")),
            PathBuf::from("/in/a.docx")
        );
    }

    #[test]
    fn test_stop_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pdf");
        let other = dir.path().join("other.pdf");
        touch(&bad, b"not a pdf");
        touch(&other, b"not a pdf either");
        let inputs = vec![bad, other];
        let converter = Converter::new(ConvertOptions::default().with_hints(false));

        let report = converter
            .batch_convert(&inputs, &BatchOptions::new().with_output_dir(dir.path().join("out")))
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("out").is_dir());

        let mut seen = Vec::new();
        let report = converter
            .batch_convert_with(&inputs, &BatchOptions::new().continue_on_error(true), |i, _| seen.push(i))
            .unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(seen, vec![0, 1]);
    }
}
