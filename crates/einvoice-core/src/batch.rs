//! Directory discovery and sequential batch conversion.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::EinvoiceError;
use crate::invoice::InvoiceParser;
use crate::pdf::{InvoiceRenderer, RenderResources};
use crate::Result;

/// List invoice documents directly inside `input_dir`.
///
/// Subdirectories are not searched. The extension is compared
/// case-insensitively and the result is sorted by file name.
pub fn discover_invoices(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(EinvoiceError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input directory not found: {}", input_dir.display()),
        )));
    }

    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!("Found {} .{} files in {}", files.len(), extension, input_dir.display());
    Ok(files)
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Conversion of a file is about to start; `index` counts from zero.
    Started {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    /// A PDF was written.
    Converted { path: &'a Path, output: &'a Path },
    /// The file was skipped because of an error.
    Failed {
        path: &'a Path,
        error: &'a EinvoiceError,
    },
}

/// A file that could not be converted.
#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: EinvoiceError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: Vec<FailedFile>,
    /// Written PDF files in processing order.
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Final summary line, e.g. `success: 2, failed: 1`.
    pub fn summary_line(&self) -> String {
        format!("success: {}, failed: {}", self.succeeded, self.failed.len())
    }
}

/// Converts invoice files to PDF one after another.
pub struct BatchConverter<'a, P: InvoiceParser> {
    parser: P,
    renderer: InvoiceRenderer,
    resources: &'a RenderResources,
    output_dir: PathBuf,
}

impl<'a, P: InvoiceParser> BatchConverter<'a, P> {
    pub fn new(parser: P, resources: &'a RenderResources, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            parser,
            renderer: InvoiceRenderer::new(),
            resources,
            output_dir: output_dir.into(),
        }
    }

    /// Output path for an input file: `<output_dir>/<stem>.pdf`.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "invoice".to_string());
        self.output_dir.join(format!("{stem}.pdf"))
    }

    /// Parse, render and write one file.
    ///
    /// An existing PDF at the output path is removed only once rendering
    /// succeeded.
    pub fn convert_file(&self, path: &Path) -> Result<PathBuf> {
        let start = Instant::now();

        let invoice = self.parser.parse_file(path)?;
        let bytes = self.renderer.render(&invoice, self.resources)?;

        let output = self.output_path(path);
        if output.exists() {
            fs::remove_file(&output)?;
        }
        fs::write(&output, bytes)?;

        debug!(
            "Converted {} -> {} in {:?}",
            path.display(),
            output.display(),
            start.elapsed()
        );
        Ok(output)
    }

    /// Convert every file, reporting progress through `on_event`.
    ///
    /// Per-file errors are collected in the report; only failing to create
    /// the output directory aborts the run.
    pub fn run<F>(&self, files: &[PathBuf], mut on_event: F) -> Result<BatchReport>
    where
        F: FnMut(BatchEvent<'_>),
    {
        let mut report = BatchReport::default();
        if files.is_empty() {
            return Ok(report);
        }

        fs::create_dir_all(&self.output_dir)?;
        info!(
            "Converting {} files into {}",
            files.len(),
            self.output_dir.display()
        );

        for (index, path) in files.iter().enumerate() {
            on_event(BatchEvent::Started {
                index,
                total: files.len(),
                path,
            });

            match self.convert_file(path) {
                Ok(output) => {
                    on_event(BatchEvent::Converted {
                        path,
                        output: &output,
                    });
                    report.succeeded += 1;
                    report.outputs.push(output);
                }
                Err(error) => {
                    warn!("Failed to convert {}: {}", path.display(), error);
                    on_event(BatchEvent::Failed {
                        path,
                        error: &error,
                    });
                    report.failed.push(FailedFile {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        info!("{}", report.summary_line());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{XmlInvoiceParser, SAMPLE_XML};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discovery_is_flat_and_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.xml"), "").unwrap();
        fs::write(dir.path().join("A.XML"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.xml"), "").unwrap();

        let files = discover_invoices(dir.path(), "xml").unwrap();
        assert_eq!(names(&files), vec!["A.XML", "b.xml"]);

        let dotted = discover_invoices(dir.path(), ".xml").unwrap();
        assert_eq!(dotted.len(), 2);
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = discover_invoices(&dir.path().join("absent"), "xml").unwrap_err();
        match err {
            EinvoiceError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let resources = RenderResources::synthetic();
        let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &output);

        let files = discover_invoices(dir.path(), "xml").unwrap();
        let report = converter.run(&files, |_| {}).unwrap();

        assert_eq!(report.total(), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_one_good_one_bad() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.xml"), SAMPLE_XML).unwrap();
        fs::write(dir.path().join("bad.xml"), "<EInvoice><Header>").unwrap();
        let output = dir.path().join("out");

        let resources = RenderResources::synthetic();
        let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &output);
        let files = discover_invoices(dir.path(), "xml").unwrap();

        let mut events = Vec::new();
        let report = converter
            .run(&files, |event| {
                events.push(match event {
                    BatchEvent::Started { index, total, .. } => format!("start {index}/{total}"),
                    BatchEvent::Converted { output, .. } => {
                        format!("ok {}", output.file_name().unwrap().to_string_lossy())
                    }
                    BatchEvent::Failed { path, .. } => {
                        format!("failed {}", path.file_name().unwrap().to_string_lossy())
                    }
                })
            })
            .unwrap();

        assert_eq!(
            events,
            vec!["start 0/2", "failed bad.xml", "start 1/2", "ok good.pdf"]
        );
        assert_eq!(report.summary_line(), "success: 1, failed: 1");
        assert_eq!(report.outputs, vec![output.join("good.pdf")]);
        assert!(matches!(report.failed[0].error, EinvoiceError::Parse(_)));

        let pdf = fs::read(output.join("good.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(!output.join("bad.pdf").exists());
    }

    #[test]
    fn test_out_of_range_tax_rate_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let huge = SAMPLE_XML.replace(
            "<TaxRate>0.06</TaxRate>",
            "<TaxRate>79228162514264337593543950335</TaxRate>",
        );
        fs::write(dir.path().join("a_huge_rate.xml"), huge).unwrap();
        fs::write(dir.path().join("b_sample.xml"), SAMPLE_XML).unwrap();
        let output = dir.path().join("out");

        let resources = RenderResources::synthetic();
        let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &output);
        let files = discover_invoices(dir.path(), "xml").unwrap();
        let report = converter.run(&files, |_| {}).unwrap();

        assert_eq!(report.summary_line(), "success: 2, failed: 0");
        assert!(output.join("a_huge_rate.pdf").exists());
        assert!(output.join("b_sample.pdf").exists());
    }

    #[test]
    fn test_existing_output_is_replaced() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("invoice.xml");
        fs::write(&input, SAMPLE_XML).unwrap();
        let output = dir.path().join("out");
        fs::create_dir(&output).unwrap();
        fs::write(output.join("invoice.pdf"), "stale").unwrap();

        let resources = RenderResources::synthetic();
        let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &output);
        let written = converter.convert_file(&input).unwrap();

        assert!(fs::read(written).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_failed_parse_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("invoice.xml");
        fs::write(&input, "not xml").unwrap();
        let output = dir.path().join("out");
        fs::create_dir(&output).unwrap();
        fs::write(output.join("invoice.pdf"), "stale").unwrap();

        let resources = RenderResources::synthetic();
        let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &output);
        assert!(converter.convert_file(&input).is_err());
        assert_eq!(fs::read_to_string(output.join("invoice.pdf")).unwrap(), "stale");
    }
}
