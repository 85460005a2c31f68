use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

use super::{display_name, FileOperation};
use crate::filters::{self, DOCX_EXTENSION, PDF_EXTENSION};
use crate::output;
use crate::results::{ConversionOutcome, OperationResult, Outcome};

/// Why a single conversion failed. The message is the cause line of the report.
#[derive(Error, Debug)]
enum ConvertError {
    #[error("{0} couldn't be found. Please install pandoc")]
    ConverterMissing(String),
    #[error("Experienced a pandoc runtime error: {0}")]
    ConverterFailed(String),
    #[error("Couldn't extract the text layer: {0}")]
    Extraction(String),
    #[error("Couldn't {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| ConvertError::Io {
            action,
            path: display_name(path),
            source,
        }
    }
}

/// How a file will be turned into plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Docx,
    Pdf,
    PlainText,
    Unsupported,
}

/// Picks the first free output name next to `source`:
/// `<stem> (<EXT>).txt`, then `<stem> (<EXT>) (1).txt`, `(2)`, ...
///
/// The lookup is not atomic: two workers converting `a.log` and `a.LOG`-style
/// siblings at the same instant may pick the same name.
pub fn output_path(source: &Path) -> PathBuf {
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tag = source
        .extension()
        .map(|e| e.to_string_lossy().to_uppercase())
        .unwrap_or_default();

    let mut candidate = parent.join(format!("{} ({}).txt", stem, tag));
    let mut duplicate = 0;
    while candidate.exists() {
        duplicate += 1;
        candidate = parent.join(format!("{} ({}) ({}).txt", stem, tag, duplicate));
    }
    candidate
}

/// Converts office documents, PDFs and plain-text-in-disguise files into `.txt`,
/// deleting the original on success
#[derive(Debug, Clone)]
pub struct Conversion {
    plain_text_extensions: Vec<String>,
    converter: String,
}

impl Conversion {
    pub fn new(plain_text_extensions: Vec<String>, converter: String) -> Self {
        Self {
            plain_text_extensions,
            converter,
        }
    }

    fn classify(&self, path: &Path) -> SourceKind {
        if filters::has_extension(path, DOCX_EXTENSION) {
            SourceKind::Docx
        } else if filters::has_extension(path, PDF_EXTENSION) {
            SourceKind::Pdf
        } else if filters::is_plain_text_fallback(path, &self.plain_text_extensions)
            && path.is_file()
        {
            SourceKind::PlainText
        } else {
            SourceKind::Unsupported
        }
    }

    fn convert_docx(&self, source: &Path, target: &Path) -> Result<(), ConvertError> {
        let output = Command::new(&self.converter)
            .args(["--from", "docx", "--to", "plain", "--output"])
            .arg(target)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ConvertError::ConverterMissing(self.converter.clone()),
                _ => ConvertError::ConverterFailed(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().next().unwrap_or("").trim();
            let detail = if first_line.is_empty() {
                output.status.to_string()
            } else {
                first_line.to_string()
            };
            return Err(ConvertError::ConverterFailed(detail));
        }
        fs::remove_file(source).map_err(ConvertError::io("remove", source))
    }

    fn convert_pdf(&self, source: &Path, target: &Path) -> Result<(), ConvertError> {
        let bytes = fs::read(source).map_err(ConvertError::io("read", source))?;
        // The PDF parser panics on some malformed documents
        let text = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        }))
        .map_err(|_| ConvertError::Extraction("the PDF parser crashed".to_string()))?
        .map_err(|e| ConvertError::Extraction(e.to_string()))?;

        fs::write(target, text).map_err(ConvertError::io("write", target))?;
        fs::remove_file(source).map_err(ConvertError::io("remove", source))
    }

    fn copy_plain_text(&self, source: &Path, target: &Path) -> Result<(), ConvertError> {
        let bytes = fs::read(source).map_err(ConvertError::io("read", source))?;
        let text = String::from_utf8_lossy(&bytes);
        if let std::borrow::Cow::Owned(_) = text {
            warn!("Invalid UTF-8 replaced in file: {}", source.display());
        }
        fs::write(target, text.as_bytes()).map_err(ConvertError::io("write", target))?;
        fs::remove_file(source).map_err(ConvertError::io("remove", source))
    }
}

impl FileOperation for Conversion {
    fn process(&self, path: &Path) -> OperationResult {
        let file_name = display_name(path);
        let kind = self.classify(path);
        debug!("Converting {} as {:?}", path.display(), kind);

        let converted = match kind {
            SourceKind::Unsupported => {
                return OperationResult::new(
                    format!("{} Skipped {}", output::skipped(), file_name),
                    Outcome::Conversion(ConversionOutcome::Skipped),
                );
            }
            SourceKind::Docx => self.convert_docx(path, &output_path(path)),
            SourceKind::Pdf => self.convert_pdf(path, &output_path(path)),
            SourceKind::PlainText => self.copy_plain_text(path, &output_path(path)),
        };

        match (converted, kind) {
            (Err(e), _) => OperationResult::conversion_fault(&file_name, &e.to_string()),
            (Ok(()), SourceKind::PlainText) => OperationResult::new(
                format!(
                    "{} ({}) is an unsupported file format\n{} Tried to convert {}",
                    output::unsure(),
                    filters::dotted_extension(path).unwrap_or_default(),
                    output::unsure_cont(),
                    file_name
                ),
                Outcome::Conversion(ConversionOutcome::Unsure),
            ),
            (Ok(()), _) => OperationResult::new(
                format!("{} Successfully converted {}", output::success(), file_name),
                Outcome::Conversion(ConversionOutcome::Success),
            ),
        }
    }
}
