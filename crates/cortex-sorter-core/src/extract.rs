use std::fs::File;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

/// Plain-text extensions read directly rather than parsed.
const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".csv", ".log", ".json", ".xml", ".html", ".yml", ".yaml", ".toml",
];

/// Upper bound on bytes read from a plain-text file.
const MAX_TEXT_BYTES: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("no text found")]
    Empty,

    #[error("unsupported extension '{0}'")]
    Unsupported(String),
}

/// Turns a document into searchable text. Implementations must be safe to
/// share between worker threads.
pub trait ContentExtractor: Send + Sync {
    /// Whether files with this (normalized, dotted) extension carry text.
    fn supports(&self, extension: &str) -> bool;

    fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// PDFs through `pdf-extract`, common text formats read as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl ContentExtractor for DocumentExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == ".pdf" || TEXT_EXTENSIONS.contains(&extension)
    }

    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let extension = crate::scanner::normalized_extension(path);
        let text = if extension == ".pdf" {
            extract_pdf(path)?
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            read_text_prefix(path)?
        } else {
            return Err(ExtractError::Unsupported(extension));
        };

        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    // The PDF parser panics on some malformed documents.
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
    }
}

fn read_text_prefix(path: &Path) -> Result<String, ExtractError> {
    let mut buffer = Vec::new();
    File::open(path)?
        .take(MAX_TEXT_BYTES)
        .read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
