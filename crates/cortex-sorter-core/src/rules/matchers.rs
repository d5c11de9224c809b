//! Single-criterion predicates. Each one is total: anything unexpected
//! about the candidate is a miss, never an error.

use std::cell::OnceCell;

use super::SortingRule;
use crate::extract::ContentExtractor;
use crate::scanner::FileCandidate;
use tracing::{debug, warn};

/// Extracted text for one candidate, fetched lazily and at most once no
/// matter how many rules inspect content.
pub struct ContentCache<'a> {
    extractor: &'a dyn ContentExtractor,
    text: OnceCell<Option<String>>,
}

impl<'a> ContentCache<'a> {
    pub fn new(extractor: &'a dyn ContentExtractor) -> Self {
        Self {
            extractor,
            text: OnceCell::new(),
        }
    }

    /// Lowercased document text, or `None` when extraction failed.
    fn text(&self, candidate: &FileCandidate) -> Option<&str> {
        self.text
            .get_or_init(|| match self.extractor.extract_text(&candidate.path) {
                Ok(text) => Some(text.to_lowercase()),
                Err(e) => {
                    warn!(
                        "Content extraction failed for '{}': {}",
                        candidate.file_name, e
                    );
                    None
                }
            })
            .as_deref()
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.extractor.supports(extension)
    }
}

pub fn matches_extension(candidate: &FileCandidate, rule: &SortingRule) -> bool {
    !candidate.extension.is_empty() && rule.extensions.contains(&candidate.extension)
}

/// True if any keyword occurs in the file name, ignoring case.
pub fn matches_filename(candidate: &FileCandidate, rule: &SortingRule) -> bool {
    let name = candidate.file_name.to_lowercase();
    rule.name_contains.iter().any(|kw| name.contains(kw.as_str()))
}

/// True if any keyword occurs in the extracted text. Files whose format
/// carries no text, and documents that fail to extract, never match.
pub fn matches_content(
    candidate: &FileCandidate,
    rule: &SortingRule,
    content: &ContentCache<'_>,
) -> bool {
    if rule.content_contains.is_empty() || !content.supports(&candidate.extension) {
        return false;
    }

    let Some(text) = content.text(candidate) else {
        return false;
    };

    match rule
        .content_contains
        .iter()
        .find(|kw| text.contains(kw.as_str()))
    {
        Some(kw) => {
            debug!("Content match: '{}' found in '{}'", kw, candidate.file_name);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    struct FixedText {
        text: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl ContentExtractor for FixedText {
        fn supports(&self, extension: &str) -> bool {
            extension == ".pdf"
        }

        fn extract_text(&self, _path: &Path) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text
                .map(str::to_string)
                .ok_or_else(|| ExtractError::Pdf("encrypted".to_string()))
        }
    }

    fn candidate(name: &str) -> FileCandidate {
        let path = PathBuf::from("/inbox").join(name);
        FileCandidate {
            extension: crate::scanner::normalized_extension(&path),
            file_name: name.to_string(),
            path,
            size: 10,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    fn rule(extensions: &[&str], names: &[&str], content: &[&str]) -> SortingRule {
        SortingRule::new(
            "test",
            "/sorted",
            extensions.iter().map(|s| s.to_string()).collect(),
            names.iter().map(|s| s.to_string()).collect(),
            content.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let r = rule(&["PDF", "png"], &[], &[]);
        assert!(matches_extension(&candidate("scan.Pdf"), &r));
        assert!(matches_extension(&candidate("shot.PNG"), &r));
        assert!(!matches_extension(&candidate("notes.txt"), &r));
        assert!(!matches_extension(&candidate("README"), &r));
    }

    #[test]
    fn test_filename_any_keyword() {
        let r = rule(&[], &["Invoice", "receipt"], &[]);
        assert!(matches_filename(&candidate("ACME_INVOICE_2024.pdf"), &r));
        assert!(matches_filename(&candidate("my-receipt.png"), &r));
        assert!(!matches_filename(&candidate("holiday.jpg"), &r));
    }

    #[test]
    fn test_content_extracted_once_per_candidate() {
        let extractor = FixedText {
            text: Some("Total due on Invoice #123"),
            calls: AtomicUsize::new(0),
        };
        let cache = ContentCache::new(&extractor);
        let c = candidate("bill.pdf");

        assert!(!matches_content(&c, &rule(&[], &[], &["contract"]), &cache));
        assert!(matches_content(&c, &rule(&[], &[], &["invoice"]), &cache));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_content_skips_unsupported_formats() {
        let extractor = FixedText {
            text: Some("Invoice"),
            calls: AtomicUsize::new(0),
        };
        let cache = ContentCache::new(&extractor);
        assert!(!matches_content(
            &candidate("photo.jpg"),
            &rule(&[], &[], &["invoice"]),
            &cache
        ));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extraction_failure_is_a_miss() {
        let extractor = FixedText {
            text: None,
            calls: AtomicUsize::new(0),
        };
        let cache = ContentCache::new(&extractor);
        let c = candidate("locked.pdf");
        assert!(!matches_content(&c, &rule(&[], &[], &["invoice"]), &cache));
        assert!(!matches_content(&c, &rule(&[], &[], &["contract"]), &cache));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }
}
