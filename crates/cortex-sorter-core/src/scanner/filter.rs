use glob::{MatchOptions, Pattern};
use std::path::Path;

use crate::error::Error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// File-name globs for files that are never sorted: hidden files, editor
/// backups, partial downloads.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    pub fn new(globs: &[String]) -> Result<Self, Error> {
        let patterns = globs
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|e| {
                    Error::Other(format!("Invalid ignore pattern '{}': {}", glob, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return true;
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(&name, MATCH_OPTIONS))
    }
}
