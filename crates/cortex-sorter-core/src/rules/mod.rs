pub mod matchers;

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::{expand_home, RuleConfig};
use crate::error::Error;
use crate::extract::ContentExtractor;
use crate::scanner::FileCandidate;
use matchers::{matches_content, matches_extension, matches_filename, ContentCache};
use tracing::debug;

/// A validated sorting rule with normalized criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortingRule {
    pub name: String,
    /// Lowercase, each with a leading dot.
    pub extensions: BTreeSet<String>,
    /// Lowercase keywords.
    pub name_contains: Vec<String>,
    /// Lowercase keywords.
    pub content_contains: Vec<String>,
    pub dest: PathBuf,
    /// Number of non-empty criterion categories, 0 to 3.
    pub specificity: u8,
}

impl SortingRule {
    pub fn new(
        name: impl Into<String>,
        dest: impl Into<PathBuf>,
        extensions: Vec<String>,
        name_contains: Vec<String>,
        content_contains: Vec<String>,
    ) -> Self {
        let extensions: BTreeSet<String> = extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect();
        let name_contains = normalize_keywords(name_contains);
        let content_contains = normalize_keywords(content_contains);

        let specificity = [
            !extensions.is_empty(),
            !name_contains.is_empty(),
            !content_contains.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u8;

        Self {
            name: name.into(),
            extensions,
            name_contains,
            content_contains,
            dest: dest.into(),
            specificity,
        }
    }

    fn from_config(raw: &RuleConfig) -> Result<Self, Error> {
        let name = raw.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidRule {
                rule: raw.name.clone(),
                reason: "rule name is empty".to_string(),
            });
        }

        let dest = match raw.dest.as_deref().map(str::trim) {
            Some(dest) if !dest.is_empty() => expand_home(&PathBuf::from(dest)),
            _ => {
                return Err(Error::InvalidRule {
                    rule: name.to_string(),
                    reason: "missing destination".to_string(),
                })
            }
        };

        Ok(Self::new(
            name,
            dest,
            raw.extensions.clone().unwrap_or_default(),
            raw.name_contains.clone().unwrap_or_default(),
            raw.content_contains.clone().unwrap_or_default(),
        ))
    }

    /// All declared categories hold (AND across categories, OR within one).
    pub fn matches(&self, candidate: &FileCandidate, content: &ContentCache<'_>) -> bool {
        if !self.extensions.is_empty() && !matches_extension(candidate, self) {
            return false;
        }
        if !self.name_contains.is_empty() && !matches_filename(candidate, self) {
            return false;
        }
        if !self.content_contains.is_empty() && !matches_content(candidate, self, content) {
            return false;
        }
        true
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        return None;
    }
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{}", ext))
    }
}

fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}

/// Rules frozen at load time, most specific first. Rules of equal
/// specificity keep their configuration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<SortingRule>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<SortingRule>) -> Self {
        // sort_by_key is stable
        rules.sort_by_key(|r| Reverse(r.specificity));
        Self { rules }
    }

    /// Validate raw rules. Any invalid rule rejects the whole set.
    pub fn from_configs(raw: &[RuleConfig]) -> Result<Self, Error> {
        let rules = raw
            .iter()
            .map(SortingRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[SortingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule, in priority order, that fully matches.
    pub fn evaluate(
        &self,
        candidate: &FileCandidate,
        extractor: &dyn ContentExtractor,
    ) -> Option<&SortingRule> {
        let content = ContentCache::new(extractor);
        let matched = self.rules.iter().find(|rule| rule.matches(candidate, &content));
        match matched {
            Some(rule) => debug!("'{}' matched rule '{}'", candidate.file_name, rule.name),
            None => debug!("'{}' matched no rule", candidate.file_name),
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, dest: Option<&str>, ext: &[&str], names: &[&str]) -> RuleConfig {
        RuleConfig {
            name: name.to_string(),
            dest: dest.map(str::to_string),
            extensions: (!ext.is_empty()).then(|| ext.iter().map(|s| s.to_string()).collect()),
            name_contains: (!names.is_empty())
                .then(|| names.iter().map(|s| s.to_string()).collect()),
            content_contains: None,
        }
    }

    #[test]
    fn test_normalization() {
        let rule = SortingRule::new(
            "r",
            "/d",
            vec!["PDF".into(), ".Jpg".into(), " ".into()],
            vec!["  Invoice ".into(), "".into()],
            vec![],
        );
        assert!(rule.extensions.contains(".pdf"));
        assert!(rule.extensions.contains(".jpg"));
        assert_eq!(rule.extensions.len(), 2);
        assert_eq!(rule.name_contains, vec!["invoice".to_string()]);
        assert_eq!(rule.specificity, 2);
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        let err = RuleSet::from_configs(&[raw("Docs", None, &["pdf"], &[])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { .. }));

        let err = RuleSet::from_configs(&[raw("Docs", Some("  "), &["pdf"], &[])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { .. }));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = RuleSet::from_configs(&[raw(" ", Some("/d"), &[], &[])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { .. }));
    }

    #[test]
    fn test_sorted_by_specificity_then_declaration() {
        let set = RuleSet::from_configs(&[
            raw("catch-all", Some("/misc"), &[], &[]),
            raw("pdf", Some("/pdf"), &["pdf"], &[]),
            raw("pdf-invoice", Some("/inv"), &["pdf"], &["invoice"]),
            raw("images", Some("/img"), &["png"], &[]),
        ])
        .unwrap();

        let names: Vec<&str> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pdf-invoice", "pdf", "images", "catch-all"]);
    }
}
