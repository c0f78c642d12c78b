//! Case-insensitive text rewriting for exported registry files
//!
//! Exported `.reg` text is retargeted to a new profile name or Office version by
//! plain substring replacement instead of a full re-parse. Matching ignores case the
//! same way the registry does (per-character simple uppercase), while every byte
//! outside a match is copied through untouched.

use crate::office::ProfileLocation;
use thiserror::Error;

/// Errors raised when building a rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// An empty search string would match everywhere and never advance
    #[error("search text must not be empty")]
    EmptySearch,
}

/// A single `(search, replacement)` pair compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    search: String,
    folded: Vec<char>,
    replacement: String,
}

impl RewriteRule {
    /// Create a rule, rejecting an empty search string
    pub fn new(
        search: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, RewriteError> {
        let search = search.into();
        if search.is_empty() {
            return Err(RewriteError::EmptySearch);
        }
        let folded = search.chars().map(fold).collect();
        Ok(Self {
            search,
            folded,
            replacement: replacement.into(),
        })
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every non-overlapping occurrence of the search text, scanning left to right
    ///
    /// The cursor always moves past a match before searching again, so a replacement
    /// that contains the search text is not matched a second time.
    pub fn apply(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some((start, end)) = self.find_from(text, cursor) {
            result.push_str(&text[cursor..start]);
            result.push_str(&self.replacement);
            cursor = end;
        }

        result.push_str(&text[cursor..]);
        result
    }

    /// Count the matches `apply` would replace
    pub fn count_matches(&self, text: &str) -> usize {
        let mut count = 0;
        let mut cursor = 0;
        while let Some((_, end)) = self.find_from(text, cursor) {
            count += 1;
            cursor = end;
        }
        count
    }

    /// Find the next match at or after byte offset `from`, returning its byte range
    fn find_from(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        text[from..]
            .char_indices()
            .find_map(|(offset, _)| {
                let start = from + offset;
                self.match_at(text, start).map(|end| (start, end))
            })
    }

    fn match_at(&self, text: &str, start: usize) -> Option<usize> {
        let mut chars = text[start..].char_indices();
        let mut end = start;
        for &expected in &self.folded {
            let (offset, c) = chars.next()?;
            if fold(c) != expected {
                return None;
            }
            end = start + offset + c.len_utf8();
        }
        Some(end)
    }
}

/// Replace all case-insensitive occurrences of `search` in `text` with `replacement`
///
/// # Arguments
/// * `text` - Text to rewrite
/// * `search` - Literal to look for; must not be empty
/// * `replacement` - Text substituted for each match (may be empty)
///
/// # Returns
/// The rewritten text, or `RewriteError::EmptySearch`
pub fn replace_caseless(
    text: &str,
    search: &str,
    replacement: &str,
) -> Result<String, RewriteError> {
    Ok(RewriteRule::new(search, replacement)?.apply(text))
}

/// Fold a character for comparison using its simple (single character) uppercase form
fn fold(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// The ordered rule set that retargets one profile to another location
///
/// Rules run narrow to broad: the bracketed key header, then the nested key prefix,
/// then the profile root. The root is a prefix of the other two search strings, so
/// running it first would rewrite the root inside them and leave the profile name
/// unconverted.
#[derive(Debug, Clone)]
pub struct ProfileConversion {
    rules: [RewriteRule; 3],
}

impl ProfileConversion {
    pub fn new(source: &ProfileLocation, destination: &ProfileLocation) -> Result<Self, RewriteError> {
        let source_path = source.path();
        let destination_path = destination.path();
        Ok(Self {
            rules: [
                RewriteRule::new(format!("{source_path}]"), format!("{destination_path}]"))?,
                RewriteRule::new(format!("{source_path}\\"), format!("{destination_path}\\"))?,
                RewriteRule::new(source.root(), destination.root())?,
            ],
        })
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Apply all rules in order
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
