use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::record::Table;

/// Whitespace (Unicode-aware, so U+3000 counts) plus `,` `、` `。`.
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,、。]+").expect("valid separator regex"));

/// Split a memo into its non-empty tokens.
pub fn tokenize(memo: &str) -> impl Iterator<Item = &str> {
    SEPARATORS.split(memo).filter(|token| !token.is_empty())
}

/// Deduplicated tokens of every memo, ascending by code point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    pub fn build<'a>(memos: impl IntoIterator<Item = &'a str>) -> Self {
        let words: BTreeSet<&str> = memos.into_iter().flat_map(tokenize).collect();
        Self {
            words: words.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_table(table: &Table) -> Self {
        Self::build(table.records().map(|r| r.memo.as_str()))
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Search-box suggestions: words starting with `input` (case-insensitive),
    /// excluding `input` itself.
    pub fn suggest_keywords(&self, input: &str) -> Vec<&str> {
        let input = input.trim();
        if input.is_empty() {
            return Vec::new();
        }
        let needle = input.to_lowercase();
        self.words
            .iter()
            .filter(|w| w.as_str() != input && w.to_lowercase().starts_with(&needle))
            .map(String::as_str)
            .collect()
    }

    /// Tag suggestions while typing a memo: words containing the memo's last
    /// whitespace-separated token (case-insensitive), excluding the token itself.
    pub fn suggest_tags(&self, memo: &str) -> Vec<&str> {
        let Some(last) = memo.split_whitespace().last() else {
            return Vec::new();
        };
        let needle = last.to_lowercase();
        self.words
            .iter()
            .filter(|w| w.as_str() != last && w.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// Append a chosen tag to the memo being typed.
pub fn append_tag(memo: &str, tag: &str) -> String {
    if memo.is_empty() {
        tag.to_string()
    } else {
        format!("{memo} {tag}")
    }
}

/// Performer suggestions: case-insensitive substring match, excluding the exact input.
pub fn suggest_performers<'a>(performers: &'a [String], input: &str) -> Vec<&'a str> {
    if input.is_empty() {
        return Vec::new();
    }
    let needle = input.to_lowercase();
    performers
        .iter()
        .filter(|p| p.as_str() != input && p.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}
