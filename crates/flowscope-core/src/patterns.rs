//! Ordered `(pattern, value)` dispatch tables.
//!
//! Every recognizer in the reducer (anchors, stages, summary rules, context
//! rules, noise, compaction) is one of these tables. Rules are tried in
//! declaration order and the first match wins.

use regex::{Captures, Regex};

/// Compiles a built-in pattern literal.
///
/// Built-in patterns are fixed at compile time and every table is exercised
/// by unit tests, so a failure here is a programming error.
pub(crate) fn regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

/// An ordered list of patterns, each tagged with a value.
#[derive(Debug)]
pub(crate) struct PatternTable<T> {
    rules: Vec<(Regex, T)>,
}

impl<T> PatternTable<T> {
    pub(crate) fn new<'p>(rules: impl IntoIterator<Item = (&'p str, T)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(pattern, value)| (regex(pattern), value))
                .collect(),
        }
    }

    /// Value of the first matching rule.
    pub(crate) fn first(&self, line: &str) -> Option<&T> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, value)| value)
    }

    /// Value and captures of the first matching rule.
    pub(crate) fn captures<'l>(&self, line: &'l str) -> Option<(&T, Captures<'l>)> {
        self.rules
            .iter()
            .find_map(|(re, value)| re.captures(line).map(|caps| (value, caps)))
    }

    /// Every matching rule, in declaration order.
    pub(crate) fn all_captures<'t, 'l>(
        &'t self,
        line: &'l str,
    ) -> impl Iterator<Item = (&'t T, Captures<'l>)> {
        self.rules
            .iter()
            .filter_map(move |(re, value)| re.captures(line).map(|caps| (value, caps)))
    }

    pub(crate) fn is_match(&self, line: &str) -> bool {
        self.rules.iter().any(|(re, _)| re.is_match(line))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }
}

/// A table whose rules carry no value; used for plain pattern sets.
pub(crate) type PatternSet = PatternTable<()>;

impl PatternSet {
    pub(crate) fn set<'p>(patterns: impl IntoIterator<Item = &'p str>) -> Self {
        Self::new(patterns.into_iter().map(|p| (p, ())))
    }
}

/// Text of capture group `i`, trimmed, or `""` when absent.
pub(crate) fn group<'l>(caps: &Captures<'l>, i: usize) -> &'l str {
    caps.get(i).map_or("", |m| m.as_str().trim())
}
