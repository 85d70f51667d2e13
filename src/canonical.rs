//! Canonical forms: phrases describing a property, optionally split around
//! the position of the value by a `#` marker (`"serves # cuisine"`).
use std::fmt;

use itertools::Itertools;

use crate::error::{Error, Result};

pub const VALUE_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm {
    prefix: String,
    suffix: String,
    has_marker: bool,
}

impl CanonicalForm {
    pub fn parse(raw: &str) -> Result<Self> {
        let (prefix, suffix) = split_canonical(raw)?;
        Ok(CanonicalForm {
            prefix,
            suffix,
            has_marker: raw.contains(VALUE_MARKER),
        })
    }

    /// Rebuild a canonical from the words of its two segments.
    ///
    /// A non-empty suffix always gets an explicit marker, an empty one never does.
    pub fn from_words<P, S>(prefix: &[P], suffix: &[S]) -> Self
    where
        P: AsRef<str>,
        S: AsRef<str>,
    {
        CanonicalForm {
            prefix: join_words(prefix),
            suffix: join_words(suffix),
            has_marker: !suffix.is_empty(),
        }
    }

    /// The same phrase, placed entirely after the value.
    pub fn moved_after_value(&self) -> Self {
        CanonicalForm {
            prefix: String::new(),
            suffix: self.prefix.clone(),
            has_marker: true,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn has_marker(&self) -> bool {
        self.has_marker
    }

    pub fn prefix_words(&self) -> impl Iterator<Item = &str> {
        self.prefix.split_whitespace()
    }

    pub fn suffix_words(&self) -> impl Iterator<Item = &str> {
        self.suffix.split_whitespace()
    }
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_marker {
            return f.write_str(&self.prefix);
        }
        let joined = format!("{} {} {}", self.prefix, VALUE_MARKER, self.suffix);
        f.write_str(joined.trim())
    }
}

fn join_words<W: AsRef<str>>(words: &[W]) -> String {
    words.iter().map(|w| AsRef::<str>::as_ref(w)).join(" ")
}

/// Split a canonical into the text before and after the value marker.
///
/// Both halves are trimmed; a canonical without a marker is all prefix.
pub fn split_canonical(canonical: &str) -> Result<(String, String)> {
    let mut parts = canonical.split(VALUE_MARKER);
    let prefix = parts.next().unwrap_or_default().trim().to_owned();
    let suffix = parts.next().unwrap_or_default().trim().to_owned();
    if parts.next().is_some() {
        return Err(Error::InvalidCanonical(canonical.to_owned()));
    }
    Ok((prefix, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_without_marker() {
        let (p, s) = split_canonical("serves cuisine").unwrap();
        assert_eq!(p, "serves cuisine");
        assert_eq!(s, "");
    }

    #[test]
    fn split_with_leading_marker() {
        let (p, s) = split_canonical("# cuisine").unwrap();
        assert_eq!(p, "");
        assert_eq!(s, "cuisine");
    }

    #[test]
    fn split_round_trips() {
        for raw in ["serves # food", "rated #stars", "# 's", "price #", "#"] {
            let (p, s) = split_canonical(raw).unwrap();
            let rejoined = [p.as_str(), s.as_str()].join("#");
            let normalized: String = raw
                .split('#')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("#");
            assert_eq!(rejoined, normalized);
        }
    }

    #[test]
    fn two_markers_are_rejected() {
        assert!(matches!(
            split_canonical("a # b # c"),
            Err(Error::InvalidCanonical(_))
        ));
    }

    #[test]
    fn display_normalizes_spacing() {
        assert_eq!(CanonicalForm::parse("serves#food").unwrap().to_string(), "serves # food");
        assert_eq!(CanonicalForm::parse("# cuisine").unwrap().to_string(), "# cuisine");
        assert_eq!(CanonicalForm::parse("rating").unwrap().to_string(), "rating");
        assert_eq!(CanonicalForm::parse("#").unwrap().to_string(), "#");
    }

    #[test]
    fn from_words_adds_marker_only_for_suffix() {
        let c = CanonicalForm::from_words(&["serves"], &["dishes"]);
        assert_eq!(c.to_string(), "serves # dishes");
        let c = CanonicalForm::from_words::<&str, &str>(&[], &["food"]);
        assert_eq!(c.to_string(), "# food");
        let c = CanonicalForm::from_words::<&str, &str>(&["cost"], &[]);
        assert_eq!(c.to_string(), "cost");
    }

    #[test]
    fn moved_after_value() {
        let c = CanonicalForm::parse("cuisine").unwrap().moved_after_value();
        assert_eq!(c.prefix(), "");
        assert_eq!(c.suffix(), "cuisine");
        assert_eq!(c.to_string(), "# cuisine");
    }
}
