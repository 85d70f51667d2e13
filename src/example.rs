//! Example sentences for every (argument, category, canonical, value) combination.
use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::canonical::CanonicalForm;
use crate::category::GrammarCategory;
use crate::error::Result;
use crate::ranker::NaturalOrderRanker;
use crate::schema::{ArgumentSpec, TableSpec};
use crate::template::{render, MutableSpans, TemplateSentence};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub canonical: CanonicalForm,
    pub tokens: Vec<String>,
    pub spans: MutableSpans,
}

impl Example {
    fn new(canonical: &CanonicalForm, sentence: TemplateSentence) -> Self {
        Example {
            canonical: canonical.clone(),
            tokens: sentence.tokens,
            spans: sentence.spans,
        }
    }

    pub fn sentence(&self) -> String {
        self.tokens.join(" ")
    }

    /// The sentence with one token replaced.
    pub fn sentence_with(&self, position: usize, replacement: &str) -> String {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, t)| if i == position { replacement } else { t.as_str() })
            .join(" ")
    }

    /// The canonical obtained by replacing the token at `position`, which must
    /// lie in the prefix or suffix span.
    pub fn canonical_with(&self, position: usize, replacement: &str) -> CanonicalForm {
        let pick = |span: &[usize]| -> Vec<&str> {
            span.iter()
                .map(|&i| if i == position { replacement } else { self.tokens[i].as_str() })
                .collect()
        };
        let prefix = pick(&self.spans.prefix);
        let suffix = pick(&self.spans.suffix);
        CanonicalForm::from_words(&prefix, &suffix)
    }

    /// The sentence with the prefix moved right after the value, for a
    /// canonical without a value marker. `None` when there is nothing to move.
    pub fn value_first(&self) -> Option<String> {
        let spans = &self.spans;
        let last_value = *spans.value.last()?;
        if spans.prefix.is_empty() || !spans.suffix.is_empty() {
            return None;
        }
        let mut words = Vec::with_capacity(self.tokens.len());
        for (i, token) in self.tokens.iter().enumerate() {
            if spans.prefix.contains(&i) {
                continue;
            }
            words.push(token.as_str());
            if i == last_value {
                words.extend(spans.prefix.iter().map(|&p| self.tokens[p].as_str()));
            }
        }
        Some(words.join(" "))
    }

    /// The table name obtained by replacing the token at `position`, which
    /// must lie in the table span.
    pub fn table_with(&self, position: usize, replacement: &str) -> String {
        self.spans
            .table
            .iter()
            .map(|&i| if i == position { replacement } else { self.tokens[i].as_str() })
            .join(" ")
    }
}

/// Serialized shape of an example, as written by `construct_examples`.
#[derive(Debug, Serialize)]
pub struct ExampleRecord<'a> {
    pub canonical: String,
    pub sentence: String,
    pub spans: &'a MutableSpans,
}

impl<'a> From<&'a Example> for ExampleRecord<'a> {
    fn from(e: &'a Example) -> Self {
        ExampleRecord {
            canonical: e.canonical.to_string(),
            sentence: e.sentence(),
            spans: &e.spans,
        }
    }
}

/// Build the examples of every annotated category of `argument`.
///
/// Every annotated category gets an entry, even when it yields no example
/// (a value-bearing category with no known values).
pub fn construct_examples(table: &TableSpec, argument: &ArgumentSpec) -> BTreeMap<GrammarCategory, Vec<Example>> {
    let mut examples = BTreeMap::new();
    for (&category, canonicals) in &argument.canonicals {
        let mut out = Vec::new();
        if category.is_boolean() {
            // one example per canonical, in its declarative phrasing
            for canonical in canonicals {
                let first = render(category, &table.canonical, canonical.prefix(), "", canonical.suffix())
                    .into_iter()
                    .next();
                if let Some(sentence) = first {
                    out.push(Example::new(canonical, sentence));
                }
            }
        } else if category.is_value_free() {
            for canonical in canonicals {
                for sentence in render(category, &table.canonical, canonical.prefix(), "", canonical.suffix()) {
                    out.push(Example::new(canonical, sentence));
                }
            }
        } else {
            for value in &argument.values {
                for canonical in canonicals {
                    for sentence in
                        render(category, &table.canonical, canonical.prefix(), value, canonical.suffix())
                    {
                        out.push(Example::new(canonical, sentence));
                    }
                }
            }
        }
        examples.insert(category, out);
    }
    examples
}

/// Decide, for every canonical without a value marker, whether it reads
/// better before or after the value, and move it after the value when the
/// language model prefers that for a strict majority of the comparisons.
pub fn natural_ordering(
    table: &TableSpec,
    argument: &ArgumentSpec,
    ranker: &NaturalOrderRanker<'_>,
) -> Result<ArgumentSpec> {
    let mut updated = argument.clone();
    for (&category, canonicals) in &argument.canonicals {
        if category.is_value_free() {
            continue;
        }
        let mut reordered = Vec::with_capacity(canonicals.len());
        for canonical in canonicals {
            if canonical.has_marker() {
                reordered.push(canonical.clone());
                continue;
            }
            let (mut before, mut after) = (0usize, 0usize);
            for value in &argument.values {
                let prefixed = render(category, &table.canonical, canonical.prefix(), value, "");
                let suffixed = render(category, &table.canonical, "", value, canonical.prefix());
                for (p, s) in prefixed.iter().zip(&suffixed) {
                    let order = ranker.rank(&[p.text(), s.text()])?;
                    if order[0] == 0 {
                        before += 1;
                    } else {
                        after += 1;
                    }
                }
            }
            if after > before {
                debug!("{category}: {canonical} reads better after the value ({after} vs {before})");
                reordered.push(canonical.moved_after_value());
            } else {
                reordered.push(canonical.clone());
            }
        }
        // a moved canonical may already be annotated in its `# phrase` form
        let reordered = reordered.into_iter().unique().collect();
        updated = updated.with_canonicals(category, reordered);
    }
    Ok(updated)
}
