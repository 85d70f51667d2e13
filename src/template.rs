//! Template sentences for each grammar category.
//!
//! Every sentence is built token by token, so the positions of the canonical
//! prefix, suffix, value and table name are recorded while the sentence is
//! assembled instead of being searched for afterwards.
use serde::Serialize;

use crate::category::GrammarCategory;

/// Token positions of the parts of a sentence that came from the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutableSpans {
    pub prefix: Vec<usize>,
    pub suffix: Vec<usize>,
    pub value: Vec<usize>,
    pub table: Vec<usize>,
}

impl MutableSpans {
    /// Positions a synonym can be predicted for, prefix first.
    pub fn canonical_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.prefix.iter().chain(self.suffix.iter()).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSentence {
    pub tokens: Vec<String>,
    pub spans: MutableSpans,
}

impl TemplateSentence {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Prefix,
    Suffix,
    Value,
    Table,
}

#[derive(Default)]
struct SentenceBuilder {
    tokens: Vec<String>,
    spans: MutableSpans,
}

impl SentenceBuilder {
    fn lit(mut self, text: &str) -> Self {
        self.tokens.extend(text.split_whitespace().map(str::to_owned));
        self
    }

    fn slot(mut self, slot: Slot, text: &str) -> Self {
        for word in text.split_whitespace() {
            let span = match slot {
                Slot::Prefix => &mut self.spans.prefix,
                Slot::Suffix => &mut self.spans.suffix,
                Slot::Value => &mut self.spans.value,
                Slot::Table => &mut self.spans.table,
            };
            span.push(self.tokens.len());
            self.tokens.push(word.to_owned());
        }
        self
    }

    fn table(self, table: &str) -> Self {
        self.slot(Slot::Table, table)
    }

    // "who" for people, "which <table>" for everything else
    fn question_start(self, table: &str) -> Self {
        if table == "person" {
            self.lit("who")
        } else {
            self.lit("which").table(table)
        }
    }

    fn phrase(self, parts: &Parts) -> Self {
        self.slot(Slot::Prefix, parts.prefix)
            .slot(Slot::Value, parts.value)
            .slot(Slot::Suffix, parts.suffix)
    }

    fn build(self) -> TemplateSentence {
        TemplateSentence {
            tokens: self.tokens,
            spans: self.spans,
        }
    }
}

struct Parts<'a> {
    table: &'a str,
    prefix: &'a str,
    value: &'a str,
    suffix: &'a str,
}

fn start() -> SentenceBuilder {
    SentenceBuilder::default()
}

/// Render the template sentences of `category`.
///
/// `value` is ignored by boolean categories and by `base`/`reverse_verb`.
pub fn render(
    category: GrammarCategory,
    table: &str,
    prefix: &str,
    value: &str,
    suffix: &str,
) -> Vec<TemplateSentence> {
    use GrammarCategory::*;

    let value = if category.is_value_free() { "" } else { value };
    let p = Parts {
        table,
        prefix,
        value,
        suffix,
    };
    match category {
        Base => base(&p),
        Property | PropertyTrue | PropertyFalse => property(&p),
        Verb | VerbTrue | VerbFalse => verb(&p),
        PassiveVerb | PassiveVerbTrue | PassiveVerbFalse | Preposition | PrepositionTrue
        | PrepositionFalse => passive(&p),
        ReverseProperty | ReversePropertyTrue | ReversePropertyFalse => reverse_property(&p),
        ReverseVerb => reverse_verb(&p),
        AdjectiveTrue | AdjectiveFalse => adjective(&p),
    }
}

fn base(p: &Parts) -> Vec<TemplateSentence> {
    vec![
        start()
            .lit("what is the")
            .slot(Slot::Prefix, p.prefix)
            .lit("of the")
            .table(p.table)
            .lit("?")
            .build(),
        start()
            .lit("what is the")
            .table(p.table)
            .lit("'s")
            .slot(Slot::Prefix, p.prefix)
            .lit("?")
            .build(),
        start()
            .lit("what")
            .slot(Slot::Prefix, p.prefix)
            .lit("does the")
            .table(p.table)
            .lit("have ?")
            .build(),
    ]
}

fn property(p: &Parts) -> Vec<TemplateSentence> {
    vec![
        start().lit("show me a").table(p.table).lit("with").phrase(p).lit(".").build(),
        start().question_start(p.table).lit("has").phrase(p).lit("?").build(),
    ]
}

fn verb(p: &Parts) -> Vec<TemplateSentence> {
    vec![
        start().question_start(p.table).phrase(p).lit("?").build(),
        start().lit("show me a").table(p.table).lit("that").phrase(p).lit(".").build(),
    ]
}

fn passive(p: &Parts) -> Vec<TemplateSentence> {
    vec![
        start().lit("show me a").table(p.table).phrase(p).lit(".").build(),
        start().question_start(p.table).lit("is").phrase(p).lit(".").build(),
    ]
}

fn reverse_property(p: &Parts) -> Vec<TemplateSentence> {
    vec![start().question_start(p.table).lit("is a").phrase(p).lit("?").build()]
}

fn reverse_verb(p: &Parts) -> Vec<TemplateSentence> {
    vec![start()
        .lit("who")
        .slot(Slot::Prefix, p.prefix)
        .lit("the")
        .table(p.table)
        .lit("?")
        .build()]
}

fn adjective(p: &Parts) -> Vec<TemplateSentence> {
    vec![
        start()
            .lit("show me a")
            .slot(Slot::Prefix, p.prefix)
            .table(p.table)
            .lit(".")
            .build(),
        start()
            .question_start(p.table)
            .lit("is")
            .slot(Slot::Prefix, p.prefix)
            .lit("?")
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sentences: &[TemplateSentence]) -> Vec<String> {
        sentences.iter().map(TemplateSentence::text).collect()
    }

    #[test]
    fn base_has_three_questions() {
        let out = render(GrammarCategory::Base, "restaurant", "name", "", "");
        assert_eq!(out.len(), 3);
        for s in &out {
            assert!(s.tokens.iter().any(|t| t == "name"));
            assert!(s.tokens.iter().any(|t| t == "restaurant"));
            assert!(s.spans.value.is_empty());
        }
        assert_eq!(out[2].text(), "what name does the restaurant have ?");
    }

    #[test]
    fn property_with_value() {
        let out = render(GrammarCategory::Property, "restaurant", "price", "cheap", "");
        assert_eq!(
            texts(&out),
            vec![
                "show me a restaurant with price cheap .",
                "which restaurant has price cheap ?"
            ]
        );
        assert_eq!(out[0].spans.prefix, vec![5]);
        assert_eq!(out[0].spans.value, vec![6]);
        assert_eq!(out[0].spans.table, vec![3]);
        assert_eq!(out[1].spans.table, vec![1]);
    }

    #[test]
    fn person_questions_use_who() {
        let out = render(GrammarCategory::Verb, "person", "works for", "google", "");
        assert_eq!(out[0].text(), "who works for google ?");
        assert!(out[0].spans.table.is_empty());
        assert_eq!(out[1].spans.table, vec![3]);
    }

    #[test]
    fn boolean_variant_drops_value() {
        let out = render(GrammarCategory::PropertyTrue, "restaurant", "delivery", "ignored", "");
        assert_eq!(
            texts(&out),
            vec!["show me a restaurant with delivery .", "which restaurant has delivery ?"]
        );
        assert!(out.iter().all(|s| s.spans.value.is_empty()));
    }

    #[test]
    fn repeated_words_keep_their_own_positions() {
        // "the" appears in the template before the prefix
        let out = render(GrammarCategory::Base, "restaurant", "the address", "", "");
        assert_eq!(out[0].text(), "what is the the address of the restaurant ?");
        assert_eq!(out[0].spans.prefix, vec![3, 4]);
    }

    #[test]
    fn suffix_after_value() {
        let out = render(GrammarCategory::Verb, "restaurant", "serves", "italian", "food");
        assert_eq!(out[0].text(), "which restaurant serves italian food ?");
        assert_eq!(out[0].spans.prefix, vec![2]);
        assert_eq!(out[0].spans.value, vec![3]);
        assert_eq!(out[0].spans.suffix, vec![4]);
        let positions: Vec<usize> = out[0].spans.canonical_positions().collect();
        assert_eq!(positions, vec![2, 4]);
    }

    #[test]
    fn reverse_forms() {
        let out = render(GrammarCategory::ReverseVerb, "movie", "directed", "", "");
        assert_eq!(texts(&out), vec!["who directed the movie ?"]);
        let out = render(GrammarCategory::ReverseProperty, "person", "member of", "acme", "");
        assert_eq!(texts(&out), vec!["who is a member of acme ?"]);
    }

    #[test]
    fn adjective_forms() {
        let out = render(GrammarCategory::AdjectiveTrue, "hotel", "pet friendly", "", "");
        assert_eq!(
            texts(&out),
            vec!["show me a pet friendly hotel .", "which hotel is pet friendly ?"]
        );
    }
}
