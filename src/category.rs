//! Grammar categories a canonical form can be annotated with.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarCategory {
    Base,
    Property,
    PropertyTrue,
    PropertyFalse,
    Verb,
    VerbTrue,
    VerbFalse,
    PassiveVerb,
    PassiveVerbTrue,
    PassiveVerbFalse,
    ReverseProperty,
    ReversePropertyTrue,
    ReversePropertyFalse,
    ReverseVerb,
    Preposition,
    PrepositionTrue,
    PrepositionFalse,
    AdjectiveTrue,
    AdjectiveFalse,
}

impl GrammarCategory {
    pub const ALL: [GrammarCategory; 19] = [
        GrammarCategory::Base,
        GrammarCategory::Property,
        GrammarCategory::PropertyTrue,
        GrammarCategory::PropertyFalse,
        GrammarCategory::Verb,
        GrammarCategory::VerbTrue,
        GrammarCategory::VerbFalse,
        GrammarCategory::PassiveVerb,
        GrammarCategory::PassiveVerbTrue,
        GrammarCategory::PassiveVerbFalse,
        GrammarCategory::ReverseProperty,
        GrammarCategory::ReversePropertyTrue,
        GrammarCategory::ReversePropertyFalse,
        GrammarCategory::ReverseVerb,
        GrammarCategory::Preposition,
        GrammarCategory::PrepositionTrue,
        GrammarCategory::PrepositionFalse,
        GrammarCategory::AdjectiveTrue,
        GrammarCategory::AdjectiveFalse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GrammarCategory::Base => "base",
            GrammarCategory::Property => "property",
            GrammarCategory::PropertyTrue => "property_true",
            GrammarCategory::PropertyFalse => "property_false",
            GrammarCategory::Verb => "verb",
            GrammarCategory::VerbTrue => "verb_true",
            GrammarCategory::VerbFalse => "verb_false",
            GrammarCategory::PassiveVerb => "passive_verb",
            GrammarCategory::PassiveVerbTrue => "passive_verb_true",
            GrammarCategory::PassiveVerbFalse => "passive_verb_false",
            GrammarCategory::ReverseProperty => "reverse_property",
            GrammarCategory::ReversePropertyTrue => "reverse_property_true",
            GrammarCategory::ReversePropertyFalse => "reverse_property_false",
            GrammarCategory::ReverseVerb => "reverse_verb",
            GrammarCategory::Preposition => "preposition",
            GrammarCategory::PrepositionTrue => "preposition_true",
            GrammarCategory::PrepositionFalse => "preposition_false",
            GrammarCategory::AdjectiveTrue => "adjective_true",
            GrammarCategory::AdjectiveFalse => "adjective_false",
        }
    }

    /// Boolean variants describe the argument without ever mentioning a value.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            GrammarCategory::PropertyTrue
                | GrammarCategory::PropertyFalse
                | GrammarCategory::VerbTrue
                | GrammarCategory::VerbFalse
                | GrammarCategory::PassiveVerbTrue
                | GrammarCategory::PassiveVerbFalse
                | GrammarCategory::ReversePropertyTrue
                | GrammarCategory::ReversePropertyFalse
                | GrammarCategory::PrepositionTrue
                | GrammarCategory::PrepositionFalse
                | GrammarCategory::AdjectiveTrue
                | GrammarCategory::AdjectiveFalse
        )
    }

    /// Categories whose templates never contain a value slot.
    pub fn is_value_free(self) -> bool {
        self.is_boolean() || matches!(self, GrammarCategory::Base | GrammarCategory::ReverseVerb)
    }
}

impl fmt::Display for GrammarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown grammar category {:?}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for GrammarCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrammarCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}
