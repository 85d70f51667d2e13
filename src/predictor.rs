//! Masked-language-model candidate prediction.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub const MASK_TOKEN: &str = "[MASK]";

/// Number of model predictions requested before filtering.
pub const OVERSAMPLE: usize = 100;

pub const BLACK_LIST: &[&str] = &["a", "an", "the", "its", "their", "his", "her"];

/// Function words that are never useful as a table-name synonym.
pub const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "we", "our", "you", "your", "he", "him", "she", "it", "they", "them",
    "what", "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "and", "but", "if",
    "or", "because", "as", "of", "at", "by", "for", "with", "about", "to", "from", "in", "out",
    "on", "off", "over", "then", "there", "here", "all", "any", "some", "no", "not", "one", "other",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MaskedPrediction {
    pub token: String,
    pub score: f64,
}

/// One fill-in request for a masked language model.
#[derive(Debug, Clone, Copy)]
pub struct MaskedQuery<'a> {
    /// The sentence as generated from the templates.
    pub original: &'a [String],
    /// The sentence the model should condition on; `input[position]` is
    /// [`MASK_TOKEN`] unless masking is disabled.
    pub input: &'a [String],
    pub position: usize,
}

pub trait MaskedLanguageModel {
    /// The `top_n` most probable vocabulary tokens at `query.position`, most
    /// probable first.
    ///
    /// Returns an empty list when the word at that position does not map onto
    /// exactly one model token.
    fn top_tokens(&self, query: &MaskedQuery<'_>, top_n: usize) -> Result<Vec<MaskedPrediction>>;
}

impl<M: MaskedLanguageModel + ?Sized> MaskedLanguageModel for &M {
    fn top_tokens(&self, query: &MaskedQuery<'_>, top_n: usize) -> Result<Vec<MaskedPrediction>> {
        (**self).top_tokens(query, top_n)
    }
}

/// What a candidate must not look like for a given table/argument.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter<'a> {
    pub table_canonical: &'a str,
    /// Literal values of the argument; empty when predicting for no argument.
    pub known_values: &'a [String],
    pub stop_words: bool,
}

impl<'a> CandidateFilter<'a> {
    fn accepts(&self, candidate: &str, original: &str) -> bool {
        if candidate == original || candidate == MASK_TOKEN {
            return false;
        }
        if BLACK_LIST.contains(&candidate) {
            return false;
        }
        if self.stop_words && STOP_WORDS.contains(&candidate) {
            return false;
        }
        if candidate.is_empty() || !candidate.chars().all(char::is_alphabetic) {
            return false;
        }
        if !self.table_canonical.is_empty() && candidate.contains(self.table_canonical) {
            return false;
        }
        !self.known_values.iter().any(|v| v == candidate)
    }
}

pub struct MaskedCandidatePredictor<'m> {
    model: &'m dyn MaskedLanguageModel,
    mask: bool,
    common_words: Option<HashSet<String>>,
    retry: RetryPolicy,
}

impl<'m> MaskedCandidatePredictor<'m> {
    pub fn new(model: &'m dyn MaskedLanguageModel) -> Self {
        MaskedCandidatePredictor {
            model,
            mask: true,
            common_words: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_masking(mut self, mask: bool) -> Self {
        self.mask = mask;
        self
    }

    /// Only predict for words in this set (and for explicit mask tokens).
    pub fn with_common_words(mut self, words: HashSet<String>) -> Self {
        self.common_words = Some(words);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Up to `k` substitutes for the token at `position`, most probable first.
    pub fn predict(
        &self,
        filter: &CandidateFilter<'_>,
        words: &[String],
        position: usize,
        k: usize,
    ) -> Result<Vec<String>> {
        let Some(word) = words.get(position) else {
            return Ok(Vec::new());
        };
        if let Some(common) = &self.common_words {
            if word != MASK_TOKEN && !common.contains(&word.to_lowercase()) {
                return Ok(Vec::new());
            }
        }

        let masked;
        let input = if self.mask && word != MASK_TOKEN {
            let mut m = words.to_vec();
            m[position] = MASK_TOKEN.to_owned();
            masked = m;
            masked.as_slice()
        } else {
            words
        };
        let query = MaskedQuery {
            original: words,
            input,
            position,
        };

        let predictions = self
            .retry
            .run(&format!("predicting {word:?}"), || self.model.top_tokens(&query, k.max(OVERSAMPLE)))?;
        if predictions.is_empty() {
            debug!("no model token for {word:?} in {:?}", words.join(" "));
        }

        Ok(predictions
            .into_iter()
            .map(|p| p.token)
            .filter(|t| filter.accepts(t, word))
            .take(k)
            .collect())
    }
}

/// Read a one-word-per-line list, lowercased.
pub fn load_word_list(path: &Path) -> Result<HashSet<String>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(raw
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect())
}
