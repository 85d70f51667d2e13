//! Candidate canonicals: assembled from per-position predictions, tallied, pruned.
use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::category::GrammarCategory;
use crate::error::{Error, Result};
use crate::example::Example;
use crate::predictor::{CandidateFilter, MaskedCandidatePredictor};
use crate::ranker::NaturalOrderRanker;
use crate::schema::{ArgumentSpec, TableSpec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PruningMode {
    /// One vote per supporting sentence.
    #[default]
    Count,
    /// Votes weighted by how natural the substituted sentence is compared to
    /// the most natural ordering of the original.
    Ranked,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTally {
    pub score: f64,
    pub sentences: Vec<String>,
}

impl CandidateTally {
    fn vote(&mut self, weight: f64, sentence: String) {
        self.score += weight;
        self.sentences.push(sentence);
    }

    /// Output shape: a bare number, or `{score, sentences}` when asked for.
    /// Count-mode scores are whole numbers and are written as integers.
    pub fn to_json(&self, mode: PruningMode, with_sentences: bool) -> Value {
        let score = match mode {
            PruningMode::Count => json!(self.score.round() as u64),
            PruningMode::Ranked => json!(self.score),
        };
        if with_sentences {
            json!({ "score": score, "sentences": self.sentences })
        } else {
            score
        }
    }
}

/// Candidate canonical (normalized display form) to its tally.
pub type Tallies = BTreeMap<String, CandidateTally>;

/// Keep candidates whose score is strictly above `threshold` times the best score.
pub fn prune(tallies: Tallies, threshold: f64) -> Tallies {
    let max = tallies.values().map(|t| t.score).fold(0.0_f64, f64::max);
    let cutoff = max * threshold;
    tallies.into_iter().filter(|(_, t)| t.score > cutoff).collect()
}

/// Table-name synonyms: keep words predicted more than `threshold` times the
/// average count expected per slot (`sum / k`).
pub fn prune_domains(counts: BTreeMap<String, u64>, k: usize, threshold: f64) -> BTreeMap<String, u64> {
    let sum: u64 = counts.values().sum();
    let cutoff = sum as f64 / k.max(1) as f64 * threshold;
    counts.into_iter().filter(|(_, c)| *c as f64 > cutoff).collect()
}

/// The more natural of the example sentence and its value-first ordering.
fn natural_reference(ranker: &NaturalOrderRanker<'_>, example: &Example) -> Result<String> {
    let original = example.sentence();
    let Some(value_first) = example.value_first() else {
        return Ok(original);
    };
    let order = ranker.rank(&[&original, &value_first])?;
    Ok(if order[0] == 0 { original } else { value_first })
}

pub struct CandidateAssembler<'a> {
    predictor: &'a MaskedCandidatePredictor<'a>,
    ranker: Option<&'a NaturalOrderRanker<'a>>,
    mode: PruningMode,
    k: usize,
    threshold: f64,
}

impl<'a> CandidateAssembler<'a> {
    pub fn new(predictor: &'a MaskedCandidatePredictor<'a>, k: usize, threshold: f64) -> Self {
        CandidateAssembler {
            predictor,
            ranker: None,
            mode: PruningMode::Count,
            k,
            threshold,
        }
    }

    /// Switch to similarity-weighted votes.
    pub fn ranked(mut self, ranker: &'a NaturalOrderRanker<'a>) -> Self {
        self.ranker = Some(ranker);
        self.mode = PruningMode::Ranked;
        self
    }

    pub fn mode(&self) -> PruningMode {
        self.mode
    }

    /// Tally every candidate produced from `examples`, without pruning.
    pub fn tally(&self, filter: &CandidateFilter<'_>, examples: &[Example]) -> Result<Tallies> {
        let mut tallies = Tallies::new();
        for example in examples {
            let original = example.sentence();
            let reference = match (self.mode, self.ranker) {
                (PruningMode::Ranked, Some(ranker)) => Some((ranker, natural_reference(ranker, example)?)),
                (PruningMode::Ranked, None) => {
                    return Err(Error::Config("ranked pruning needs a language model scorer".into()))
                }
                (PruningMode::Count, _) => None,
            };
            tallies
                .entry(example.canonical.to_string())
                .or_default()
                .vote(1.0, original);

            for position in example.spans.canonical_positions() {
                let substitutes = self.predictor.predict(filter, &example.tokens, position, self.k)?;
                for token in substitutes {
                    let candidate = example.canonical_with(position, &token).to_string();
                    let sentence = example.sentence_with(position, &token);
                    let weight = match &reference {
                        Some((ranker, natural)) => ranker.similarity(natural, &sentence)?,
                        None => 1.0,
                    };
                    tallies.entry(candidate).or_default().vote(weight, sentence);
                }
            }
        }
        Ok(tallies)
    }

    /// Tally and prune every category of one argument.
    ///
    /// A category whose inference fails is reported in the second list and
    /// left out of the first; categories with nothing left are omitted.
    pub fn assemble_and_prune(
        &self,
        table: &TableSpec,
        argument: &ArgumentSpec,
        examples_by_category: &BTreeMap<GrammarCategory, Vec<Example>>,
    ) -> (BTreeMap<GrammarCategory, Tallies>, Vec<(GrammarCategory, Error)>) {
        let filter = CandidateFilter {
            table_canonical: &table.canonical,
            known_values: &argument.values,
            stop_words: false,
        };
        let mut pruned = BTreeMap::new();
        let mut failed = Vec::new();
        for (&category, examples) in examples_by_category {
            if examples.is_empty() {
                debug!("{category}: no examples, skipped");
                continue;
            }
            match self.tally(&filter, examples) {
                Ok(tallies) => {
                    let kept = prune(tallies, self.threshold);
                    if kept.is_empty() {
                        debug!("{category}: nothing survived pruning");
                    } else {
                        pruned.insert(category, kept);
                    }
                }
                Err(err) => {
                    warn!("{category}: giving up on this category: {err}");
                    failed.push((category, err));
                }
            }
        }
        (pruned, failed)
    }
}
