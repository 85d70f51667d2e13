//! The whole run: property synonyms, adjective probing and table-name synonyms.
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::assembler::{prune_domains, CandidateAssembler, PruningMode, Tallies};
use crate::category::GrammarCategory;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::example::{construct_examples, natural_ordering};
use crate::logging::progress_bar;
use crate::predictor::{
    load_word_list, CandidateFilter, MaskedCandidatePredictor, MaskedLanguageModel, MASK_TOKEN,
};
use crate::ranker::{LanguageModelScorer, NaturalOrderRanker};
use crate::schema::{ArgumentSpec, Schema, TableSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Command {
    Synonyms,
    Adjectives,
    Domains,
    All,
}

impl Command {
    fn includes(self, other: Command) -> bool {
        self == Command::All || self == other
    }
}

/// A unit of work given up after its model calls kept failing.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedUnit {
    pub stage: &'static str,
    pub table: String,
    pub argument: Option<String>,
    pub category: Option<GrammarCategory>,
    pub error: String,
}

impl fmt::Display for FailedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.stage, self.table)?;
        if let Some(argument) = &self.argument {
            write!(f, ".{argument}")?;
        }
        if let Some(category) = self.category {
            write!(f, " ({category})")?;
        }
        write!(f, ": {}", self.error)
    }
}

pub type ArgumentCandidates = BTreeMap<GrammarCategory, BTreeMap<String, Value>>;

/// `{table: {argument: {category: {candidate: tally}}}, adjectives: [...], domains: {...}}`
#[derive(Debug, Default, Serialize)]
pub struct CandidateReport {
    #[serde(flatten)]
    pub tables: BTreeMap<String, BTreeMap<String, ArgumentCandidates>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjectives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<BTreeMap<String, BTreeMap<String, u64>>>,
    #[serde(skip)]
    pub failed: Vec<FailedUnit>,
}

pub struct CanonicalGenerator<'a> {
    config: GeneratorConfig,
    predictor: MaskedCandidatePredictor<'a>,
    ranker: Option<NaturalOrderRanker<'a>>,
}

impl<'a> CanonicalGenerator<'a> {
    pub fn new(
        config: GeneratorConfig,
        model: &'a dyn MaskedLanguageModel,
        scorer: Option<&'a dyn LanguageModelScorer>,
    ) -> Result<Self> {
        config.validate(scorer.is_some())?;
        let retry = config.retry_policy();
        let mut predictor = MaskedCandidatePredictor::new(model)
            .with_masking(config.mask)
            .with_retry(retry);
        if let Some(path) = &config.common_words {
            let words = load_word_list(path)?;
            info!("restricting predictions to {} common words", words.len());
            predictor = predictor.with_common_words(words);
        }
        let ranker = scorer.map(|s| NaturalOrderRanker::new(s).with_retry(retry));
        Ok(CanonicalGenerator {
            config,
            predictor,
            ranker,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn run(&self, schema: &Schema, command: Command) -> CandidateReport {
        let mut report = CandidateReport::default();
        if command.includes(Command::Synonyms) {
            report.tables = self.synonyms(schema, &mut report.failed);
        }
        if command.includes(Command::Adjectives) {
            report.adjectives = Some(self.adjectives(schema, &mut report.failed));
        }
        if command.includes(Command::Domains) {
            report.domains = Some(self.domains(schema, &mut report.failed));
        }
        if !report.failed.is_empty() {
            warn!("{} unit(s) failed:", report.failed.len());
            for unit in &report.failed {
                warn!("  {unit}");
            }
        }
        report
    }

    /// Apply the ordering pre-pass when enabled. On failure the argument is
    /// used as annotated.
    fn ordered<'s>(
        &self,
        table_name: &str,
        arg_name: &str,
        table: &TableSpec,
        argument: &'s ArgumentSpec,
        failed: &mut Vec<FailedUnit>,
    ) -> Cow<'s, ArgumentSpec> {
        let ranker = match (&self.ranker, self.config.natural_ordering) {
            (Some(ranker), true) => ranker,
            _ => return Cow::Borrowed(argument),
        };
        match natural_ordering(table, argument, ranker) {
            Ok(updated) => Cow::Owned(updated),
            Err(err) => {
                warn!("{table_name}.{arg_name}: ordering pre-pass failed: {err}");
                failed.push(FailedUnit {
                    stage: "ordering",
                    table: table_name.to_owned(),
                    argument: Some(arg_name.to_owned()),
                    category: None,
                    error: err.to_string(),
                });
                Cow::Borrowed(argument)
            }
        }
    }

    pub fn synonyms(
        &self,
        schema: &Schema,
        failed: &mut Vec<FailedUnit>,
    ) -> BTreeMap<String, BTreeMap<String, ArgumentCandidates>> {
        let mut assembler = CandidateAssembler::new(
            &self.predictor,
            self.config.k_synonyms,
            self.config.pruning_threshold,
        );
        if self.config.pruning_mode == PruningMode::Ranked {
            if let Some(ranker) = &self.ranker {
                assembler = assembler.ranked(ranker);
            }
        }

        let total: usize = schema.tables.values().map(|t| t.arguments.len()).sum();
        let bar = progress_bar(total as u64);
        let mut out = BTreeMap::new();
        for (table_name, table) in &schema.tables {
            let mut per_argument = BTreeMap::new();
            for (arg_name, argument) in &table.arguments {
                bar.inc(1);
                if argument.canonicals.is_empty() {
                    debug!("{table_name}.{arg_name}: no canonical annotation");
                    continue;
                }
                debug!(
                    "{table_name}.{arg_name}: {} values ({:?})",
                    argument.values.len(),
                    argument.value_source
                );
                let argument = self.ordered(table_name, arg_name, table, argument, failed);
                let examples = construct_examples(table, &argument);
                let (pruned, errors) = assembler.assemble_and_prune(table, &argument, &examples);
                for (category, err) in errors {
                    failed.push(FailedUnit {
                        stage: "synonyms",
                        table: table_name.clone(),
                        argument: Some(arg_name.clone()),
                        category: Some(category),
                        error: err.to_string(),
                    });
                }
                if let Some(ranker) = &self.ranker {
                    ranker.clear_cache();
                }
                if !pruned.is_empty() {
                    info!("{table_name}.{arg_name}: {} categories with candidates", pruned.len());
                    per_argument.insert(arg_name.clone(), self.to_report(pruned));
                }
            }
            if !per_argument.is_empty() {
                out.insert(table_name.clone(), per_argument);
            }
        }
        bar.finish();
        out
    }

    fn to_report(&self, pruned: BTreeMap<GrammarCategory, Tallies>) -> ArgumentCandidates {
        let mode = self.config.pruning_mode;
        let with_sentences = self.config.with_sentences;
        pruned
            .into_iter()
            .map(|(category, tallies)| {
                let candidates = tallies
                    .iter()
                    .map(|(c, t)| (c.clone(), t.to_json(mode, with_sentences)))
                    .collect();
                (category, candidates)
            })
            .collect()
    }

    /// `"table.arg"` for every argument with a value the model would put
    /// directly in front of the table name.
    pub fn adjectives(&self, schema: &Schema, failed: &mut Vec<FailedUnit>) -> Vec<String> {
        let mut out = Vec::new();
        for (table_name, table) in &schema.tables {
            let mut words: Vec<String> = ["show", "me", "a", MASK_TOKEN]
                .iter()
                .map(|w| w.to_string())
                .collect();
            words.extend(table.canonical.split_whitespace().map(str::to_owned));
            words.push(".".to_owned());

            let filter = CandidateFilter {
                table_canonical: &table.canonical,
                known_values: &[],
                stop_words: false,
            };
            let predicted = match self.predictor.predict(&filter, &words, 3, self.config.k_adjectives) {
                Ok(predicted) => predicted,
                Err(err) => {
                    warn!("{table_name}: adjective probe failed: {err}");
                    failed.push(FailedUnit {
                        stage: "adjectives",
                        table: table_name.clone(),
                        argument: None,
                        category: None,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            let predicted: HashSet<&str> = predicted.iter().map(String::as_str).collect();
            for (arg_name, argument) in &table.arguments {
                if argument.values.iter().any(|v| predicted.contains(v.as_str())) {
                    out.push(format!("{table_name}.{arg_name}"));
                }
            }
        }
        out
    }

    /// Alternative names for each table, predicted at the table-name positions
    /// of every example sentence of the table. A multi-word name is rebuilt
    /// around the replaced word (`hotel room` -> `hotel suite`).
    pub fn domains(
        &self,
        schema: &Schema,
        failed: &mut Vec<FailedUnit>,
    ) -> BTreeMap<String, BTreeMap<String, u64>> {
        let k = self.config.k_domain_synonyms;
        let mut out = BTreeMap::new();
        for (table_name, table) in &schema.tables {
            match self.table_synonyms(table) {
                Ok(counts) => {
                    let kept = prune_domains(counts, k, self.config.pruning_threshold);
                    if !kept.is_empty() {
                        out.insert(table_name.clone(), kept);
                    }
                }
                Err(err) => {
                    warn!("{table_name}: domain synonyms failed: {err}");
                    failed.push(FailedUnit {
                        stage: "domains",
                        table: table_name.clone(),
                        argument: None,
                        category: None,
                        error: err.to_string(),
                    });
                }
            }
        }
        out
    }

    fn table_synonyms(&self, table: &TableSpec) -> Result<BTreeMap<String, u64>> {
        let filter = CandidateFilter {
            table_canonical: &table.canonical,
            known_values: &[],
            stop_words: true,
        };
        let own_words: Vec<&str> = table.canonical.split_whitespace().collect();
        let mut counts = BTreeMap::new();
        for argument in table.arguments.values() {
            for example in construct_examples(table, argument).values().flatten() {
                for &position in &example.spans.table {
                    let predicted = self.predictor.predict(
                        &filter,
                        &example.tokens,
                        position,
                        self.config.k_domain_synonyms,
                    )?;
                    for token in predicted {
                        // a word of the name itself is not a synonym
                        if own_words.contains(&token.as_str()) {
                            continue;
                        }
                        let candidate = example.table_with(position, &token);
                        if candidate != table.canonical {
                            *counts.entry(candidate).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
        Ok(counts)
    }
}
