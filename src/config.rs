use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assembler::PruningMode;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Tunables of a generation run. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub mask: bool,
    pub k_synonyms: usize,
    pub k_domain_synonyms: usize,
    pub k_adjectives: usize,
    pub pruning_threshold: f64,
    pub pruning_mode: PruningMode,
    pub natural_ordering: bool,
    pub is_paraphraser: bool,
    pub common_words: Option<PathBuf>,
    pub max_attempts: u8,
    pub retry_delay_ms: u64,
    pub with_sentences: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            mask: true,
            k_synonyms: 5,
            k_domain_synonyms: 5,
            k_adjectives: 500,
            pruning_threshold: 0.5,
            pruning_mode: PruningMode::Count,
            natural_ordering: false,
            is_paraphraser: false,
            common_words: None,
            max_attempts: 3,
            retry_delay_ms: 200,
            with_sentences: false,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn needs_ranker(&self) -> bool {
        self.natural_ordering || self.pruning_mode == PruningMode::Ranked
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay_ms)
    }

    pub fn validate(&self, has_ranker: bool) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pruning_threshold) {
            return Err(Error::Config(format!(
                "pruning_threshold must be within [0, 1], got {}",
                self.pruning_threshold
            )));
        }
        if self.k_synonyms == 0 || self.k_domain_synonyms == 0 || self.k_adjectives == 0 {
            return Err(Error::Config("candidate counts must be positive".into()));
        }
        if self.needs_ranker() && !has_ranker {
            return Err(Error::Config(
                "ranked pruning and natural ordering need a ranker model".into(),
            ));
        }
        Ok(())
    }
}
