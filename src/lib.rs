//! Candidate canonical phrases for schema tables and properties, generated
//! with a masked language model and pruned by support.
pub mod assembler;
pub mod canonical;
pub mod category;
pub mod config;
pub mod error;
pub mod example;
pub mod generator;
pub mod logging;
pub mod models;
pub mod predictor;
pub mod ranker;
pub mod retry;
pub mod schema;
pub mod template;

pub use assembler::{CandidateAssembler, CandidateTally, PruningMode};
pub use canonical::{split_canonical, CanonicalForm};
pub use category::GrammarCategory;
pub use config::GeneratorConfig;
pub use error::{Error, Result};
pub use example::{construct_examples, natural_ordering, Example};
pub use generator::{CandidateReport, CanonicalGenerator, Command};
pub use predictor::{MaskedCandidatePredictor, MaskedLanguageModel};
pub use ranker::{LanguageModelScorer, NaturalOrderRanker};
pub use schema::Schema;
pub use template::render;
