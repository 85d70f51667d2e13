/*
cargo run --release --bin generate_canonicals -- \
    --command all \
    --k-synonyms 5 \
    --pruning-threshold 0.5 \
    data/restaurants/schema.json \
    data/restaurants/candidates.json

remote masked model instead of local weights:
cargo run --release --bin generate_canonicals -- \
    --endpoint https://api-inference.huggingface.co/models/bert-large-uncased \
    data/restaurants/schema.json
*/

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use b_canonical::logging::{init_logging, log_stem};
use b_canonical::models::remote::API_KEY_ENV;
use b_canonical::models::RemoteMaskedLm;
use b_canonical::{
    CanonicalGenerator, Command, GeneratorConfig, LanguageModelScorer, MaskedLanguageModel,
    PruningMode, Schema,
};

#[derive(Parser, Debug)]
#[command(version, about = "Generate and prune candidate canonical phrases for a schema with a masked language model.")]
struct Cli {
    // Schema JSON: { table: { canonical, args: { arg: { canonicals, values } } } }
    input: PathBuf,

    // Candidates JSON (stdout when omitted)
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Command::All)]
    command: Command,

    // JSON file with generator settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    // Pretrained name or local dir with config.json, vocab.txt, rust_model.ot
    #[arg(long, default_value = "bert-base-uncased")]
    model_name_or_path: String,

    // Fill-mask HTTP endpoint used instead of local weights
    #[arg(long)]
    endpoint: Option<String>,

    // Bearer token for --endpoint (falls back to $HF_API_TOKEN)
    #[arg(long)]
    api_key: Option<String>,

    // Autoregressive model for natural ordering / ranked pruning
    #[arg(long, default_value = "gpt2")]
    ranker_model: String,

    #[arg(long, default_value_t = false)]
    cuda: bool,

    // Predict conditioned on the original word instead of a mask
    #[arg(long, default_value_t = false)]
    no_mask: bool,

    #[arg(long)]
    k_synonyms: Option<usize>,

    #[arg(long)]
    k_domain_synonyms: Option<usize>,

    #[arg(long)]
    k_adjectives: Option<usize>,

    #[arg(long)]
    pruning_threshold: Option<f64>,

    #[arg(long, value_enum)]
    pruning_mode: Option<PruningMode>,

    #[arg(long, default_value_t = false)]
    natural_ordering: bool,

    // Model was fine-tuned on "[CLS] q <paraphrase> q' </paraphrase> [SEP]" inputs
    #[arg(long, default_value_t = false)]
    is_paraphraser: bool,

    // One word per line; only these words get synonyms
    #[arg(long)]
    common_words: Option<PathBuf>,

    #[arg(long)]
    max_attempts: Option<u8>,

    #[arg(long)]
    retry_delay_ms: Option<u64>,

    // Emit { score, sentences } instead of bare tallies
    #[arg(long, default_value_t = false)]
    with_sentences: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => GeneratorConfig::default(),
        };
        if self.no_mask {
            config.mask = false;
        }
        if let Some(k) = self.k_synonyms {
            config.k_synonyms = k;
        }
        if let Some(k) = self.k_domain_synonyms {
            config.k_domain_synonyms = k;
        }
        if let Some(k) = self.k_adjectives {
            config.k_adjectives = k;
        }
        if let Some(t) = self.pruning_threshold {
            config.pruning_threshold = t;
        }
        if let Some(mode) = self.pruning_mode {
            config.pruning_mode = mode;
        }
        if self.natural_ordering {
            config.natural_ordering = true;
        }
        if self.is_paraphraser {
            config.is_paraphraser = true;
        }
        if let Some(path) = &self.common_words {
            config.common_words = Some(path.clone());
        }
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay_ms = ms;
        }
        if self.with_sentences {
            config.with_sentences = true;
        }
        Ok(config)
    }
}

fn masked_model(cli: &Cli, config: &GeneratorConfig) -> Result<Box<dyn MaskedLanguageModel>> {
    if let Some(endpoint) = &cli.endpoint {
        if !config.mask || config.is_paraphraser {
            bail!("--endpoint only supports plain masked prediction");
        }
        let key = cli.api_key.clone().or_else(|| env::var(API_KEY_ENV).ok());
        info!("using fill-mask endpoint {endpoint}");
        return Ok(Box::new(RemoteMaskedLm::new(endpoint.as_str(), key)?));
    }
    local_masked_model(cli, config)
}

#[cfg(feature = "transformers")]
fn local_masked_model(cli: &Cli, config: &GeneratorConfig) -> Result<Box<dyn MaskedLanguageModel>> {
    use b_canonical::models::{device, BertMaskedLm};

    let model = BertMaskedLm::load(&cli.model_name_or_path, device(cli.cuda), config.is_paraphraser)
        .with_context(|| format!("failed to load masked model {}", cli.model_name_or_path))?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "transformers"))]
fn local_masked_model(_: &Cli, _: &GeneratorConfig) -> Result<Box<dyn MaskedLanguageModel>> {
    bail!("built without the `transformers` feature: pass --endpoint")
}

#[cfg(feature = "transformers")]
fn ranker_model(cli: &Cli) -> Result<Box<dyn LanguageModelScorer>> {
    use b_canonical::models::{device, Gpt2Scorer};

    let model = Gpt2Scorer::load(&cli.ranker_model, device(cli.cuda))
        .with_context(|| format!("failed to load ranker model {}", cli.ranker_model))?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "transformers"))]
fn ranker_model(_: &Cli) -> Result<Box<dyn LanguageModelScorer>> {
    bail!("natural ordering and ranked pruning need the `transformers` feature")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let stem = log_stem(cli.output.as_deref(), "generate_canonicals");
    let log_path = init_logging(&cli.log_dir, &stem, cli.verbose)?;

    let config = cli.generator_config()?;
    info!("config: {config:?}");

    let schema = Schema::load(&cli.input)
        .with_context(|| format!("failed to load schema {}", cli.input.display()))?;
    let n_args: usize = schema.tables.values().map(|t| t.arguments.len()).sum();
    info!("Loaded {} tables / {} arguments from {}", schema.tables.len(), n_args, cli.input.display());

    let masked = masked_model(&cli, &config)?;
    let scorer = if config.needs_ranker() {
        Some(ranker_model(&cli)?)
    } else {
        None
    };
    let generator = CanonicalGenerator::new(config, masked.as_ref(), scorer.as_deref())?;
    let report = generator.run(&schema, cli.command);

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Done -> {}", path.display());
        }
        None => println!("{json}"),
    }

    if !report.failed.is_empty() {
        eprintln!(
            "{} unit(s) failed, see {}",
            report.failed.len(),
            log_path.display()
        );
    }
    Ok(())
}
