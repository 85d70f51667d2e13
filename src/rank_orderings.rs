/*
cargo run --release --bin rank_orderings -- \
    --ranker-model gpt2 \
    --groups-json data/restaurants/orderings.json \
    --out-csv    output/orderings_ppl.csv

groups JSON: [["which restaurant serves italian cuisine ?", "which restaurant serves cuisine italian ?"], ...]
*/

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv::Writer;
use log::{info, warn};

use b_canonical::logging::{init_logging, log_stem, progress_bar};
use b_canonical::models::{device, Gpt2Scorer};
use b_canonical::ranker::order_by_score;
use b_canonical::LanguageModelScorer;

#[derive(Parser, Debug)]
#[command(version, about = "Score alternative phrasings with an autoregressive model and rank them by perplexity.")]
struct Opts {
    // "gpt2" or local dir with config.json + vocab.json + merges.txt + rust_model.ot
    #[arg(long, default_value = "gpt2")]
    ranker_model: String,

    // JSON list of sentence groups
    #[arg(long)]
    groups_json: PathBuf,

    #[arg(long, default_value = "ppl_orderings.csv")]
    out_csv: PathBuf,

    #[arg(long, default_value_t = false)]
    cuda: bool,

    // Limit to first N groups (handy smoke test)
    #[arg(long)]
    n_groups: Option<usize>,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(&opts.log_dir, &log_stem(Some(&opts.out_csv), "rank_orderings"), opts.verbose)?;

    let raw = fs::read_to_string(&opts.groups_json)
        .with_context(|| format!("failed to read {}", opts.groups_json.display()))?;
    let mut groups: Vec<Vec<String>> = serde_json::from_str(&raw)
        .with_context(|| format!("expected a list of sentence lists in {}", opts.groups_json.display()))?;
    if let Some(n) = opts.n_groups {
        groups.truncate(n);
    }
    info!("Loaded {} groups from {}", groups.len(), opts.groups_json.display());

    let scorer = Gpt2Scorer::load(&opts.ranker_model, device(opts.cuda))
        .with_context(|| format!("failed to load {}", opts.ranker_model))?;

    let mut wtr = Writer::from_path(&opts.out_csv)
        .with_context(|| format!("cannot open {}", opts.out_csv.display()))?;
    wtr.write_record(["group", "sentence", "ppl", "rank"])?;

    let bar = progress_bar(groups.len() as u64);
    for (g, group) in groups.iter().enumerate() {
        bar.inc(1);
        let scores = match group
            .iter()
            .map(|s| scorer.perplexity(s))
            .collect::<Result<Vec<f64>, _>>()
        {
            Ok(scores) => scores,
            Err(e) => {
                warn!("group {g}: {e}");
                continue;
            }
        };
        let order = order_by_score(&scores);
        let mut rank = vec![0; group.len()];
        for (r, &i) in order.iter().enumerate() {
            rank[i] = r + 1;
        }
        for (i, sentence) in group.iter().enumerate() {
            wtr.write_record([
                g.to_string(),
                sentence.clone(),
                format!("{:.4}", scores[i]),
                rank[i].to_string(),
            ])?;
        }
    }
    bar.finish();
    wtr.flush()?;
    println!("Done -> {}", opts.out_csv.display());
    Ok(())
}
