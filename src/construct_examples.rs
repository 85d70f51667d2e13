/*
cargo run --release --bin construct_examples -- \
    data/restaurants/schema.json \
    data/restaurants/examples.json
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use b_canonical::example::ExampleRecord;
use b_canonical::logging::{init_logging, log_stem};
use b_canonical::{construct_examples, GrammarCategory, Schema};

#[derive(Parser, Debug)]
#[command(version, about = "Write the template sentences of every annotated argument, without running a model.")]
struct Cli {
    input: PathBuf,

    // Examples JSON (stdout when omitted)
    output: Option<PathBuf>,

    // Only this table
    #[arg(long)]
    table: Option<String>,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_dir, &log_stem(cli.output.as_deref(), "construct_examples"), cli.verbose)?;

    let schema = Schema::load(&cli.input)
        .with_context(|| format!("failed to load schema {}", cli.input.display()))?;

    // table -> argument -> category -> examples
    let mut all: BTreeMap<&str, BTreeMap<&str, BTreeMap<GrammarCategory, Vec<ExampleRecord>>>> = BTreeMap::new();
    let mut built = Vec::new();
    for (table_name, table) in &schema.tables {
        if cli.table.as_deref().is_some_and(|t| t != table_name) {
            continue;
        }
        for (arg_name, argument) in &table.arguments {
            built.push((table_name.as_str(), arg_name.as_str(), construct_examples(table, argument)));
        }
    }

    let mut count = 0usize;
    for (table_name, arg_name, examples) in &built {
        if examples.is_empty() {
            continue;
        }
        let per_category: BTreeMap<GrammarCategory, Vec<ExampleRecord>> = examples
            .iter()
            .map(|(category, list)| {
                count += list.len();
                (*category, list.iter().map(ExampleRecord::from).collect())
            })
            .collect();
        all.entry(*table_name).or_default().insert(*arg_name, per_category);
    }
    info!("Built {count} examples");

    let json = serde_json::to_string_pretty(&all)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Done -> {} ({count} examples)", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
