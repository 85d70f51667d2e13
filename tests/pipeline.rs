use std::fs;
use std::path::Path;

use serde_json::json;

use b_canonical::predictor::{MaskedPrediction, MaskedQuery};
use b_canonical::{
    CanonicalGenerator, Command, Error, GeneratorConfig, LanguageModelScorer, MaskedLanguageModel,
    PruningMode, Result, Schema,
};

/// Suggests fixed replacements keyed on the word being replaced.
struct Thesaurus;

impl MaskedLanguageModel for Thesaurus {
    fn top_tokens(&self, query: &MaskedQuery<'_>, top_n: usize) -> Result<Vec<MaskedPrediction>> {
        let list: &[&str] = match query.original[query.position].as_str() {
            "serves" => &["offers", "has", "the", "italian"],
            "food" => &["dishes", "cuisine"],
            "has" => &["offers"],
            "delivery" => &["takeout", "pickup", "delivery"],
            "restaurant" => &["place", "which", "restaurants", "diner", "3"],
            "[MASK]" => &["italian", "cheap", "good"],
            _ => &[],
        };
        Ok(list
            .iter()
            .take(top_n)
            .map(|t| MaskedPrediction {
                token: t.to_string(),
                score: 0.1,
            })
            .collect())
    }
}

struct Unreachable;

impl MaskedLanguageModel for Unreachable {
    fn top_tokens(&self, _: &MaskedQuery<'_>, _: usize) -> Result<Vec<MaskedPrediction>> {
        Err(Error::Model("503 Service Unavailable".into()))
    }
}

/// Prefers the value in front of "cuisine".
struct Fluency;

impl LanguageModelScorer for Fluency {
    fn perplexity(&self, sentence: &str) -> Result<f64> {
        Ok(if sentence.contains("italian cuisine") { 5.0 } else { 9.0 })
    }
}

fn write_schema(dir: &Path) -> Schema {
    fs::write(dir.join("cuisine.tsv"), "r1\titalian\nr2\tthai\n").unwrap();
    let schema = r#"{
        "restaurant": {
            "canonical": ["restaurant", "diner"],
            "args": {
                "servesCuisine": {
                    "canonicals": { "default": "verb", "verb": ["serves # food"] },
                    "values": { "path": ["string", "cuisine.tsv"] }
                },
                "hasDelivery": {
                    "canonicals": { "property_true": "has delivery" }
                },
                "id": {}
            }
        }
    }"#;
    let path = dir.join("schema.json");
    fs::write(&path, schema).unwrap();
    Schema::load(&path).unwrap()
}

fn quiet_config() -> GeneratorConfig {
    GeneratorConfig {
        max_attempts: 1,
        retry_delay_ms: 0,
        ..GeneratorConfig::default()
    }
}

#[test]
fn full_run_produces_all_sections() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let generator = CanonicalGenerator::new(quiet_config(), &Thesaurus, None).unwrap();
    let report = generator.run(&schema, Command::All);
    assert!(report.failed.is_empty());

    let out = serde_json::to_value(&report).unwrap();
    assert_eq!(
        out["restaurant"]["servesCuisine"]["verb"],
        json!({
            "serves # food": 4,
            "offers # food": 4,
            "has # food": 4,
            "serves # dishes": 4,
            "serves # cuisine": 4
        })
    );
    assert_eq!(
        out["restaurant"]["hasDelivery"]["property_true"],
        json!({ "has delivery": 1, "offers delivery": 1, "has takeout": 1, "has pickup": 1 })
    );
    assert!(out["restaurant"].get("id").is_none());
    assert_eq!(out["adjectives"], json!(["restaurant.servesCuisine"]));
    assert_eq!(out["domains"], json!({ "restaurant": { "diner": 5, "place": 5 } }));
}

#[test]
fn single_commands_only_emit_their_section() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let generator = CanonicalGenerator::new(quiet_config(), &Thesaurus, None).unwrap();

    let out = serde_json::to_value(generator.run(&schema, Command::Adjectives)).unwrap();
    assert_eq!(out, json!({ "adjectives": ["restaurant.servesCuisine"] }));

    let out = serde_json::to_value(generator.run(&schema, Command::Synonyms)).unwrap();
    assert!(out.get("adjectives").is_none());
    assert!(out.get("domains").is_none());
    assert!(out.get("restaurant").is_some());
}

#[test]
fn boolean_candidates_are_single_alphabetic_words() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let generator = CanonicalGenerator::new(quiet_config(), &Thesaurus, None).unwrap();
    let report = generator.run(&schema, Command::Synonyms);

    let tallies = &report.tables["restaurant"]["hasDelivery"];
    for candidate in tallies.values().flat_map(|m| m.keys()) {
        let words: Vec<&str> = candidate.split(' ').collect();
        assert_eq!(words.len(), 2, "{candidate}");
        assert!(words.iter().all(|w| w.chars().all(char::is_alphabetic)));
    }
}

#[test]
fn model_failures_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let generator = CanonicalGenerator::new(quiet_config(), &Unreachable, None).unwrap();
    let report = generator.run(&schema, Command::All);

    assert!(report.tables.is_empty());
    assert_eq!(report.adjectives, Some(vec![]));
    // two synonym categories, one adjective probe, one domain table
    assert_eq!(report.failed.len(), 4);
    assert!(report.failed.iter().any(|u| u.stage == "domains"));
}

#[test]
fn ranked_pruning_without_a_ranker_is_rejected() {
    let config = GeneratorConfig {
        pruning_mode: PruningMode::Ranked,
        ..quiet_config()
    };
    assert!(matches!(
        CanonicalGenerator::new(config, &Thesaurus, None),
        Err(Error::Config(_))
    ));
}

#[test]
fn natural_ordering_rewrites_before_generation() {
    let dir = tempfile::tempdir().unwrap();
    let raw = r#"{ "restaurant": { "canonical": "restaurant", "args": {
        "servesCuisine": { "canonicals": { "property": ["cuisine"] }, "values": ["italian"] }
    } } }"#;
    let schema = Schema::from_json_str(raw, dir.path()).unwrap();
    let config = GeneratorConfig {
        natural_ordering: true,
        ..quiet_config()
    };
    let scorer = Fluency;
    let generator = CanonicalGenerator::new(config, &Thesaurus, Some(&scorer)).unwrap();
    let out = serde_json::to_value(generator.run(&schema, Command::Synonyms)).unwrap();
    assert_eq!(out["restaurant"]["servesCuisine"]["property"], json!({ "# cuisine": 2 }));
}

/// Renames the parts of "hotel room".
struct Concierge;

impl MaskedLanguageModel for Concierge {
    fn top_tokens(&self, query: &MaskedQuery<'_>, _: usize) -> Result<Vec<MaskedPrediction>> {
        let list: &[&str] = match query.original[query.position].as_str() {
            "room" => &["suite", "hotel"],
            "hotel" => &["motel"],
            _ => &[],
        };
        Ok(list
            .iter()
            .map(|t| MaskedPrediction {
                token: t.to_string(),
                score: 0.1,
            })
            .collect())
    }
}

#[test]
fn multi_word_table_synonyms_are_whole_names() {
    let dir = tempfile::tempdir().unwrap();
    let raw = r#"{ "hotel": { "canonical": "hotel room", "args": {
        "hasWifi": { "canonicals": { "property_true": "has wifi" } }
    } } }"#;
    let schema = Schema::from_json_str(raw, dir.path()).unwrap();
    let generator = CanonicalGenerator::new(quiet_config(), &Concierge, None).unwrap();
    let out = serde_json::to_value(generator.run(&schema, Command::Domains)).unwrap();
    assert_eq!(
        out,
        json!({ "domains": { "hotel": { "hotel suite": 1, "motel room": 1 } } })
    );
}

#[test]
fn missing_value_file_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(
        &path,
        r#"{ "t": { "canonical": "thing", "args": { "a": { "path": ["string", "gone.tsv"] } } } }"#,
    )
    .unwrap();
    assert!(Schema::load(&path).is_err());
}
