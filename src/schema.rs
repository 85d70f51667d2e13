//! Schema input: tables, their arguments, canonical annotations and example values.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::canonical::CanonicalForm;
use crate::category::GrammarCategory;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub tables: BTreeMap<String, TableSpec>,
}

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub canonical: String,
    pub arguments: BTreeMap<String, ArgumentSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct ArgumentSpec {
    /// Empty when the argument carries no canonical annotation at all.
    pub canonicals: BTreeMap<GrammarCategory, Vec<CanonicalForm>>,
    pub values: Vec<String>,
    pub value_source: ValueSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValueSource {
    #[default]
    Inline,
    File {
        kind: ValueFileKind,
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFileKind {
    /// Tab separated, value in the second column.
    StringTsv,
    /// JSON object with a `data` list of `{ "canonical": ... }` records.
    EntityJson,
}

impl ArgumentSpec {
    /// A copy of this argument with the canonicals of one category replaced.
    pub fn with_canonicals(&self, category: GrammarCategory, canonicals: Vec<CanonicalForm>) -> Self {
        let mut updated = self.clone();
        updated.canonicals.insert(category, canonicals);
        updated
    }
}

// raw JSON shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawTable {
    canonical: OneOrMany,
    #[serde(default)]
    args: BTreeMap<String, RawArgument>,
}

#[derive(Debug, Deserialize)]
struct RawArgument {
    #[serde(default)]
    canonicals: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    values: Option<RawValues>,
    #[serde(default)]
    path: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValues {
    Inline(Vec<String>),
    File { path: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct EntityFile {
    data: Vec<EntityRecord>,
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    canonical: String,
}

/// Top-level output keys that sit next to the table names.
pub const RESERVED_TABLE_NAMES: &[&str] = &["adjectives", "domains"];

impl Schema {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&raw, base_dir)
    }

    /// Parse a schema; relative value-file paths resolve against `base_dir`.
    pub fn from_json_str(raw: &str, base_dir: &Path) -> Result<Self> {
        let raw_tables: BTreeMap<String, RawTable> = serde_json::from_str(raw)?;
        let mut tables = BTreeMap::new();
        for (table_name, raw_table) in raw_tables {
            if RESERVED_TABLE_NAMES.contains(&table_name.as_str()) {
                return Err(Error::ReservedTableName(table_name));
            }
            let canonical = match raw_table.canonical {
                OneOrMany::One(c) => c,
                OneOrMany::Many(list) => list.into_iter().next().unwrap_or_else(|| table_name.clone()),
            };
            let mut arguments = BTreeMap::new();
            for (arg_name, raw_arg) in raw_table.args {
                let spec = build_argument(&table_name, &arg_name, raw_arg, base_dir)?;
                arguments.insert(arg_name, spec);
            }
            tables.insert(table_name, TableSpec { canonical, arguments });
        }
        Ok(Schema { tables })
    }
}

fn build_argument(table: &str, argument: &str, raw: RawArgument, base_dir: &Path) -> Result<ArgumentSpec> {
    let canonicals = raw
        .canonicals
        .map(|map| parse_canonicals(table, argument, map))
        .unwrap_or_default();

    let file_ref = match (raw.values, raw.path) {
        (Some(RawValues::Inline(values)), _) => {
            return Ok(ArgumentSpec {
                canonicals,
                values,
                value_source: ValueSource::Inline,
            })
        }
        (Some(RawValues::File { path }), _) | (None, Some(path)) => path,
        (None, None) => {
            return Ok(ArgumentSpec {
                canonicals,
                values: Vec::new(),
                value_source: ValueSource::Inline,
            })
        }
    };

    let (kind, path) = match file_ref.as_slice() {
        [kind, path] => {
            let kind = if kind == "string" {
                ValueFileKind::StringTsv
            } else {
                ValueFileKind::EntityJson
            };
            (kind, base_dir.join(path))
        }
        other => {
            return Err(Error::MalformedValuePath {
                table: table.to_owned(),
                argument: argument.to_owned(),
                reason: format!("expected [type, path], got {} element(s)", other.len()),
            })
        }
    };
    let values = load_values(kind, &path)?;
    debug!("{table}.{argument}: loaded {} values from {}", values.len(), path.display());
    Ok(ArgumentSpec {
        canonicals,
        values,
        value_source: ValueSource::File { kind, path },
    })
}

fn parse_canonicals(
    table: &str,
    argument: &str,
    raw: BTreeMap<String, Value>,
) -> BTreeMap<GrammarCategory, Vec<CanonicalForm>> {
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        let Ok(category) = key.parse::<GrammarCategory>() else {
            debug!("{table}.{argument}: ignoring annotation key {key:?}");
            continue;
        };
        let phrases: Vec<String> = match value {
            Value::String(s) => vec![s],
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            other => {
                warn!("{table}.{argument}: {key} is neither a string nor a list: {other}");
                continue;
            }
        };
        let mut forms = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            match CanonicalForm::parse(&phrase) {
                Ok(form) => forms.push(form),
                Err(e) => warn!("{table}.{argument}: skipping {key} canonical: {e}"),
            }
        }
        out.insert(category, forms);
    }
    out
}

/// Load example values from a TSV or entity JSON file. Missing files are fatal.
pub fn load_values(kind: ValueFileKind, path: &Path) -> Result<Vec<String>> {
    match kind {
        ValueFileKind::StringTsv => {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(false)
                .flexible(true)
                .quoting(false)
                .from_path(path)
                .map_err(|source| Error::Csv {
                    path: path.to_owned(),
                    source,
                })?;
            let mut values = Vec::new();
            for row in reader.records() {
                let row = row.map_err(|source| Error::Csv {
                    path: path.to_owned(),
                    source,
                })?;
                if let Some(value) = row.get(1) {
                    values.push(value.to_owned());
                }
            }
            Ok(values)
        }
        ValueFileKind::EntityJson => {
            let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
            let file: EntityFile = serde_json::from_str(&raw)?;
            Ok(file.data.into_iter().map(|r| r.canonical).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn output_section_names_cannot_be_tables() {
        let raw = r#"{ "domains": { "canonical": "domain", "args": {} } }"#;
        assert!(matches!(
            Schema::from_json_str(raw, Path::new(".")),
            Err(Error::ReservedTableName(name)) if name == "domains"
        ));
    }

    #[test]
    fn inline_values_and_tolerant_canonicals() {
        let raw = r#"{
            "restaurant": {
                "canonical": "restaurant",
                "args": {
                    "servesCuisine": {
                        "canonicals": {
                            "default": "verb",
                            "base": "cuisine",
                            "verb": ["serves # cuisine", "serves"],
                            "base_projection": ["cuisine"]
                        },
                        "values": ["italian", "chinese"]
                    },
                    "id": {}
                }
            }
        }"#;
        let schema = Schema::from_json_str(raw, Path::new(".")).unwrap();
        let table = &schema.tables["restaurant"];
        assert_eq!(table.canonical, "restaurant");

        let arg = &table.arguments["servesCuisine"];
        assert_eq!(arg.canonicals.len(), 2);
        assert_eq!(arg.canonicals[&GrammarCategory::Base].len(), 1);
        assert_eq!(arg.canonicals[&GrammarCategory::Verb][0].suffix(), "cuisine");
        assert_eq!(arg.values, vec!["italian", "chinese"]);

        assert!(table.arguments["id"].canonicals.is_empty());
    }

    #[test]
    fn tsv_values_second_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuisine.tsv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "italian\titalian food\t1.0").unwrap();
        writeln!(f, "lonely").unwrap();
        writeln!(f, "thai\tthai\t1.0").unwrap();

        let raw = r#"{ "restaurant": { "canonical": "restaurant", "args": {
            "servesCuisine": { "canonicals": { "base": ["cuisine"] }, "path": ["string", "cuisine.tsv"] }
        } } }"#;
        let schema = Schema::from_json_str(raw, dir.path()).unwrap();
        let arg = &schema.tables["restaurant"].arguments["servesCuisine"];
        assert_eq!(arg.values, vec!["italian food", "thai"]);
        assert_eq!(
            arg.value_source,
            ValueSource::File {
                kind: ValueFileKind::StringTsv,
                path
            }
        );
    }

    #[test]
    fn entity_json_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("people.json"),
            r#"{ "data": [ { "canonical": "alice" }, { "canonical": "bob" } ] }"#,
        )
        .unwrap();
        let raw = r#"{ "review": { "canonical": "review", "args": {
            "author": { "canonicals": { "base": ["author"] }, "values": { "path": ["entity", "people.json"] } }
        } } }"#;
        let schema = Schema::from_json_str(raw, dir.path()).unwrap();
        assert_eq!(schema.tables["review"].arguments["author"].values, vec!["alice", "bob"]);
    }

    #[test]
    fn missing_value_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let raw = r#"{ "t": { "canonical": "thing", "args": {
            "a": { "path": ["string", "nope.tsv"] }
        } } }"#;
        assert!(Schema::from_json_str(raw, dir.path()).is_err());
    }

    #[test]
    fn malformed_value_path_is_fatal() {
        let raw = r#"{ "t": { "canonical": "thing", "args": { "a": { "path": ["nope.tsv"] } } } }"#;
        assert!(matches!(
            Schema::from_json_str(raw, Path::new(".")),
            Err(Error::MalformedValuePath { .. })
        ));
    }

    #[test]
    fn with_canonicals_leaves_original_untouched() {
        let arg = ArgumentSpec::default();
        let updated = arg.with_canonicals(
            GrammarCategory::Property,
            vec![CanonicalForm::parse("# cuisine").unwrap()],
        );
        assert!(arg.canonicals.is_empty());
        assert_eq!(updated.canonicals[&GrammarCategory::Property].len(), 1);
    }
}
