//! Input loading: record file → flattened, per-owner [`Query`] list.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use ownertrace_shared::{EnrichConfig, FlatRecord, InputShape, OwnerTraceError, Query, Result};

/// Separator joining parent and child keys when flattening.
pub const FLATTEN_SEPARATOR: &str = "_";

/// Record key holding the owner name list.
const OWNERS_KEY: &str = "owners";

/// How to read address fields off a record.
#[derive(Debug, Clone)]
pub struct InputOptions {
    pub shape: InputShape,
    /// Key of the nested address mapping for [`InputShape::Nested`].
    pub address_key: String,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            shape: InputShape::Flat,
            address_key: "address".into(),
        }
    }
}

impl From<&EnrichConfig> for InputOptions {
    fn from(config: &EnrichConfig) -> Self {
        Self {
            shape: config.input_shape,
            address_key: config.address_key.clone(),
        }
    }
}

/// Read `path` and produce one [`Query`] per owner per record.
///
/// `.jsonl` / `.ndjson` files are read as one record per line; anything
/// else must be a JSON array of records.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_queries(path: &Path, opts: &InputOptions) -> Result<Vec<Query>> {
    let content = std::fs::read_to_string(path).map_err(|e| OwnerTraceError::io(path, e))?;

    let lines = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl" | "ndjson")
    );
    let records = if lines {
        parse_json_lines(&content)?
    } else {
        parse_json_array(&content)?
    };

    let queries = build_queries(&records, opts)?;
    info!(records = records.len(), queries = queries.len(), "input loaded");
    Ok(queries)
}

/// Parse a JSON array of record objects.
pub fn parse_json_array(content: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| OwnerTraceError::input_format(format!("invalid JSON: {e}")))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| into_record(item, i + 1))
            .collect(),
        other => Err(OwnerTraceError::input_format(format!(
            "expected an array of records, found {}",
            type_name(&other)
        ))),
    }
}

/// Parse newline-delimited JSON records; blank lines are ignored.
pub fn parse_json_lines(content: &str) -> Result<Vec<Map<String, Value>>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line).map_err(|e| {
                OwnerTraceError::input_format(format!("line {}: invalid JSON: {e}", i + 1))
            })?;
            into_record(value, i + 1)
        })
        .collect()
}

fn into_record(value: Value, position: usize) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(OwnerTraceError::input_format(format!(
            "record {position}: expected an object, found {}",
            type_name(&other)
        ))),
    }
}

/// Expand records into queries, one per owner name.
///
/// Records without owners contribute nothing.
pub fn build_queries(records: &[Map<String, Value>], opts: &InputOptions) -> Result<Vec<Query>> {
    let mut queries = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let owners = owner_names(record, i + 1)?;
        if owners.is_empty() {
            debug!(record = i + 1, "record has no owners, skipping");
            continue;
        }

        let mut rest = record.clone();
        rest.remove(OWNERS_KEY);
        let source = flatten(&rest);

        let address = match opts.shape {
            InputShape::Flat => Some(record),
            InputShape::Nested => record.get(&opts.address_key).and_then(Value::as_object),
        };
        let field = |key: &str| {
            address
                .and_then(|a| a.get(key))
                .map(scalar_text)
                .unwrap_or_default()
        };

        let (city, state, zipcode) = (field("city"), field("state"), field("zipcode"));

        for name in owners {
            queries.push(Query {
                name,
                city: city.clone(),
                state: state.clone(),
                zipcode: zipcode.clone(),
                source: source.clone(),
            });
        }
    }

    Ok(queries)
}

fn owner_names(record: &Map<String, Value>, position: usize) -> Result<Vec<String>> {
    let owners = match record.get(OWNERS_KEY) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(OwnerTraceError::input_format(format!(
                "record {position}: `owners` must be a list, found {}",
                type_name(other)
            )));
        }
    };

    let mut names = Vec::with_capacity(owners.len());
    for owner in owners {
        match owner {
            Value::String(name) if !name.trim().is_empty() => names.push(name.trim().to_string()),
            Value::String(_) | Value::Null => {}
            other => {
                return Err(OwnerTraceError::input_format(format!(
                    "record {position}: owner names must be strings, found {}",
                    type_name(other)
                )));
            }
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Collapse nested mappings and sequences into single-level keys.
///
/// Mapping children are keyed `parent_child`; sequence elements are keyed
/// `parent_1`, `parent_2`, ... Scalars are kept as they are. The result never
/// contains a mapping or sequence value.
pub fn flatten(map: &Map<String, Value>) -> FlatRecord {
    let mut out = FlatRecord::new();
    for (key, value) in map {
        flatten_into(&mut out, key.clone(), value);
    }
    out
}

fn flatten_into(out: &mut FlatRecord, key: String, value: &Value) {
    match value {
        Value::Object(children) => {
            for (child, v) in children {
                flatten_into(out, format!("{key}{FLATTEN_SEPARATOR}{child}"), v);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(out, format!("{key}{FLATTEN_SEPARATOR}{}", i + 1), v);
            }
        }
        scalar => {
            out.insert(key, scalar.clone());
        }
    }
}

/// Text form of a scalar for query building; null becomes empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        parse_json_array(&value.to_string()).unwrap()
    }

    #[test]
    fn flatten_nested_and_sequences() {
        let map = json!({"a": {"b": 1}, "c": [10, 20]});
        let flat = flatten(map.as_object().unwrap());
        assert_eq!(
            flat,
            FlatRecord::from([
                ("a_b".to_string(), json!(1)),
                ("c_1".to_string(), json!(10)),
                ("c_2".to_string(), json!(20)),
            ])
        );
    }

    #[test]
    fn flatten_is_identity_on_flat_maps() {
        let map = json!({"folio": "01-0001", "year_built": 1957, "vacant": false, "note": null});
        let flat = flatten(map.as_object().unwrap());
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["year_built"], json!(1957));
        assert_eq!(flat["note"], Value::Null);

        let again: Map<String, Value> = flat.clone().into_iter().collect();
        assert_eq!(flatten(&again), flat);
    }

    #[test]
    fn flatten_deep_structures() {
        let map = json!({
            "tax": [
                {"bill": "2023", "amount_due": 0},
                {"bill": "2022", "parts": [[1, 2], {"x": "y"}]}
            ]
        });
        let flat = flatten(map.as_object().unwrap());
        assert_eq!(flat["tax_1_bill"], json!("2023"));
        assert_eq!(flat["tax_1_amount_due"], json!(0));
        assert_eq!(flat["tax_2_parts_1_2"], json!(2));
        assert_eq!(flat["tax_2_parts_2_x"], json!("y"));
        assert!(flat.values().all(|v| !v.is_array() && !v.is_object()));
    }

    #[test]
    fn one_query_per_owner() {
        let recs = records(json!([
            {"owners": ["JOHN DOE", "JANE DOE"], "city": "Miami", "state": "FL", "folio": "1"},
            {"owners": ["ACME LLC"], "city": "Doral", "state": "FL", "folio": "2"}
        ]));
        let queries = build_queries(&recs, &InputOptions::default()).unwrap();

        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].name, "JOHN DOE");
        assert_eq!(queries[1].name, "JANE DOE");
        assert_eq!(queries[2].city, "Doral");
        assert_eq!(queries[0].zipcode, "");
        assert!(!queries[0].source.contains_key("owners"));
        assert_eq!(queries[0].source["folio"], json!("1"));
        assert_eq!(queries[0].source["city"], json!("Miami"));
    }

    #[test]
    fn empty_or_missing_owners_produce_nothing() {
        let recs = records(json!([
            {"owners": [], "city": "Miami", "state": "FL"},
            {"city": "Miami", "state": "FL"},
            {"owners": null, "city": "Miami", "state": "FL"}
        ]));
        let queries = build_queries(&recs, &InputOptions::default()).unwrap();
        assert!(queries.is_empty());
    }

    #[test]
    fn owners_must_be_a_list() {
        let recs = records(json!([{"owners": "JOHN DOE", "city": "Miami"}]));
        let err = build_queries(&recs, &InputOptions::default()).unwrap_err();
        assert!(matches!(err, OwnerTraceError::InputFormat { .. }));
        assert!(err.to_string().contains("must be a list"));
    }

    #[test]
    fn nested_address_shape() {
        let recs = records(json!([
            {"owners": ["JOHN DOE"], "address": {"city": "Miami", "state": "FL", "zipcode": 33101}}
        ]));
        let opts = InputOptions {
            shape: InputShape::Nested,
            address_key: "address".into(),
        };
        let queries = build_queries(&recs, &opts).unwrap();
        assert_eq!(queries[0].city, "Miami");
        assert_eq!(queries[0].state, "FL");
        assert_eq!(queries[0].zipcode, "33101");
        assert_eq!(queries[0].source["address_city"], json!("Miami"));
    }

    #[test]
    fn null_address_fields_become_empty() {
        let recs = records(json!([{"owners": ["JOHN DOE"], "city": null}]));
        let queries = build_queries(&recs, &InputOptions::default()).unwrap();
        assert_eq!(queries[0].city, "");
        assert_eq!(queries[0].state, "");
    }

    #[test]
    fn non_array_input_rejected() {
        let err = parse_json_array(r#"{"owners": []}"#).unwrap_err();
        assert!(err.to_string().contains("expected an array"));

        let err = parse_json_array("not json").unwrap_err();
        assert!(err.is_batch_fatal());
    }

    #[test]
    fn json_lines_input() {
        let content = "{\"owners\": [\"A\"], \"city\": \"Miami\"}\n\n{\"owners\": [\"B\"]}\n";
        let recs = parse_json_lines(content).unwrap();
        assert_eq!(recs.len(), 2);

        let err = parse_json_lines("{\"owners\": []}\n[1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("record 2"));
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("ot-input-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("owners.jsonl");
        std::fs::write(
            &path,
            "{\"owners\": [\"A\", \"B\"], \"city\": \"Miami\", \"state\": \"FL\"}\n",
        )
        .unwrap();

        let queries = load_queries(&path, &InputOptions::default()).unwrap();
        assert_eq!(queries.len(), 2);

        let missing = load_queries(&dir.join("absent.json"), &InputOptions::default());
        assert!(missing.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
