//! Buffered CSV result sink.

use std::fs::File;
use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use ownertrace_shared::{ColumnSchema, OwnerTraceError, ProfileRecord, Result};

/// Collects records in arrival order and writes them once, as CSV.
#[derive(Debug)]
pub struct ResultSink {
    schema: ColumnSchema,
    path: PathBuf,
    records: Vec<ProfileRecord>,
}

impl ResultSink {
    pub fn new(schema: ColumnSchema, path: impl Into<PathBuf>) -> Self {
        Self {
            schema,
            path: path.into(),
            records: Vec::new(),
        }
    }

    pub fn collect(&mut self, record: ProfileRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write every collected record, replacing any existing file.
    ///
    /// The header is the configured schema. Columns a record lacks are empty
    /// cells; record keys outside the schema are dropped.
    pub fn flush(&mut self) -> Result<usize> {
        let file = File::create(&self.path)
            .map_err(|e| OwnerTraceError::output_write(&self.path, e.to_string()))?;
        let mut writer = csv::Writer::from_writer(file);
        let write_err = |e: csv::Error| OwnerTraceError::output_write(&self.path, e.to_string());

        let columns = self.schema.columns();
        writer.write_record(&columns).map_err(write_err)?;

        for record in &self.records {
            let row = record.to_row();
            let cells = columns
                .iter()
                .map(|col| row.get(col).map(cell_text).unwrap_or_default());
            writer.write_record(cells).map_err(write_err)?;
        }

        writer
            .flush()
            .map_err(|e| OwnerTraceError::output_write(&self.path, e.to_string()))?;

        let written = self.records.len();
        info!(path = %self.path.display(), rows = written, "results written");
        Ok(written)
    }
}

/// CSV cell text for a scalar value; null is an empty cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use ownertrace_shared::{ColumnVariant, FlatRecord, Outcome, PROFILE_COLUMNS, ProfileFields};
    use serde_json::json;

    struct Scratch(PathBuf);

    impl Scratch {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("ot-sink-{}", uuid::Uuid::now_v7()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self, name: &str) -> PathBuf {
            self.0.join(name)
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn profile_schema_header_and_nulls() {
        let scratch = Scratch::new();
        let path = scratch.path("profile.csv");
        let mut sink = ResultSink::new(ColumnSchema::Profile, &path);

        let mut fields = ProfileFields::named("John Doe");
        fields.age = Some("47".into());
        fields.set_phones(["(305) 555-0101"]);
        sink.collect(ProfileRecord::matched(fields, None));
        sink.collect(ProfileRecord::placeholder("Jane Roe", None, Outcome::NoMatch));

        assert_eq!(sink.flush().unwrap(), 2);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], PROFILE_COLUMNS.map(String::from).to_vec());
        assert_eq!(rows[1][0], "John Doe");
        assert_eq!(rows[1][1], "47");
        assert_eq!(rows[1][7], "(305) 555-0101");
        assert_eq!(rows[1][8], "");
        assert_eq!(rows[2][0], "Jane Roe");
        assert!(rows[2][1..].iter().all(String::is_empty));
    }

    #[test]
    fn merged_schema_drops_unknown_keys() {
        let scratch = Scratch::new();
        let path = scratch.path("merged.csv");
        let schema = ColumnSchema::new(
            ColumnVariant::Merged,
            &["year_built".into(), "market_value".into()],
        );
        let mut sink = ResultSink::new(schema, &path);

        let source = FlatRecord::from([
            ("year_built".to_string(), json!(1957)),
            ("folio".to_string(), json!("01-0001")),
        ]);
        sink.collect(ProfileRecord::matched(ProfileFields::named("A"), Some(source)));
        sink.flush().unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0].len(), PROFILE_COLUMNS.len() + 2);
        assert!(!rows[0].contains(&"folio".to_string()));
        assert_eq!(rows[1][12], "1957");
        assert_eq!(rows[1][13], "");
    }

    #[test]
    fn flush_overwrites_previous_output() {
        let scratch = Scratch::new();
        let path = scratch.path("overwrite.csv");
        std::fs::write(&path, "stale,content\n1,2\n3,4\n5,6\n").unwrap();

        let mut sink = ResultSink::new(ColumnSchema::Profile, &path);
        sink.collect(ProfileRecord::placeholder("Only", None, Outcome::Failed));
        sink.flush().unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "name");
    }

    #[test]
    fn unwritable_destination_is_output_error() {
        let path = std::env::temp_dir()
            .join(format!("ot-missing-{}", uuid::Uuid::now_v7()))
            .join("out.csv");
        let mut sink = ResultSink::new(ColumnSchema::Profile, &path);
        let err = sink.flush().unwrap_err();
        assert!(matches!(err, OwnerTraceError::OutputWrite { .. }));
        assert!(err.is_batch_fatal());
    }
}
