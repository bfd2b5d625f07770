//! Result persistence for enrichment runs.
//!
//! The pipeline only sees the [`ResultStore`] trait. [`JsonArrayStore`] keeps
//! every entry in a single pretty-printed JSON array and rewrites the whole
//! file on each append, so the file on disk is a complete array after every
//! row. A run of `n` rows costs O(n²) I/O; batches are small.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use compenrich_shared::{CompenrichError, OutputEntry, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Indentation used for the output file.
const INDENT: &[u8] = b"    ";

/// Append-only sink for pipeline results.
pub trait ResultStore {
    /// Persist one entry after all previously appended ones.
    fn append(&mut self, entry: &OutputEntry) -> Result<()>;
}

/// A JSON array file, read-modify-rewritten on every append.
#[derive(Debug, Clone)]
pub struct JsonArrayStore {
    path: PathBuf,
}

impl JsonArrayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current array as raw JSON values.
    ///
    /// A missing file is an empty array. Content that is not a JSON array is
    /// discarded with a warning and also treated as empty.
    pub fn load_values(&self) -> Result<Vec<Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CompenrichError::io(&self.path, e)),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(values)) => Ok(values),
            Ok(other) => {
                warn!(
                    path = %self.path.display(),
                    found = json_kind(&other),
                    "output file is not a JSON array, starting fresh"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "output file is not valid JSON, starting fresh"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Read the current array as typed entries.
    pub fn load(&self) -> Result<Vec<OutputEntry>> {
        self.load_values()?
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value).map_err(|e| {
                    CompenrichError::parse(format!(
                        "{}: entry {index} is not a record: {e}",
                        self.path.display()
                    ))
                })
            })
            .collect()
    }

    /// Number of entries currently on disk.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load_values()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replace the file with `values` via a sibling temp file and a rename.
    fn rewrite(&self, values: &[Value]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CompenrichError::io(parent, e))?;
            }
        }

        let tmp_path = self.temp_path();
        if let Err(e) = write_pretty(&tmp_path, values) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            CompenrichError::io(&self.path, e)
        })?;

        debug!(path = %self.path.display(), entries = values.len(), "rewrote output file");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.json".into());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

impl ResultStore for JsonArrayStore {
    fn append(&mut self, entry: &OutputEntry) -> Result<()> {
        let mut values = self.load_values()?;
        let value = serde_json::to_value(entry)
            .map_err(|e| CompenrichError::Storage(format!("failed to serialize entry: {e}")))?;
        values.push(value);
        self.rewrite(&values)
    }
}

/// Serialize `values` with 4-space indentation into a fresh file.
///
/// The handle is dropped before returning, on success and on error.
fn write_pretty(path: &Path, values: &[Value]) -> Result<()> {
    let file = File::create(path).map_err(|e| CompenrichError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    values
        .serialize(&mut serializer)
        .map_err(|e| CompenrichError::Storage(format!("failed to write {}: {e}", path.display())))?;

    writer.flush().map_err(|e| CompenrichError::io(path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| CompenrichError::io(path, e))?;
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use compenrich_shared::{EnrichedRecord, FailureRecord};

    fn temp_store() -> (PathBuf, JsonArrayStore) {
        let dir = std::env::temp_dir().join(format!("ce-store-test-{}", uuid::Uuid::now_v7()));
        let store = JsonArrayStore::new(dir.join("results.json"));
        (dir, store)
    }

    fn enriched(name: &str) -> OutputEntry {
        let json = format!(
            r#"{{"name":"{name}","services_offered":["toll manufacturing"],"manufacturing_tags":["CDMO"],"contact_information":{{"phone":"+1-555-000-0000","email":"info@acme.com","address":"1 Main St"}},"size_of_company":"200-500"}}"#
        );
        let record: EnrichedRecord = serde_json::from_str(&json).unwrap();
        OutputEntry::Enriched(record)
    }

    #[test]
    fn append_creates_missing_file() {
        let (dir, mut store) = temp_store();

        store.append(&enriched("Acme Chemical Inc")).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.temp_path().exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_keeps_prior_entries_unchanged() {
        let (dir, mut store) = temp_store();

        store.append(&enriched("First")).unwrap();
        store
            .append(&FailureRecord::no_valid_data("Second").into())
            .unwrap();
        let before = store.load_values().unwrap();

        store.append(&enriched("Third")).unwrap();
        let after = store.load_values().unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn entries_roundtrip_through_file() {
        let (dir, mut store) = temp_store();
        let entries = vec![
            enriched("Acme Chemical Inc"),
            FailureRecord::no_valid_data("Acme Chem").into(),
        ];

        for entry in &entries {
            store.append(entry).unwrap();
        }

        assert_eq!(store.load().unwrap(), entries);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let (dir, mut store) = temp_store();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), "[{\"name\": \"half written\"").unwrap();

        let entry: OutputEntry = FailureRecord::no_valid_data("Acme Chem").into();
        store.append(&entry).unwrap();

        assert_eq!(store.load().unwrap(), vec![entry]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_array_file_starts_fresh() {
        let (dir, mut store) = temp_store();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), r#"{"name": "not an array"}"#).unwrap();

        store.append(&enriched("Acme Chemical Inc")).unwrap();

        assert_eq!(store.len().unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn foreign_entries_are_preserved_verbatim() {
        let (dir, mut store) = temp_store();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), r#"[{"custom": [1, 2, 3]}]"#).unwrap();

        store.append(&enriched("Acme Chemical Inc")).unwrap();

        let values = store.load_values().unwrap();
        assert_eq!(values[0], serde_json::json!({"custom": [1, 2, 3]}));
        assert_eq!(values.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_uses_four_space_indent() {
        let (dir, mut store) = temp_store();

        store
            .append(&FailureRecord::no_valid_data("Acme Chem").into())
            .unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "[\n    {\n        \"name\": \"Acme Chem\",\n        \"error\": \"No valid data found\"\n    }\n]"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
