//! Knowledge store over an in-memory snapshot of records.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::dataset::{AttributeValue, History, Record};
use crate::error::{InquiryError, Result, ResultExt};
use crate::store::KnowledgeStore;

/// Knowledge store holding every entity in memory.
///
/// # Example
///
/// ```rust,ignore
/// use lex_inquiry::store::InMemoryKnowledgeStore;
///
/// let store = InMemoryKnowledgeStore::from_json_file("animals.json", "name")?;
/// let candidates = store.candidate_section(&history)?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryKnowledgeStore {
    records: Vec<Record>,
    target: String,
    vocabulary: HashMap<String, Vec<String>>,
}

impl InMemoryKnowledgeStore {
    /// Create a store; every record must carry a known target value.
    pub fn new(records: Vec<Record>, target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        if let Some(row) = records.iter().position(|r| r.known(&target).is_none()) {
            return Err(InquiryError::KnowledgeStore(format!(
                "record {} has no value for target field '{}'",
                row, target
            )));
        }

        info!("Loaded {} records (target '{}')", records.len(), target);
        Ok(Self {
            records,
            target,
            vocabulary: HashMap::new(),
        })
    }

    /// Replace the derived vocabulary of `attribute` with an explicit one.
    pub fn with_vocabulary<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a JSON array of objects.
    ///
    /// `null` marks an explicit unknown; a missing key means the attribute is
    /// absent for that entity.
    pub fn from_json_str(json: &str, target: impl Into<String>) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_str(json).context("parsing knowledge base")?;
        Self::new(records, target)
    }

    pub fn from_json_file(path: impl AsRef<Path>, target: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(InquiryError::from)
            .context(format!("reading {}", path.display()))?;
        Self::from_json_str(&json, target)
    }

    /// Load a CSV file; every column is read as text and empty cells are absent.
    pub fn from_csv_file(path: impl AsRef<Path>, target: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .context(format!("reading {}", path.display()))?;
        Self::from_frame(&frame, target)
    }

    pub fn from_csv_str(csv: &str, target: impl Into<String>) -> Result<Self> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(csv.to_string()))
            .finish()
            .context("parsing CSV knowledge base")?;
        Self::from_frame(&frame, target)
    }

    /// One record per row; null cells become absent attributes.
    pub fn from_frame(frame: &DataFrame, target: impl Into<String>) -> Result<Self> {
        let columns: Vec<(String, Vec<Option<String>>)> = frame
            .get_columns()
            .iter()
            .map(|column| {
                let cast = column.cast(&DataType::String)?;
                let values = cast
                    .as_materialized_series()
                    .str()?
                    .into_iter()
                    .map(|cell| cell.map(str::to_string))
                    .collect();
                Ok((column.name().to_string(), values))
            })
            .collect::<PolarsResult<_>>()
            .context("converting frame to records")?;

        let records: Vec<Record> = (0..frame.height())
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|(name, values)| {
                        values[row]
                            .as_ref()
                            .map(|value| (name.clone(), AttributeValue::known(value.as_str())))
                    })
                    .collect::<Record>()
            })
            .collect();
        Self::new(records, target)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn matches(record: &Record, answered: &[(&str, &str)]) -> bool {
        answered.iter().all(|(attribute, answer)| match record.get(attribute) {
            None => true,
            Some(AttributeValue::Known(value)) => value == answer,
            Some(AttributeValue::Unknown) => false,
        })
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn candidate_section(&self, history: &History) -> Result<Vec<Record>> {
        let answered: Vec<(&str, &str)> = history.answered().collect();
        let asked: Vec<&str> = history
            .iter()
            .map(|q| q.name.as_str())
            .filter(|name| *name != self.target)
            .collect();

        let section: Vec<Record> = self
            .records
            .iter()
            .filter(|record| Self::matches(record, &answered))
            .map(|record| {
                let mut record = record.clone();
                for name in &asked {
                    record.remove(name);
                }
                record
            })
            .collect();

        debug!(
            "{} of {} records match {} answered question(s)",
            section.len(),
            self.records.len(),
            answered.len()
        );
        Ok(section)
    }

    fn target_field(&self) -> Result<String> {
        Ok(self.target.clone())
    }

    fn attribute_values(&self, attribute: &str) -> Result<Vec<String>> {
        if let Some(values) = self.vocabulary.get(attribute) {
            return Ok(values.clone());
        }

        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|record| record.known(attribute))
            .collect();
        if values.is_empty() && !self.records.iter().any(|r| r.contains(attribute)) {
            return Err(InquiryError::InvalidAttribute(format!(
                "attribute '{}' does not occur in the knowledge base",
                attribute
            )));
        }
        Ok(values.into_iter().map(str::to_string).collect())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Question;
    use pretty_assertions::assert_eq;

    const ANIMALS: &str = r#"[
        {"_id": 1, "name": "dog", "legs": 4, "sound": "bark", "fur": true},
        {"_id": 2, "name": "cat", "legs": 4, "sound": "meow", "fur": true},
        {"_id": 3, "name": "snake", "legs": 0, "sound": null},
        {"_id": 4, "name": "parrot", "legs": 2, "sound": "talk", "fur": false}
    ]"#;

    fn store() -> InMemoryKnowledgeStore {
        InMemoryKnowledgeStore::from_json_str(ANIMALS, "name").unwrap()
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().filter_map(|r| r.known("name")).collect()
    }

    #[test]
    fn test_json_scalars_become_strings() {
        let store = store();
        assert_eq!(store.len(), 4);
        assert_eq!(store.records()[0].known("legs"), Some("4"));
        assert_eq!(store.records()[0].known("fur"), Some("true"));
        assert_eq!(store.records()[2].get("sound"), Some(&AttributeValue::Unknown));
        assert!(!store.records()[2].contains("fur"));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let err = InMemoryKnowledgeStore::from_json_str(r#"[{"name": "dog""#, "name").unwrap_err();
        assert_eq!(err.error_code(), "JSON_ERROR");
        assert!(err.to_string().contains("parsing knowledge base"));
    }

    #[test]
    fn test_empty_answer_does_not_filter() {
        let store = store();
        let history: History = vec![Question::answered("sound", "")].into();

        let section = store.candidate_section(&history).unwrap();
        assert_eq!(names(&section), vec!["dog", "cat", "snake", "parrot"]);
        assert!(section.iter().all(|record| !record.contains("sound")));
    }

    #[test]
    fn test_filter_keeps_absent_and_drops_unknown() {
        let store = store();

        let history: History = vec![Question::answered("fur", "true")].into();
        assert_eq!(names(&store.candidate_section(&history).unwrap()), vec!["dog", "cat", "snake"]);

        let history: History = vec![Question::answered("sound", "bark")].into();
        assert_eq!(names(&store.candidate_section(&history).unwrap()), vec!["dog"]);
    }

    #[test]
    fn test_unknown_answer_does_not_filter() {
        let store = store();
        let history: History = vec![Question::unknown("legs")].into();
        let section = store.candidate_section(&history).unwrap();
        assert_eq!(section.len(), 4);
        assert!(section.iter().all(|r| !r.contains("legs")));
    }

    #[test]
    fn test_asked_attributes_are_projected_away() {
        let store = store();
        let history: History = vec![Question::answered("legs", "4")].into();
        let section = store.candidate_section(&history).unwrap();
        assert_eq!(names(&section), vec!["dog", "cat"]);
        assert!(section.iter().all(|r| !r.contains("legs")));
        assert!(section.iter().all(|r| r.contains("sound")));
    }

    #[test]
    fn test_vocabulary() {
        let store = store().with_vocabulary("fur", ["true", "false", "partial"]);
        assert_eq!(
            store.attribute_values("legs").unwrap(),
            vec!["0", "2", "4"]
        );
        assert_eq!(
            store.attribute_values("fur").unwrap(),
            vec!["true", "false", "partial"]
        );
        assert!(store.attribute_values("wings").is_err());
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let err = InMemoryKnowledgeStore::from_json_str(r#"[{"legs": "4"}]"#, "name").unwrap_err();
        assert_eq!(err.error_code(), "KNOWLEDGE_STORE_ERROR");
    }

    #[test]
    fn test_csv_empty_cells_are_absent() {
        let csv = "name,color,size\napple,red,small\nmelon,,big\n";
        let store = InMemoryKnowledgeStore::from_csv_str(csv, "name").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].known("color"), Some("red"));
        assert!(!store.records()[1].contains("color"));
        assert_eq!(store.records()[1].known("size"), Some("big"));
    }
}
