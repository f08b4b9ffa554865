//! Read-only tabular snapshot of the candidate set.
//!
//! The view stores every attribute as a polars `String` column. Absent and
//! unknown values are both null cells: neither contributes to scoring, and
//! neither is ever offered as an answer option.

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::dataset::record::{AttributeValue, Record};
use crate::error::{InquiryError, Result, ResultExt};

/// Candidate rows plus the designated target attribute.
#[derive(Debug, Clone)]
pub struct DatasetView {
    frame: DataFrame,
    target: String,
}

impl DatasetView {
    /// Build a view from knowledge-store records.
    ///
    /// Column order is the first-seen order of attribute names across the
    /// records. Attributes listed in `ignored` are dropped (the target never is).
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::InvalidAttribute`] if a record lacks a known
    /// target value.
    pub fn from_records(records: &[Record], target: &str, ignored: &[String]) -> Result<Self> {
        let mut order: Vec<&str> = vec![target];
        let mut seen: HashSet<&str> = HashSet::from([target]);

        for (row, record) in records.iter().enumerate() {
            if record.known(target).is_none() {
                return Err(InquiryError::InvalidAttribute(format!(
                    "target attribute '{}' is missing or unknown in row {}",
                    target, row
                )));
            }

            for name in record.attributes() {
                if ignored.iter().any(|i| i == name) || !seen.insert(name) {
                    continue;
                }
                order.push(name);
            }
        }

        // Target goes last so the candidate columns keep their record order.
        order.rotate_left(1);

        let columns: Vec<Column> = order
            .iter()
            .map(|name| {
                let values: Vec<Option<&str>> = records
                    .iter()
                    .map(|record| record.get(name).and_then(AttributeValue::as_known))
                    .collect();
                Column::from(Series::new((*name).into(), &values))
            })
            .collect();

        let frame = DataFrame::new(columns).context("building dataset view")?;
        debug!(
            "Built dataset view: {} rows x {} columns (target '{}')",
            frame.height(),
            frame.width(),
            target
        );

        Ok(Self {
            frame,
            target: target.to_string(),
        })
    }

    /// Wrap an existing frame. Every column is cast to `String`.
    pub fn from_frame(frame: DataFrame, target: &str) -> Result<Self> {
        let columns: Vec<Column> = frame
            .get_columns()
            .iter()
            .map(|column| column.cast(&DataType::String))
            .collect::<PolarsResult<_>>()
            .context("casting dataset columns to strings")?;
        let view = Self {
            frame: DataFrame::new(columns)?,
            target: target.to_string(),
        };

        view.ensure_attribute(target)?;
        if view.column(target)?.null_count() > 0 {
            return Err(InquiryError::InvalidAttribute(format!(
                "target attribute '{}' has unknown values",
                target
            )));
        }
        Ok(view)
    }

    pub fn target_attribute(&self) -> &str {
        &self.target
    }

    /// Number of candidate rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.frame
            .get_column_names()
            .iter()
            .any(|name| name.as_str() == attribute)
    }

    /// All attribute names except `excluding`, in column order.
    pub fn project(&self, excluding: &str) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != excluding)
            .map(|name| name.to_string())
            .collect()
    }

    /// Candidate attributes: every column except the target.
    pub fn candidate_attributes(&self) -> Vec<String> {
        self.project(&self.target)
    }

    /// Distinct values of an attribute in first-seen order.
    ///
    /// With `exclude_unknown == false` a single [`AttributeValue::Unknown`]
    /// entry stands for every absent or unknown cell.
    pub fn unique_values(&self, attribute: &str, exclude_unknown: bool) -> Result<Vec<AttributeValue>> {
        let column = self.column(attribute)?;
        let mut seen: HashSet<Option<&str>> = HashSet::new();
        let mut values = Vec::new();

        for cell in column.into_iter() {
            if cell.is_none() && exclude_unknown {
                continue;
            }
            if seen.insert(cell) {
                values.push(AttributeValue::from(cell));
            }
        }
        Ok(values)
    }

    /// Distinct known values of an attribute, in first-seen order.
    pub fn known_values(&self, attribute: &str) -> Result<Vec<String>> {
        Ok(self
            .unique_values(attribute, true)?
            .into_iter()
            .filter_map(|value| match value {
                AttributeValue::Known(value) => Some(value),
                AttributeValue::Unknown => None,
            })
            .collect())
    }

    /// Sub-view with only the rows where `attribute` is known.
    pub fn filter_known(&self, attribute: &str) -> Result<DatasetView> {
        let mask = self.column(attribute)?.is_not_null();
        let frame = self
            .frame
            .filter(&mask)
            .context(format!("filtering known values of '{}'", attribute))?;
        Ok(Self {
            frame,
            target: self.target.clone(),
        })
    }

    /// Cells of an attribute, `None` for absent or unknown.
    pub fn values(&self, attribute: &str) -> Result<Vec<Option<&str>>> {
        Ok(self.column(attribute)?.into_iter().collect())
    }

    /// Target labels, one per row.
    pub fn target_values(&self) -> Result<Vec<&str>> {
        Ok(self.column(&self.target)?.into_iter().flatten().collect())
    }

    /// Number of rows with a known value for `attribute`.
    pub fn known_count(&self, attribute: &str) -> Result<usize> {
        let column = self.column(attribute)?;
        Ok(column.len() - column.null_count())
    }

    /// Target label frequencies in first-seen order.
    pub fn target_distribution(&self) -> Result<Vec<(String, usize)>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();

        for label in self.target_values()? {
            match index.get(label) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(label, counts.len());
                    counts.push((label.to_string(), 1));
                }
            }
        }
        Ok(counts)
    }

    fn ensure_attribute(&self, attribute: &str) -> Result<()> {
        if self.has_attribute(attribute) {
            Ok(())
        } else {
            Err(InquiryError::InvalidAttribute(format!(
                "attribute '{}' is not part of the dataset",
                attribute
            )))
        }
    }

    fn column(&self, attribute: &str) -> Result<&StringChunked> {
        self.ensure_attribute(attribute)?;
        let series = self.frame.column(attribute)?.as_materialized_series();
        Ok(series.str()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new()
                .with("_id", "1")
                .with("color", "red")
                .with("size", "big")
                .with("cls", "X"),
            Record::new()
                .with("_id", "2")
                .with("color", AttributeValue::Unknown)
                .with("cls", "X"),
            Record::new()
                .with("_id", "3")
                .with("color", "blue")
                .with("size", "small")
                .with("shape", "round")
                .with("cls", "Y"),
        ]
    }

    fn sample_view() -> DatasetView {
        DatasetView::from_records(&sample_records(), "cls", &["_id".to_string()]).unwrap()
    }

    #[test]
    fn test_column_order_follows_records() {
        let view = sample_view();
        assert_eq!(view.candidate_attributes(), vec!["color", "size", "shape"]);
        assert_eq!(view.project("color"), vec!["size", "shape", "cls"]);
        assert_eq!(view.height(), 3);
    }

    #[test]
    fn test_unique_values() {
        let view = sample_view();
        assert_eq!(view.known_values("color").unwrap(), vec!["red", "blue"]);
        assert_eq!(
            view.unique_values("size", false).unwrap(),
            vec![
                AttributeValue::known("big"),
                AttributeValue::Unknown,
                AttributeValue::known("small"),
            ]
        );
    }

    #[test]
    fn test_filter_known() {
        let view = sample_view();
        let known = view.filter_known("color").unwrap();
        assert_eq!(known.height(), 2);
        assert_eq!(known.target_values().unwrap(), vec!["X", "Y"]);
        assert_eq!(view.known_count("shape").unwrap(), 1);
    }

    #[test]
    fn test_invalid_attribute() {
        let view = sample_view();
        let err = view.known_values("_id").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ATTRIBUTE");
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let records = vec![Record::new().with("color", "red")];
        let err = DatasetView::from_records(&records, "cls", &[]).unwrap_err();
        assert!(matches!(err, InquiryError::InvalidAttribute(_)));
    }

    #[test]
    fn test_target_distribution_first_seen_order() {
        let view = sample_view();
        assert_eq!(
            view.target_distribution().unwrap(),
            vec![("X".to_string(), 2), ("Y".to_string(), 1)]
        );
    }

    #[test]
    fn test_from_frame() {
        let df = df![
            "legs" => [4i64, 2, 4],
            "animal" => ["cat", "bird", "dog"],
        ]
        .unwrap();
        let view = DatasetView::from_frame(df, "animal").unwrap();
        assert_eq!(view.known_values("legs").unwrap(), vec!["4", "2"]);
        assert_eq!(view.candidate_attributes(), vec!["legs"]);
    }
}
