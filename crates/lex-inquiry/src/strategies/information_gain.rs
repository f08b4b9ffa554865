//! Information gain (ID3-style) attribute selection.

use crate::criteria::Criterion;
use crate::dataset::DatasetView;
use crate::error::Result;
use crate::strategies::table::AttributeTable;
use crate::strategies::{SelectionContext, SplitOutcome, select_sequential};

pub(crate) fn select(view: &DatasetView, _context: &SelectionContext<'_>) -> Result<SplitOutcome> {
    select_sequential(view, Criterion::InformationGain, information_gain)
}

/// Information gain of splitting on `attribute`.
///
/// Only rows where the attribute is known take part, in both the entropy
/// before and after the split. Returns `None` if no row is known.
pub fn information_gain(view: &DatasetView, attribute: &str) -> Result<Option<f64>> {
    let known = view.filter_known(attribute)?;
    if known.is_empty() {
        return Ok(None);
    }

    let values = known.values(attribute)?;
    let targets = known.target_values()?;
    let table = AttributeTable::from_rows(
        values
            .into_iter()
            .zip(targets)
            .map(|(value, target)| (value, target, 1.0)),
    );
    Ok(Some(table.information_gain()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeValue, Record};

    fn view(records: Vec<Record>) -> DatasetView {
        DatasetView::from_records(&records, "cls", &[]).unwrap()
    }

    #[test]
    fn test_prefers_separating_attribute() {
        let view = view(vec![
            Record::new().with("color", "red").with("size", "big").with("cls", "X"),
            Record::new().with("color", "red").with("size", "small").with("cls", "X"),
            Record::new().with("color", "blue").with("size", "big").with("cls", "Y"),
        ]);

        let outcome = select(&view, &SelectionContext::default()).unwrap();
        let split = outcome.split().unwrap();
        assert_eq!(split.attribute, "color");
        assert_eq!(split.values, vec!["red", "blue"]);
    }

    #[test]
    fn test_unknown_rows_are_excluded_per_attribute() {
        let view = view(vec![
            Record::new().with("hair", "blond").with("cls", "A"),
            Record::new().with("hair", "black").with("cls", "B"),
            Record::new().with("hair", AttributeValue::Unknown).with("cls", "A"),
            Record::new().with("cls", "B"),
        ]);

        // Two known rows, perfectly separated: one full bit.
        let gain = information_gain(&view, "hair").unwrap().unwrap();
        assert!((gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fully_unknown_attribute_is_skipped() {
        let view = view(vec![
            Record::new().with("ghost", AttributeValue::Unknown).with("cls", "A"),
            Record::new().with("cls", "B"),
        ]);
        assert_eq!(information_gain(&view, "ghost").unwrap(), None);
        assert_eq!(
            select(&view, &SelectionContext::default()).unwrap(),
            SplitOutcome::NoSplit
        );
    }

    #[test]
    fn test_ties_keep_first_column() {
        let view = view(vec![
            Record::new().with("a", "1").with("b", "1").with("cls", "X"),
            Record::new().with("a", "2").with("b", "2").with("cls", "Y"),
        ]);
        let outcome = select(&view, &SelectionContext::default()).unwrap();
        assert_eq!(outcome.split().unwrap().attribute, "a");
    }
}
