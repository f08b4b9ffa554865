//! Gain ratio (C4.5-style) attribute selection with per-row weights.
//!
//! Every row starts with weight 1.0. A row only drops out of an attribute's
//! computation when that attribute is unknown for it; the weights of the
//! other rows carry over unchanged. Split information is computed afresh
//! for every attribute.

use crate::criteria::Criterion;
use crate::dataset::DatasetView;
use crate::error::{InquiryError, Result};
use crate::strategies::table::AttributeTable;
use crate::strategies::{SelectionContext, SplitOutcome, select_sequential};

pub(crate) fn select(view: &DatasetView, _context: &SelectionContext<'_>) -> Result<SplitOutcome> {
    let weights = vec![1.0; view.height()];
    select_sequential(view, Criterion::GainRatio, |view, attribute| {
        gain_ratio(view, attribute, &weights)
    })
}

/// Gain ratio of splitting on `attribute` with the given row weights.
///
/// Returns `None` if the attribute has no known value.
pub fn gain_ratio(view: &DatasetView, attribute: &str, weights: &[f64]) -> Result<Option<f64>> {
    if weights.len() != view.height() {
        return Err(InquiryError::Internal(format!(
            "{} weights supplied for {} rows",
            weights.len(),
            view.height()
        )));
    }

    let values = view.values(attribute)?;
    let targets = view.target_values()?;
    let table = AttributeTable::from_rows(
        values
            .into_iter()
            .zip(targets)
            .zip(weights.iter().copied())
            .map(|((value, target), weight)| (value, target, weight)),
    );

    if table.is_empty() {
        return Ok(None);
    }
    Ok(Some(table.gain_ratio()))
}
