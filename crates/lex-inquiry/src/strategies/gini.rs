//! Gini impurity attribute selection. Lower remaining impurity wins.

use crate::criteria::Criterion;
use crate::dataset::DatasetView;
use crate::error::Result;
use crate::strategies::table::AttributeTable;
use crate::strategies::{SelectionContext, SplitOutcome, select_sequential};

pub(crate) fn select(view: &DatasetView, _context: &SelectionContext<'_>) -> Result<SplitOutcome> {
    select_sequential(view, Criterion::GiniImpurity, weighted_gini)
}

/// Weighted gini impurity after splitting on `attribute`, over known rows only.
pub fn weighted_gini(view: &DatasetView, attribute: &str) -> Result<Option<f64>> {
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
    Ok(Some(table.weighted_gini()))
}
