//! Dictionary encoding of a dataset view for the aggregation stages.
//!
//! Values and target labels become `u32` codes assigned in first-seen order,
//! so aggregation keys are small `Copy` values with a total order.

use std::collections::HashMap;

use crate::dataset::DatasetView;
use crate::error::Result;

/// Column-major encoded snapshot of the candidate attributes.
#[derive(Debug, Clone)]
pub(crate) struct EncodedTable {
    attributes: Vec<String>,
    columns: Vec<Vec<Option<u32>>>,
    targets: Vec<u32>,
}

impl EncodedTable {
    pub(crate) fn from_view(view: &DatasetView) -> Result<Self> {
        let attributes = view.candidate_attributes();
        let columns = attributes
            .iter()
            .map(|attribute| Ok(encode(view.values(attribute)?)))
            .collect::<Result<Vec<_>>>()?;
        let targets = encode(view.target_values()?.into_iter().map(Some))
            .into_iter()
            .flatten()
            .collect();

        Ok(Self {
            attributes,
            columns,
            targets,
        })
    }

    pub(crate) fn height(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn attribute_name(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(String::as_str)
    }

    /// Known cells of one row as `(attribute, value)` codes.
    pub(crate) fn known_cells(&self, row: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(move |(attribute, column)| {
                column.get(row).copied().flatten().map(|value| (attribute, value))
            })
    }

    pub(crate) fn target(&self, row: usize) -> Option<u32> {
        self.targets.get(row).copied()
    }
}

fn encode<'a, I>(cells: I) -> Vec<Option<u32>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut codes: HashMap<&'a str, u32> = HashMap::new();
    cells
        .into_iter()
        .map(|cell| {
            cell.map(|value| {
                let next = codes.len() as u32;
                *codes.entry(value).or_insert(next)
            })
        })
        .collect()
}
