//! Per-attribute contingency table used by the sequential strategies.

use std::collections::HashMap;

use crate::criteria;

/// Rows sharing one attribute value.
#[derive(Debug, Clone)]
struct Partition {
    weight: f64,
    class_weights: Vec<f64>,
}

/// Weighted (value, class) counts for a single attribute over the rows
/// where that attribute is known.
///
/// Values and classes are indexed in first-seen order.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeTable<'a> {
    classes: HashMap<&'a str, usize>,
    values: HashMap<&'a str, usize>,
    partitions: Vec<Partition>,
    class_totals: Vec<f64>,
}

impl<'a> AttributeTable<'a> {
    /// Accumulate `(value, class, weight)` rows; rows with no value are skipped.
    pub(crate) fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a str, f64)>,
    {
        let mut table = Self::default();
        for (value, class, weight) in rows {
            if let Some(value) = value {
                table.add(value, class, weight);
            }
        }
        table
    }

    fn add(&mut self, value: &'a str, class: &'a str, weight: f64) {
        let class_count = self.classes.len();
        let class_index = *self.classes.entry(class).or_insert(class_count);
        if class_index == self.class_totals.len() {
            self.class_totals.push(0.0);
            for partition in &mut self.partitions {
                partition.class_weights.push(0.0);
            }
        }

        let value_count = self.values.len();
        let value_index = *self.values.entry(value).or_insert(value_count);
        if value_index == self.partitions.len() {
            self.partitions.push(Partition {
                weight: 0.0,
                class_weights: vec![0.0; self.class_totals.len()],
            });
        }

        let partition = &mut self.partitions[value_index];
        partition.weight += weight;
        partition.class_weights[class_index] += weight;
        self.class_totals[class_index] += weight;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub(crate) fn total_weight(&self) -> f64 {
        self.partitions.iter().map(|p| p.weight).sum()
    }

    /// Entropy gain of splitting the known rows on this attribute.
    pub(crate) fn information_gain(&self) -> f64 {
        let total = self.total_weight();
        let before = criteria::entropy(self.class_totals.iter().copied());
        let after = criteria::weighted_metric(
            self.partitions
                .iter()
                .map(|p| (p.weight, criteria::entropy(p.class_weights.iter().copied()))),
            total,
        );
        before - after
    }

    pub(crate) fn split_info(&self) -> f64 {
        criteria::split_info(
            self.partitions.iter().map(|p| p.weight),
            self.total_weight(),
        )
    }

    pub(crate) fn gain_ratio(&self) -> f64 {
        criteria::gain_ratio(self.information_gain(), self.split_info())
    }

    /// Gini impurity remaining after the split.
    pub(crate) fn weighted_gini(&self) -> f64 {
        criteria::weighted_metric(
            self.partitions
                .iter()
                .map(|p| (p.weight, criteria::gini(p.class_weights.iter().copied()))),
            self.total_weight(),
        )
    }
}
