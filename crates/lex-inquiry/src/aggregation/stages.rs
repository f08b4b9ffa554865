//! Stage descriptors for each splitting criterion.
//!
//! A criterion is an ordered list of four [`StageDescriptor`]s. The runner
//! executes each as map, barrier, shuffle by key, reduce, barrier.
//!
//! | Stage            | map                                  | reduce                        |
//! |------------------|--------------------------------------|-------------------------------|
//! | Counting         | row -> (attr, value, target) = 1     | sum                           |
//! | ValueMetrics     | regroup by (attr, value) / attr total| entropy or gini of the group  |
//! | AttributeScores  | regroup by attr                      | gain, gain ratio or gini      |
//! | Selection        | everything to one key                | arg-max / arg-min             |

use crate::aggregation::encoding::EncodedTable;
use crate::aggregation::progress::AggregationStage;
use crate::criteria::{self, Criterion, Objective};

/// Shuffle key. The derived order makes the final reduction deterministic:
/// candidates for the same criterion are ordered by attribute index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum AggKey {
    Row(usize),
    ValueTarget { attribute: usize, value: u32, target: u32 },
    AttributeTarget { attribute: usize, target: u32 },
    Value { attribute: usize, value: u32 },
    AttributeTotal { attribute: usize },
    Attribute { attribute: usize },
    Selection,
}

/// Local metric of one `(attribute, value)` group, or of the attribute-level
/// total when `value` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GroupMetric {
    pub value: Option<u32>,
    pub count: u64,
    pub metric: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AggValue {
    Row,
    Count(u64),
    TargetCount { target: u32, count: u64 },
    Metric(GroupMetric),
    Score(f64),
    Candidate { attribute: usize, score: f64 },
}

pub(crate) type Pair = (AggKey, AggValue);

/// Emits zero or more pairs for one input pair.
pub(crate) type MapFn = fn(&EncodedTable, &Pair, &mut Vec<Pair>);

/// Folds every value shuffled to one key. An `Err` fails the whole run.
pub(crate) type ReduceFn =
    fn(&EncodedTable, AggKey, &[AggValue], &mut Vec<Pair>) -> Result<(), String>;

pub(crate) struct StageDescriptor {
    pub stage: AggregationStage,
    pub map: MapFn,
    pub reduce: ReduceFn,
}

pub(crate) static INFORMATION_GAIN: [StageDescriptor; 4] = [
    StageDescriptor {
        stage: AggregationStage::Counting,
        map: emit_counts_with_totals,
        reduce: sum_counts,
    },
    StageDescriptor {
        stage: AggregationStage::ValueMetrics,
        map: group_by_value,
        reduce: entropy_per_group,
    },
    StageDescriptor {
        stage: AggregationStage::AttributeScores,
        map: group_by_attribute,
        reduce: information_gain_score,
    },
    StageDescriptor {
        stage: AggregationStage::Selection,
        map: to_selection,
        reduce: select_max,
    },
];

pub(crate) static GAIN_RATIO: [StageDescriptor; 4] = [
    StageDescriptor {
        stage: AggregationStage::Counting,
        map: emit_counts_with_totals,
        reduce: sum_counts,
    },
    StageDescriptor {
        stage: AggregationStage::ValueMetrics,
        map: group_by_value,
        reduce: entropy_per_group,
    },
    StageDescriptor {
        stage: AggregationStage::AttributeScores,
        map: group_by_attribute,
        reduce: gain_ratio_score,
    },
    StageDescriptor {
        stage: AggregationStage::Selection,
        map: to_selection,
        reduce: select_max,
    },
];

pub(crate) static GINI_IMPURITY: [StageDescriptor; 4] = [
    StageDescriptor {
        stage: AggregationStage::Counting,
        map: emit_counts,
        reduce: sum_counts,
    },
    StageDescriptor {
        stage: AggregationStage::ValueMetrics,
        map: group_by_value,
        reduce: gini_per_group,
    },
    StageDescriptor {
        stage: AggregationStage::AttributeScores,
        map: group_by_attribute,
        reduce: weighted_gini_score,
    },
    StageDescriptor {
        stage: AggregationStage::Selection,
        map: to_selection,
        reduce: select_min,
    },
];

pub(crate) fn stages_for(criterion: Criterion) -> &'static [StageDescriptor] {
    match criterion {
        Criterion::InformationGain => &INFORMATION_GAIN,
        Criterion::GainRatio => &GAIN_RATIO,
        Criterion::GiniImpurity => &GINI_IMPURITY,
    }
}

fn unexpected(key: AggKey, value: &AggValue) -> String {
    format!("unexpected value {:?} under key {:?}", value, key)
}

// Counting

fn emit_row_counts(table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>, with_totals: bool) {
    let (AggKey::Row(row), AggValue::Row) = *pair else {
        return;
    };
    let Some(target) = table.target(row) else {
        return;
    };
    for (attribute, value) in table.known_cells(row) {
        out.push((
            AggKey::ValueTarget {
                attribute,
                value,
                target,
            },
            AggValue::Count(1),
        ));
        if with_totals {
            out.push((AggKey::AttributeTarget { attribute, target }, AggValue::Count(1)));
        }
    }
}

fn emit_counts(table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>) {
    emit_row_counts(table, pair, out, false);
}

fn emit_counts_with_totals(table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>) {
    emit_row_counts(table, pair, out, true);
}

fn sum_counts(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let mut total = 0u64;
    for value in values {
        match value {
            AggValue::Count(count) => total += count,
            other => return Err(unexpected(key, other)),
        }
    }
    out.push((key, AggValue::Count(total)));
    Ok(())
}

// Value metrics

fn group_by_value(_table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>) {
    match *pair {
        (
            AggKey::ValueTarget {
                attribute,
                value,
                target,
            },
            AggValue::Count(count),
        ) => out.push((
            AggKey::Value { attribute, value },
            AggValue::TargetCount { target, count },
        )),
        (AggKey::AttributeTarget { attribute, target }, AggValue::Count(count)) => out.push((
            AggKey::AttributeTotal { attribute },
            AggValue::TargetCount { target, count },
        )),
        _ => {}
    }
}

fn group_metric(
    key: AggKey,
    values: &[AggValue],
    metric: fn(Vec<f64>) -> f64,
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let value = match key {
        AggKey::Value { value, .. } => Some(value),
        AggKey::AttributeTotal { .. } => None,
        other => return Err(format!("cannot compute a group metric for key {:?}", other)),
    };

    let mut counts: Vec<(u32, u64)> = Vec::with_capacity(values.len());
    for entry in values {
        match *entry {
            AggValue::TargetCount { target, count } => counts.push((target, count)),
            ref other => return Err(unexpected(key, other)),
        }
    }
    counts.sort_unstable_by_key(|(target, _)| *target);

    let count = counts.iter().map(|(_, c)| c).sum();
    let weights = counts.iter().map(|(_, c)| *c as f64).collect();
    out.push((
        key,
        AggValue::Metric(GroupMetric {
            value,
            count,
            metric: metric(weights),
        }),
    ));
    Ok(())
}

fn entropy_per_group(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    group_metric(key, values, criteria::entropy, out)
}

fn gini_per_group(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    group_metric(key, values, criteria::gini, out)
}

// Attribute scores

fn group_by_attribute(_table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>) {
    match *pair {
        (AggKey::Value { attribute, .. }, AggValue::Metric(metric))
        | (AggKey::AttributeTotal { attribute }, AggValue::Metric(metric)) => {
            out.push((AggKey::Attribute { attribute }, AggValue::Metric(metric)));
        }
        _ => {}
    }
}

/// Per-value metrics ordered by value code, plus the attribute total if any.
struct AttributeMetrics {
    attribute: usize,
    parts: Vec<GroupMetric>,
    total: Option<GroupMetric>,
}

impl AttributeMetrics {
    fn collect(key: AggKey, values: &[AggValue]) -> Result<Self, String> {
        let AggKey::Attribute { attribute } = key else {
            return Err(format!("cannot score key {:?}", key));
        };

        let mut parts = Vec::with_capacity(values.len());
        let mut total = None;
        for entry in values {
            match *entry {
                AggValue::Metric(metric) if metric.value.is_none() => total = Some(metric),
                AggValue::Metric(metric) => parts.push(metric),
                ref other => return Err(unexpected(key, other)),
            }
        }
        parts.sort_unstable_by_key(|m| m.value);

        Ok(Self {
            attribute,
            parts,
            total,
        })
    }

    fn known_weight(&self) -> f64 {
        self.parts.iter().map(|m| m.count as f64).sum()
    }

    fn weighted(&self) -> f64 {
        criteria::weighted_metric(
            self.parts.iter().map(|m| (m.count as f64, m.metric)),
            self.known_weight(),
        )
    }

    fn information_gain(&self) -> Result<f64, String> {
        let total = self
            .total
            .ok_or_else(|| format!("attribute {} has no total distribution", self.attribute))?;
        if total.count != self.parts.iter().map(|m| m.count).sum::<u64>() {
            return Err(format!(
                "attribute {} total count {} does not match its value counts",
                self.attribute, total.count
            ));
        }
        Ok(total.metric - self.weighted())
    }
}

fn information_gain_score(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let metrics = AttributeMetrics::collect(key, values)?;
    out.push((key, AggValue::Score(metrics.information_gain()?)));
    Ok(())
}

fn gain_ratio_score(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let metrics = AttributeMetrics::collect(key, values)?;
    let gain = metrics.information_gain()?;
    let split_info = criteria::split_info(
        metrics.parts.iter().map(|m| m.count as f64),
        metrics.known_weight(),
    );
    out.push((key, AggValue::Score(criteria::gain_ratio(gain, split_info))));
    Ok(())
}

fn weighted_gini_score(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let metrics = AttributeMetrics::collect(key, values)?;
    out.push((key, AggValue::Score(metrics.weighted())));
    Ok(())
}

// Selection

fn to_selection(_table: &EncodedTable, pair: &Pair, out: &mut Vec<Pair>) {
    if let (AggKey::Attribute { attribute }, AggValue::Score(score)) = *pair {
        out.push((AggKey::Selection, AggValue::Candidate { attribute, score }));
    }
}

fn select_best(
    key: AggKey,
    values: &[AggValue],
    objective: Objective,
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    let mut candidates: Vec<(usize, f64)> = Vec::with_capacity(values.len());
    for entry in values {
        match *entry {
            AggValue::Candidate { attribute, score } => candidates.push((attribute, score)),
            ref other => return Err(unexpected(key, other)),
        }
    }
    // Column order decides ties, independent of how partitions were merged.
    candidates.sort_unstable_by_key(|(attribute, _)| *attribute);

    let mut best: Option<(usize, f64)> = None;
    for (attribute, score) in candidates.into_iter().filter(|(_, s)| s.is_finite()) {
        let replace = match best {
            None => true,
            Some((_, current)) => objective.improves(score, current),
        };
        if replace {
            best = Some((attribute, score));
        }
    }

    if let Some((attribute, score)) = best {
        out.push((key, AggValue::Candidate { attribute, score }));
    }
    Ok(())
}

fn select_max(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    select_best(key, values, Objective::Maximize, out)
}

fn select_min(
    _table: &EncodedTable,
    key: AggKey,
    values: &[AggValue],
    out: &mut Vec<Pair>,
) -> Result<(), String> {
    select_best(key, values, Objective::Minimize, out)
}
