//! Impurity measures shared by the sequential strategies and the
//! aggregation pipeline.
//!
//! Both execution paths feed the same functions with the same weights, so
//! they agree on scores up to floating point summation order.

use serde::{Deserialize, Serialize};

/// Two scores closer than this are treated as a tie.
///
/// Ties keep the attribute that came first in column order.
pub const SCORE_TOLERANCE: f64 = 1e-12;

/// The splitting criterion behind a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    InformationGain,
    GainRatio,
    GiniImpurity,
}

/// Whether higher or lower scores win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Maximize,
    Minimize,
}

impl Criterion {
    pub fn objective(self) -> Objective {
        match self {
            Self::InformationGain | Self::GainRatio => Objective::Maximize,
            Self::GiniImpurity => Objective::Minimize,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::InformationGain => "information gain",
            Self::GainRatio => "gain ratio",
            Self::GiniImpurity => "weighted gini",
        }
    }
}

impl Objective {
    /// True if `candidate` beats `best` by more than [`SCORE_TOLERANCE`].
    pub fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            Self::Maximize => candidate > best + SCORE_TOLERANCE,
            Self::Minimize => candidate < best - SCORE_TOLERANCE,
        }
    }
}

/// Shannon entropy (base 2) of a class distribution given as weights.
///
/// Zero-weight classes contribute nothing; an empty distribution has entropy 0.
pub fn entropy<I>(class_weights: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = class_weights.into_iter().collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    weights
        .iter()
        .filter(|w| **w > 0.0)
        .map(|w| {
            let p = w / total;
            -p * p.log2()
        })
        .sum()
}

/// Gini impurity `1 - Σ p²` of a class distribution given as weights.
pub fn gini<I>(class_weights: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = class_weights.into_iter().collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    1.0 - weights
        .iter()
        .map(|w| {
            let p = w / total;
            p * p
        })
        .sum::<f64>()
}

/// Weighted average of per-partition metrics: `Σ (w_v / total) · metric_v`.
pub fn weighted_metric<I>(partitions: I, total: f64) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    if total <= 0.0 {
        return 0.0;
    }
    partitions
        .into_iter()
        .map(|(weight, metric)| (weight / total) * metric)
        .sum()
}

/// Split information `-Σ p_v · log2(p_v)` of a partition.
pub fn split_info<I>(partition_weights: I, total: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    if total <= 0.0 {
        return 0.0;
    }
    partition_weights
        .into_iter()
        .filter(|w| *w > 0.0)
        .map(|w| {
            let p = w / total;
            -p * p.log2()
        })
        .sum()
}

/// Gain normalized by split information; 0 when split information is 0.
pub fn gain_ratio(gain: f64, split_info: f64) -> f64 {
    if split_info <= 0.0 {
        0.0
    } else {
        gain / split_info
    }
}
