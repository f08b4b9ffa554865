//! Splitting-criterion strategies.
//!
//! Every strategy is a plain function with the [`SelectorFn`] signature.
//! [`StrategyKind`] is the closed set of strategies and the static registry
//! maps each kind to its selector, so dispatch is a table lookup rather than
//! a trait object.
//!
//! The three sequential strategies score each candidate attribute directly
//! over the [`DatasetView`]; the `*Distributed` kinds compute the same scores
//! through the [`aggregation`](crate::aggregation) pipeline.

mod gain_ratio;
mod gini;
mod information_gain;
pub(crate) mod table;

pub use gain_ratio::gain_ratio;
pub use gini::weighted_gini;
pub use information_gain::information_gain;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::aggregation;
use crate::aggregation::progress::StageObserver;
use crate::criteria::Criterion;
use crate::dataset::DatasetView;
use crate::error::{InquiryError, Result};

/// The available attribute-selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    InformationGain,
    GainRatio,
    GiniImpurity,
    InformationGainDistributed,
    GiniImpurityDistributed,
    GainRatioDistributed,
}

/// The attribute chosen for the next question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSplit {
    pub attribute: String,
    pub score: f64,
    /// Distinct known values over the full view; these are the answer options.
    pub values: Vec<String>,
}

/// Result of running a strategy over a view.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitOutcome {
    Split(FeatureSplit),
    /// No attribute could be scored; the caller falls back to a majority guess.
    NoSplit,
}

impl SplitOutcome {
    pub fn split(&self) -> Option<&FeatureSplit> {
        match self {
            Self::Split(split) => Some(split),
            Self::NoSplit => None,
        }
    }
}

/// Execution settings for one strategy run.
///
/// Sequential strategies ignore everything here.
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub observer: Option<&'a dyn StageObserver>,
}

impl Default for SelectionContext<'_> {
    fn default() -> Self {
        Self {
            workers: crate::config::DEFAULT_WORKERS,
            timeout: None,
            observer: None,
        }
    }
}

impl fmt::Debug for SelectionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionContext")
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Common signature shared by every strategy.
pub type SelectorFn = fn(&DatasetView, &SelectionContext<'_>) -> Result<SplitOutcome>;

struct StrategyEntry {
    kind: StrategyKind,
    name: &'static str,
    aliases: &'static [&'static str],
    criterion: Criterion,
    distributed: bool,
    select: SelectorFn,
}

static REGISTRY: [StrategyEntry; 6] = [
    StrategyEntry {
        kind: StrategyKind::InformationGain,
        name: "information_gain",
        aliases: &["id3", "entropy"],
        criterion: Criterion::InformationGain,
        distributed: false,
        select: information_gain::select,
    },
    StrategyEntry {
        kind: StrategyKind::GainRatio,
        name: "gain_ratio",
        aliases: &["c45"],
        criterion: Criterion::GainRatio,
        distributed: false,
        select: gain_ratio::select,
    },
    StrategyEntry {
        kind: StrategyKind::GiniImpurity,
        name: "gini_impurity",
        aliases: &["gini", "cart"],
        criterion: Criterion::GiniImpurity,
        distributed: false,
        select: gini::select,
    },
    StrategyEntry {
        kind: StrategyKind::InformationGainDistributed,
        name: "information_gain_distributed",
        aliases: &["information_gain_mr", "id3_mr"],
        criterion: Criterion::InformationGain,
        distributed: true,
        select: aggregation::select_information_gain,
    },
    StrategyEntry {
        kind: StrategyKind::GiniImpurityDistributed,
        name: "gini_impurity_distributed",
        aliases: &["gini_impurity_mr", "gini_mr", "cart_mr"],
        criterion: Criterion::GiniImpurity,
        distributed: true,
        select: aggregation::select_gini_impurity,
    },
    StrategyEntry {
        kind: StrategyKind::GainRatioDistributed,
        name: "gain_ratio_distributed",
        aliases: &["gain_ratio_mr", "c45_mr"],
        criterion: Criterion::GainRatio,
        distributed: true,
        select: aggregation::select_gain_ratio,
    },
];

static NAMES: Lazy<HashMap<&'static str, StrategyKind>> = Lazy::new(|| {
    REGISTRY
        .iter()
        .flat_map(|entry| {
            std::iter::once(entry.name)
                .chain(entry.aliases.iter().copied())
                .map(move |name| (name, entry.kind))
        })
        .collect()
});

impl StrategyKind {
    /// Every strategy, in registry order.
    pub fn all() -> impl Iterator<Item = StrategyKind> {
        REGISTRY.iter().map(|entry| entry.kind)
    }

    fn entry(self) -> &'static StrategyEntry {
        // The registry lists every variant exactly once, in declaration order.
        &REGISTRY[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn criterion(self) -> Criterion {
        self.entry().criterion
    }

    pub fn is_distributed(self) -> bool {
        self.entry().distributed
    }

    pub fn selector(self) -> SelectorFn {
        self.entry().select
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = InquiryError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        NAMES
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| InquiryError::UnknownStrategy(s.to_string()))
    }
}

/// Pick the best attribute of `view` with the given strategy.
pub fn find_best_feature(
    kind: StrategyKind,
    view: &DatasetView,
    context: &SelectionContext<'_>,
) -> Result<SplitOutcome> {
    (kind.selector())(view, context)
}

/// Score every candidate attribute in column order and keep the best one.
///
/// `score` returns `None` for attributes that have no known value; those are
/// left out of the ranking.
pub(crate) fn select_sequential<F>(
    view: &DatasetView,
    criterion: Criterion,
    mut score: F,
) -> Result<SplitOutcome>
where
    F: FnMut(&DatasetView, &str) -> Result<Option<f64>>,
{
    let objective = criterion.objective();
    let mut best: Option<(String, f64)> = None;

    for attribute in view.candidate_attributes() {
        let Some(value) = score(view, &attribute)? else {
            debug!("Skipping '{}': no known values", attribute);
            continue;
        };
        if !value.is_finite() {
            continue;
        }
        debug!("{} of '{}': {:.6}", criterion.display_name(), attribute, value);

        let replace = match &best {
            None => true,
            Some((_, current)) => objective.improves(value, *current),
        };
        if replace {
            best = Some((attribute, value));
        }
    }

    into_outcome(view, best)
}

/// Attach the answer options to the winning attribute.
pub(crate) fn into_outcome(view: &DatasetView, best: Option<(String, f64)>) -> Result<SplitOutcome> {
    match best {
        None => Ok(SplitOutcome::NoSplit),
        Some((attribute, score)) => {
            let values = view.known_values(&attribute)?;
            Ok(SplitOutcome::Split(FeatureSplit {
                attribute,
                score,
                values,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_declaration_order() {
        for (index, entry) in REGISTRY.iter().enumerate() {
            assert_eq!(entry.kind as usize, index);
        }
        assert_eq!(StrategyKind::all().count(), 6);
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!(
            "information_gain".parse::<StrategyKind>().unwrap(),
            StrategyKind::InformationGain
        );
        assert_eq!("CART".parse::<StrategyKind>().unwrap(), StrategyKind::GiniImpurity);
        assert_eq!("c45".parse::<StrategyKind>().unwrap(), StrategyKind::GainRatio);
        assert_eq!(
            "gini-impurity-distributed".parse::<StrategyKind>().unwrap(),
            StrategyKind::GiniImpurityDistributed
        );
    }

    #[test]
    fn test_parse_unknown_strategy() {
        let err = "random_forest".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_STRATEGY");
    }

    #[test]
    fn test_kind_metadata() {
        assert!(StrategyKind::GainRatioDistributed.is_distributed());
        assert!(!StrategyKind::GainRatio.is_distributed());
        assert_eq!(
            StrategyKind::GiniImpurityDistributed.criterion(),
            Criterion::GiniImpurity
        );
        assert_eq!(StrategyKind::GainRatio.to_string(), "gain_ratio");
    }
}
