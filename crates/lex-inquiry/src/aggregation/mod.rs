//! Distributed aggregation pipeline.
//!
//! The `*Distributed` strategies compute the same attribute ranking as the
//! sequential strategies, but as a chain of bulk-synchronous map-reduce
//! stages over a dictionary-encoded copy of the view:
//!
//! 1. **Counting**: every known cell emits `(attribute, value, target) -> 1`
//!    (plus `(attribute, target) -> 1` for the gain criteria), summed per key
//! 2. **Value metrics**: local entropy or gini per `(attribute, value)` group
//!    and per attribute total
//! 3. **Attribute scores**: count-weighted combination into the final score
//! 4. **Selection**: arg-max (arg-min for gini) in column order
//!
//! Map and reduce work is spread over scoped worker threads with a barrier
//! after each phase. A run either returns one ranking or fails entirely.

mod encoding;
pub mod progress;
mod runner;
mod stages;

pub use progress::{AggregationStage, ClosureStageObserver, StageObserver, StageUpdate};

use std::time::Instant;
use tracing::{debug, info_span};

use crate::criteria::Criterion;
use crate::dataset::DatasetView;
use crate::error::{InquiryError, Result};
use crate::strategies::{SelectionContext, SplitOutcome, into_outcome};
use encoding::EncodedTable;
use runner::BspRunner;
use stages::{AggKey, AggValue, Pair};

/// Run the full pipeline and return the winning attribute.
pub fn run_pipeline(
    view: &DatasetView,
    criterion: Criterion,
    context: &SelectionContext<'_>,
) -> Result<SplitOutcome> {
    let span = info_span!("aggregation", criterion = criterion.display_name(), rows = view.height());
    let _guard = span.enter();
    let started = Instant::now();

    let table = EncodedTable::from_view(view)?;
    let output = build_runner(&table, context).run(stages::stages_for(criterion), row_pairs(&table))?;

    let best = match output.as_slice() {
        [] => None,
        [(AggKey::Selection, AggValue::Candidate { attribute, score })] => {
            let name = table.attribute_name(*attribute).ok_or_else(|| {
                InquiryError::Internal(format!("selected attribute index {} out of range", attribute))
            })?;
            Some((name.to_string(), *score))
        }
        other => {
            return Err(InquiryError::ComputationFailed {
                stage: AggregationStage::Selection.display_name().to_string(),
                reason: format!("expected a single selection, got {} pairs", other.len()),
            });
        }
    };

    let outcome = into_outcome(view, best)?;
    debug!(
        "Pipeline selected {:?} in {:?}",
        outcome.split().map(|s| s.attribute.as_str()),
        started.elapsed()
    );
    report(context, StageUpdate::complete("Aggregation complete"));
    Ok(outcome)
}

/// Run the pipeline up to the per-attribute scores, in column order.
///
/// Attributes without any known value have no score.
pub fn attribute_scores(
    view: &DatasetView,
    criterion: Criterion,
    context: &SelectionContext<'_>,
) -> Result<Vec<(String, f64)>> {
    let table = EncodedTable::from_view(view)?;
    let stages = stages::stages_for(criterion);
    let scoring = &stages[..stages.len() - 1];
    let output = build_runner(&table, context).run(scoring, row_pairs(&table))?;

    let mut scores = Vec::with_capacity(output.len());
    for (key, value) in output {
        if let (AggKey::Attribute { attribute }, AggValue::Score(score)) = (key, value)
            && let Some(name) = table.attribute_name(attribute)
        {
            scores.push((name.to_string(), score));
        }
    }
    Ok(scores)
}

pub(crate) fn select_information_gain(
    view: &DatasetView,
    context: &SelectionContext<'_>,
) -> Result<SplitOutcome> {
    run_pipeline(view, Criterion::InformationGain, context)
}

pub(crate) fn select_gain_ratio(
    view: &DatasetView,
    context: &SelectionContext<'_>,
) -> Result<SplitOutcome> {
    run_pipeline(view, Criterion::GainRatio, context)
}

pub(crate) fn select_gini_impurity(
    view: &DatasetView,
    context: &SelectionContext<'_>,
) -> Result<SplitOutcome> {
    run_pipeline(view, Criterion::GiniImpurity, context)
}

fn build_runner<'a>(table: &'a EncodedTable, context: &SelectionContext<'a>) -> BspRunner<'a> {
    BspRunner::new(table, context.workers)
        .with_timeout(context.timeout)
        .with_observer(context.observer)
}

fn row_pairs(table: &EncodedTable) -> Vec<Pair> {
    (0..table.height())
        .map(|row| (AggKey::Row(row), AggValue::Row))
        .collect()
}

fn report(context: &SelectionContext<'_>, update: StageUpdate) {
    if let Some(observer) = context.observer {
        observer.report(update);
    }
}
