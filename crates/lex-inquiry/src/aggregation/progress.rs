//! Progress reporting for the aggregation pipeline.
//!
//! The runner reports one [`StageUpdate`] at every bulk-synchronous barrier,
//! then a terminal `Complete` or `Failed` update. There is no cancellation:
//! a run either finishes or fails as a whole.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_inquiry::{ClosureStageObserver, SessionOrchestrator};
//!
//! let orchestrator = SessionOrchestrator::builder()
//!     .store(store)
//!     .on_stage(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

/// Bulk-synchronous stages of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStage {
    /// Per-row emission of (attribute, value, target) counts, summed per key
    Counting,
    /// Per-(attribute, value) entropy or gini over the target counts
    ValueMetrics,
    /// Per-attribute combination into the final score
    AttributeScores,
    /// Global arg-max / arg-min over the attribute scores
    Selection,
    /// Pipeline finished with a ranking
    Complete,
    /// Pipeline failed; no partial result is kept
    Failed,
}

impl AggregationStage {
    /// The four working stages, in execution order.
    pub const WORKING: [AggregationStage; 4] = [
        Self::Counting,
        Self::ValueMetrics,
        Self::AttributeScores,
        Self::Selection,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Counting => "Counting",
            Self::ValueMetrics => "Value Metrics",
            Self::AttributeScores => "Attribute Scores",
            Self::Selection => "Selection",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run this stage typically takes.
    ///
    /// Counting touches every row; the later stages only touch aggregates.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Counting => 0.70,
            Self::ValueMetrics => 0.15,
            Self::AttributeScores => 0.10,
            Self::Selection => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Counting => 0.0,
            Self::ValueMetrics => 0.70,
            Self::AttributeScores => 0.85,
            Self::Selection => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

impl std::fmt::Display for AggregationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Progress reported at a stage barrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: AggregationStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    pub message: String,

    /// Number of distinct keys the stage produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<usize>,
}

impl StageUpdate {
    /// Update for a stage that has just passed its barrier.
    pub fn finished(stage: AggregationStage, keys: usize) -> Self {
        let progress = stage.base_progress() + stage.weight();
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: format!("{} finished with {} keys", stage.display_name(), keys),
            keys: Some(keys),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: AggregationStage::Complete,
            progress: 1.0,
            message: message.into(),
            keys: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: AggregationStage::Failed,
            progress: 0.0,
            message: message.into(),
            keys: None,
        }
    }
}

/// Receives stage updates from the aggregation runner.
///
/// Implementations must be `Send + Sync`: the observer is shared with the
/// orchestrator, which may run turns on background threads.
pub trait StageObserver: Send + Sync {
    fn report(&self, update: StageUpdate);
}

/// Wrapper that implements [`StageObserver`] using a closure.
pub struct ClosureStageObserver<F>
where
    F: Fn(StageUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureStageObserver<F>
where
    F: Fn(StageUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> StageObserver for ClosureStageObserver<F>
where
    F: Fn(StageUpdate) + Send + Sync,
{
    fn report(&self, update: StageUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(StageUpdate: Send, Sync);
