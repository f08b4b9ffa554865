//! Per-turn decision logic.
//!
//! The orchestrator owns no session state: every turn is computed from the
//! client-supplied history alone, so one orchestrator serves any number of
//! concurrent sessions.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::aggregation::progress::{ClosureStageObserver, StageObserver, StageUpdate};
use crate::config::InquiryConfig;
use crate::dataset::{DatasetView, History};
use crate::error::{InquiryError, Result, ResultExt};
use crate::resolver::{self, GuessReason, Resolution};
use crate::session::dto::{Decision, GuessRequest};
use crate::store::KnowledgeStore;
use crate::strategies::{self, SelectionContext, SplitOutcome, StrategyKind};

/// Decides the next question or the final guess for a session turn.
///
/// Use [`SessionOrchestrator::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use lex_inquiry::{History, InquiryConfig, SessionOrchestrator, StrategyKind};
/// use lex_inquiry::store::InMemoryKnowledgeStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryKnowledgeStore::from_json_file("animals.json", "name")?);
/// let orchestrator = SessionOrchestrator::builder()
///     .store(store)
///     .config(InquiryConfig::builder().workers(8).build()?)
///     .build()?;
///
/// let decision = orchestrator.decide_next_step(&History::new(), StrategyKind::GainRatio, 20)?;
/// ```
pub struct SessionOrchestrator {
    store: Arc<dyn KnowledgeStore>,
    config: InquiryConfig,
    observer: Option<Arc<dyn StageObserver>>,
    target: String,
}

static_assertions::assert_impl_all!(SessionOrchestrator: Send, Sync);

impl SessionOrchestrator {
    pub fn builder() -> SessionOrchestratorBuilder {
        SessionOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &InquiryConfig {
        &self.config
    }

    pub fn target_attribute(&self) -> &str {
        &self.target
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    /// Decide with the configured default strategy and depth bound.
    pub fn decide(&self, history: &History) -> Result<Decision> {
        self.decide_next_step(history, self.config.default_strategy, self.config.max_depth)
    }

    /// Decide for an API request.
    pub fn handle_request(&self, request: &GuessRequest) -> Result<Decision> {
        let strategy = request.strategy_kind(self.config.default_strategy)?;
        self.decide_next_step(&request.questions, strategy, request.max_depth)
    }

    /// Decide the next step of a session.
    ///
    /// # Errors
    ///
    /// - [`InquiryError::EmptyCandidateSet`] if no entity matches the answers
    /// - [`InquiryError::ComputationFailed`] / [`InquiryError::PipelineTimeout`]
    ///   if a distributed strategy fails (after the optional retry)
    pub fn decide_next_step(
        &self,
        history: &History,
        strategy: StrategyKind,
        max_depth: usize,
    ) -> Result<Decision> {
        let depth = history.len();
        let span = info_span!("turn", depth, strategy = strategy.name());
        let _guard = span.enter();
        let started = Instant::now();

        let view = self.candidate_view(history)?;
        debug!(
            "{} candidates, {} attributes",
            view.height(),
            view.candidate_attributes().len()
        );

        let decision = self.decide_on_view(&view, depth, strategy, max_depth)?;
        match &decision {
            Decision::Question { question, values } => info!(
                "Asking '{}' ({} options) after {:?}",
                question,
                values.len(),
                started.elapsed()
            ),
            Decision::Guess { guess, reason } => info!(
                "Guessing '{}' ({}) after {:?}",
                guess,
                reason.describe(),
                started.elapsed()
            ),
        }
        Ok(decision)
    }

    /// Build the dataset view of the candidates consistent with `history`.
    ///
    /// Attributes already asked are never candidates again, whether or not
    /// the store projected them away.
    pub fn candidate_view(&self, history: &History) -> Result<DatasetView> {
        let records = self
            .store
            .candidate_section(history)
            .context(format!("querying {}", self.store.name()))?;
        if records.is_empty() {
            return Err(InquiryError::EmptyCandidateSet {
                depth: history.len(),
            });
        }

        let mut excluded = self.config.ignored_attributes.clone();
        excluded.extend(
            history
                .iter()
                .filter(|q| q.name != self.target)
                .map(|q| q.name.clone()),
        );
        DatasetView::from_records(&records, &self.target, &excluded)
    }

    fn decide_on_view(
        &self,
        view: &DatasetView,
        depth: usize,
        strategy: StrategyKind,
        max_depth: usize,
    ) -> Result<Decision> {
        if depth >= max_depth {
            warn!("Depth limit {} reached, falling back to majority vote", max_depth);
            return self.majority(view, GuessReason::DepthLimit);
        }

        if let Resolution::Guess { label, reason } = resolver::resolve(view)? {
            return Ok(Decision::guess(label, reason));
        }

        match self.select(strategy, view)? {
            SplitOutcome::Split(split) if split.values.len() >= 2 => {
                Ok(Decision::question(split.attribute, split.values))
            }
            SplitOutcome::Split(split) => {
                warn!(
                    "'{}' offers {} value(s), falling back to majority vote",
                    split.attribute,
                    split.values.len()
                );
                self.majority(view, GuessReason::DegenerateSplit)
            }
            SplitOutcome::NoSplit => {
                warn!("No attribute could be scored, falling back to majority vote");
                self.majority(view, GuessReason::NoSplit)
            }
        }
    }

    /// Run the strategy; a failed pipeline run is retried once if configured.
    fn select(&self, strategy: StrategyKind, view: &DatasetView) -> Result<SplitOutcome> {
        let context = SelectionContext {
            workers: self.config.workers,
            timeout: self.config.pipeline_timeout(),
            observer: self.observer.as_deref(),
        };

        match strategies::find_best_feature(strategy, view, &context) {
            Err(e) if e.is_pipeline_failure() && self.config.retry_failed_pipeline => {
                warn!("{} failed ({}), retrying once", strategy, e);
                strategies::find_best_feature(strategy, view, &context)
                    .context(format!("{} failed after retry", strategy))
            }
            other => other,
        }
    }

    fn majority(&self, view: &DatasetView, reason: GuessReason) -> Result<Decision> {
        Ok(Decision::guess(resolver::majority_label(view)?, reason))
    }

    /// Run a turn on the blocking thread pool.
    #[cfg(feature = "async")]
    pub async fn decide_next_step_async(
        self: Arc<Self>,
        history: History,
        strategy: StrategyKind,
        max_depth: usize,
    ) -> Result<Decision> {
        tokio::task::spawn_blocking(move || self.decide_next_step(&history, strategy, max_depth))
            .await
            .map_err(|e| InquiryError::Internal(format!("decision task failed: {}", e)))?
    }
}

/// Builder for [`SessionOrchestrator`].
#[derive(Default)]
pub struct SessionOrchestratorBuilder {
    store: Option<Arc<dyn KnowledgeStore>>,
    config: Option<InquiryConfig>,
    observer: Option<Arc<dyn StageObserver>>,
}

static_assertions::assert_impl_all!(SessionOrchestratorBuilder: Send);

impl SessionOrchestratorBuilder {
    /// Set the knowledge store. Required.
    pub fn store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: InquiryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Receive aggregation stage updates from distributed strategies.
    pub fn stage_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set a stage callback closure.
    pub fn on_stage<F>(mut self, callback: F) -> Self
    where
        F: Fn(StageUpdate) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(ClosureStageObserver::new(callback)));
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if no store was set, the configuration is invalid,
    /// or the store cannot name its target field.
    pub fn build(self) -> Result<SessionOrchestrator> {
        let store = self
            .store
            .ok_or_else(|| InquiryError::InvalidConfig("a knowledge store is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let target = store.target_field()?;

        Ok(SessionOrchestrator {
            store,
            config,
            observer: self.observer,
            target,
        })
    }
}
