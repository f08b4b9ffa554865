//! Attribute-Selection Engine for 20-Questions Sessions
//!
//! Given the answers a player has given so far, this library decides the most
//! discriminating next question to ask, or commits to a final guess.
//!
//! # Overview
//!
//! - **Dataset View**: polars-backed snapshot of the candidates consistent with
//!   the answers so far, with absent and unknown values kept out of scoring
//! - **Splitting Strategies**: information gain, gain ratio and gini impurity,
//!   each available sequentially and as a distributed map-reduce pipeline
//! - **Aggregation Pipeline**: bulk-synchronous map/reduce stages on scoped
//!   worker threads, numerically consistent with the sequential strategies
//! - **Resolver**: single class, exhausted attributes and constant columns end
//!   the session with a guess
//! - **Session Orchestrator**: per-turn decisions with a depth bound and
//!   majority-vote fallback, plus a client-side [`Session`] state machine
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_inquiry::{Decision, History, Question, SessionOrchestrator, StrategyKind};
//! use lex_inquiry::store::InMemoryKnowledgeStore;
//! use std::sync::Arc;
//!
//! let store = InMemoryKnowledgeStore::from_json_file("animals.json", "name")?;
//! let orchestrator = SessionOrchestrator::builder()
//!     .store(Arc::new(store))
//!     .build()?;
//!
//! let mut history = History::new();
//! history.push(Question::answered("legs", "4"));
//! history.push(Question::unknown("color"));
//!
//! match orchestrator.decide_next_step(&history, StrategyKind::GainRatio, 20)? {
//!     Decision::Question { question, values } => println!("{}? {:?}", question, values),
//!     Decision::Guess { guess, .. } => println!("It's a {}!", guess),
//! }
//! ```
//!
//! # Strategies
//!
//! | Kind                          | Criterion        | Best     |
//! |-------------------------------|------------------|----------|
//! | `information_gain`            | entropy gain     | max      |
//! | `gain_ratio`                  | gain/split info  | max      |
//! | `gini_impurity`               | weighted gini    | min      |
//! | `*_distributed`               | same, map-reduce | same     |
//!
//! Ties always go to the attribute that comes first in column order, in
//! both execution paths.
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_inquiry::{InquiryConfig, StrategyKind};
//! use std::time::Duration;
//!
//! let config = InquiryConfig::builder()
//!     .default_strategy(StrategyKind::GiniImpurityDistributed)
//!     .workers(8)
//!     .pipeline_timeout(Duration::from_secs(2))
//!     .retry_failed_pipeline(true)
//!     .build()?;
//! ```

pub mod aggregation;
pub mod config;
pub mod criteria;
pub mod dataset;
pub mod error;
pub mod resolver;
pub mod session;
pub mod store;
pub mod strategies;

// Re-exports for convenient access
pub use aggregation::{AggregationStage, ClosureStageObserver, StageObserver, StageUpdate};
pub use config::{ConfigValidationError, InquiryConfig, InquiryConfigBuilder};
pub use criteria::{Criterion, Objective};
pub use dataset::{AttributeValue, DatasetView, History, Question, Record};
pub use error::{ErrorClass, InquiryError, Result as InquiryResult, ResultExt};
pub use resolver::{GuessReason, Resolution};
pub use session::{
    Decision, GuessRequest, Session, SessionOrchestrator, SessionOrchestratorBuilder, SessionState,
};
pub use store::{InMemoryKnowledgeStore, KnowledgeStore};
pub use strategies::{FeatureSplit, SelectionContext, SplitOutcome, StrategyKind, find_best_feature};
