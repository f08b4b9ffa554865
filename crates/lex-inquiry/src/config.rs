//! Configuration types for guessing sessions.
//!
//! This module provides configuration options using the builder pattern.
//! The configuration is handed to the session orchestrator explicitly;
//! nothing here is process-global.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::strategies::StrategyKind;

/// Default question-depth bound, matching the client default.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Default number of aggregation worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration for the session orchestrator.
///
/// Use [`InquiryConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_inquiry::config::InquiryConfig;
/// use lex_inquiry::StrategyKind;
///
/// let config = InquiryConfig::builder()
///     .default_strategy(StrategyKind::GiniImpurityDistributed)
///     .workers(8)
///     .max_depth(25)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryConfig {
    /// Strategy used when the caller does not pick one.
    /// Default: InformationGain
    pub default_strategy: StrategyKind,

    /// Maximum number of questions before a majority-vote guess is forced.
    /// Default: 20
    pub max_depth: usize,

    /// Number of worker threads for the distributed aggregation pipeline.
    /// Default: 4
    pub workers: usize,

    /// Time budget for one aggregation pipeline run, in milliseconds.
    /// Default: None (unbounded)
    pub pipeline_timeout_ms: Option<u64>,

    /// Whether a failed pipeline run is retried once before the error is
    /// propagated.
    /// Default: true
    pub retry_failed_pipeline: bool,

    /// Storage bookkeeping columns that are never candidate attributes.
    /// Default: ["_id"]
    pub ignored_attributes: Vec<String>,
}

impl Default for InquiryConfig {
    fn default() -> Self {
        Self {
            default_strategy: StrategyKind::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            pipeline_timeout_ms: None,
            retry_failed_pipeline: true,
            ignored_attributes: vec!["_id".to_string()],
        }
    }
}

impl InquiryConfig {
    /// Create a new configuration builder.
    pub fn builder() -> InquiryConfigBuilder {
        InquiryConfigBuilder::default()
    }

    /// The pipeline time budget as a [`Duration`].
    pub fn pipeline_timeout(&self) -> Option<Duration> {
        self.pipeline_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_depth == 0 {
            return Err(ConfigValidationError::InvalidMaxDepth(self.max_depth));
        }

        if self.workers == 0 {
            return Err(ConfigValidationError::InvalidWorkers(self.workers));
        }

        if self.pipeline_timeout_ms == Some(0) {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid max depth: {0} (must be at least 1)")]
    InvalidMaxDepth(usize),

    #[error("Invalid worker count: {0} (must be at least 1)")]
    InvalidWorkers(usize),

    #[error("Invalid pipeline timeout: must be greater than 0 ms")]
    InvalidTimeout,
}

/// Builder for [`InquiryConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct InquiryConfigBuilder {
    default_strategy: Option<StrategyKind>,
    max_depth: Option<usize>,
    workers: Option<usize>,
    pipeline_timeout_ms: Option<u64>,
    retry_failed_pipeline: Option<bool>,
    ignored_attributes: Option<Vec<String>>,
}

impl InquiryConfigBuilder {
    /// Set the strategy used when the caller does not pick one.
    pub fn default_strategy(mut self, strategy: StrategyKind) -> Self {
        self.default_strategy = Some(strategy);
        self
    }

    /// Set the maximum question depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the number of aggregation worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set a time budget for each aggregation pipeline run.
    pub fn pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Enable or disable the single retry of a failed pipeline run.
    pub fn retry_failed_pipeline(mut self, retry: bool) -> Self {
        self.retry_failed_pipeline = Some(retry);
        self
    }

    /// Replace the list of ignored bookkeeping attributes.
    pub fn ignored_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `InquiryConfig` or an error if validation fails.
    pub fn build(self) -> Result<InquiryConfig, ConfigValidationError> {
        let defaults = InquiryConfig::default();
        let config = InquiryConfig {
            default_strategy: self.default_strategy.unwrap_or_default(),
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            pipeline_timeout_ms: self.pipeline_timeout_ms,
            retry_failed_pipeline: self.retry_failed_pipeline.unwrap_or(true),
            ignored_attributes: self
                .ignored_attributes
                .unwrap_or(defaults.ignored_attributes),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InquiryConfig::default();
        assert_eq!(config.default_strategy, StrategyKind::InformationGain);
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.workers, 4);
        assert!(config.retry_failed_pipeline);
        assert_eq!(config.ignored_attributes, vec!["_id".to_string()]);
        assert!(config.pipeline_timeout().is_none());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = InquiryConfig::builder()
            .default_strategy(StrategyKind::GainRatioDistributed)
            .max_depth(5)
            .workers(2)
            .pipeline_timeout(Duration::from_millis(1500))
            .retry_failed_pipeline(false)
            .ignored_attributes(["_id", "image"])
            .build()
            .unwrap();

        assert_eq!(config.default_strategy, StrategyKind::GainRatioDistributed);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.workers, 2);
        assert_eq!(config.pipeline_timeout(), Some(Duration::from_millis(1500)));
        assert!(!config.retry_failed_pipeline);
        assert_eq!(config.ignored_attributes.len(), 2);
    }

    #[test]
    fn test_validation_invalid_depth() {
        let result = InquiryConfig::builder().max_depth(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMaxDepth(0)
        ));
    }

    #[test]
    fn test_validation_invalid_workers() {
        let result = InquiryConfig::builder().workers(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidWorkers(0)
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "default_strategy": "gini_impurity_distributed",
            "workers": 6,
            "pipeline_timeout_ms": 250
        }"#;

        let config: InquiryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.default_strategy,
            StrategyKind::GiniImpurityDistributed
        );
        assert_eq!(config.workers, 6);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.pipeline_timeout(), Some(Duration::from_millis(250)));
        assert!(config.validate().is_ok());
    }
}
