//! Error types for the attribute-selection engine.
//!
//! This module provides the crate-wide error hierarchy using `thiserror`.
//! Errors are serializable so an API layer can forward them to clients
//! as `{ "code", "message" }` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for guessing sessions.
#[derive(Error, Debug)]
pub enum InquiryError {
    /// An attribute was requested that is not part of the dataset schema.
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    /// No candidate entity matches the answers given so far.
    #[error("No candidate matches the {depth} answered question(s)")]
    EmptyCandidateSet { depth: usize },

    /// The requested strategy name does not map to a known strategy.
    #[error("Unknown strategy '{0}'")]
    UnknownStrategy(String),

    /// An aggregation pipeline stage failed; the whole run is discarded.
    #[error("Aggregation stage '{stage}' failed: {reason}")]
    ComputationFailed { stage: String, reason: String },

    /// The aggregation pipeline exceeded its time budget.
    #[error("Aggregation pipeline timed out after {elapsed_ms} ms (at stage '{stage}')")]
    PipelineTimeout { stage: String, elapsed_ms: u128 },

    /// A session operation was called in the wrong state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// An answer was given that is not one of the offered values.
    #[error("Answer '{answer}' is not a valid value for '{attribute}'")]
    InvalidAnswer { attribute: String, answer: String },

    /// The knowledge store could not serve a request.
    #[error("Knowledge store error: {0}")]
    KnowledgeStore(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g., background task join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InquiryError>,
    },
}

/// Coarse classification used by calling layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Nothing matches the request (e.g. contradictory answers).
    NotFound,
    /// The caller sent something unusable.
    BadRequest,
    /// A fault inside the engine or its collaborators.
    Internal,
}

impl InquiryError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InquiryError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get the stable error code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAttribute(_) => "INVALID_ATTRIBUTE",
            Self::EmptyCandidateSet { .. } => "EMPTY_CANDIDATE_SET",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::ComputationFailed { .. } => "COMPUTATION_FAILED",
            Self::PipelineTimeout { .. } => "PIPELINE_TIMEOUT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidAnswer { .. } => "INVALID_ANSWER",
            Self::KnowledgeStore(_) => "KNOWLEDGE_STORE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Map the error to the class an API layer should report.
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::EmptyCandidateSet { .. } => ErrorClass::NotFound,
            Self::UnknownStrategy(_)
            | Self::InvalidConfig(_)
            | Self::InvalidState(_)
            | Self::InvalidAnswer { .. } => ErrorClass::BadRequest,
            Self::WithContext { source, .. } => source.error_class(),
            _ => ErrorClass::Internal,
        }
    }

    /// Check if this error came out of the aggregation pipeline.
    ///
    /// Pipeline failures are all-or-nothing, so the orchestrator may rerun
    /// the whole computation once.
    pub fn is_pipeline_failure(&self) -> bool {
        match self {
            Self::ComputationFailed { .. } | Self::PipelineTimeout { .. } => true,
            Self::WithContext { source, .. } => source.is_pipeline_failure(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for InquiryError {
    fn from(err: ConfigValidationError) -> Self {
        InquiryError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for InquiryError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InquiryError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InquiryError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InquiryError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, serde_json::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InquiryError::Json(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            InquiryError::EmptyCandidateSet { depth: 3 }.error_code(),
            "EMPTY_CANDIDATE_SET"
        );
        assert_eq!(
            InquiryError::UnknownStrategy("c50".to_string()).error_code(),
            "UNKNOWN_STRATEGY"
        );
    }

    #[test]
    fn test_error_class() {
        assert_eq!(
            InquiryError::EmptyCandidateSet { depth: 1 }.error_class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            InquiryError::UnknownStrategy("x".to_string()).error_class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            InquiryError::InvalidAttribute("x".to_string()).error_class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_pipeline_failure_detection() {
        let failed = InquiryError::ComputationFailed {
            stage: "counting".to_string(),
            reason: "worker panicked".to_string(),
        };
        assert!(failed.is_pipeline_failure());
        assert!(failed.with_context("turn 4").is_pipeline_failure());
        assert!(!InquiryError::EmptyCandidateSet { depth: 0 }.is_pipeline_failure());
    }

    #[test]
    fn test_error_serialization() {
        let error = InquiryError::InvalidAttribute("color".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("INVALID_ATTRIBUTE"));
        assert!(json.contains("color"));
    }

    #[test]
    fn test_with_context() {
        let error =
            InquiryError::EmptyCandidateSet { depth: 2 }.with_context("During turn evaluation");
        assert!(error.to_string().contains("During turn evaluation"));
        assert_eq!(error.error_code(), "EMPTY_CANDIDATE_SET");
        assert_eq!(error.error_class(), ErrorClass::NotFound);
    }
}
