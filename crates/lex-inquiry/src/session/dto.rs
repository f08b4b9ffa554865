//! Request and response shapes for an API layer.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::dataset::History;
use crate::error::Result;
use crate::resolver::GuessReason;
use crate::strategies::StrategyKind;

/// Outcome of one turn.
///
/// Serializes as `{"question": .., "values": [..]}` or
/// `{"guess": .., "reason": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decision {
    Question {
        question: String,
        values: Vec<String>,
    },
    Guess {
        guess: String,
        reason: GuessReason,
    },
}

impl Decision {
    pub fn question(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::Question {
            question: attribute.into(),
            values,
        }
    }

    pub fn guess(label: impl Into<String>, reason: GuessReason) -> Self {
        Self::Guess {
            guess: label.into(),
            reason,
        }
    }

    pub fn is_guess(&self) -> bool {
        matches!(self, Self::Guess { .. })
    }

    pub fn guess_label(&self) -> Option<&str> {
        match self {
            Self::Guess { guess, .. } => Some(guess),
            Self::Question { .. } => None,
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Body of a guessing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRequest {
    #[serde(default)]
    pub questions: History,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Strategy name; the orchestrator default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl GuessRequest {
    pub fn new(questions: History) -> Self {
        Self {
            questions,
            max_depth: DEFAULT_MAX_DEPTH,
            strategy: None,
        }
    }

    /// Resolve the requested strategy, falling back to `default`.
    pub fn strategy_kind(&self, default: StrategyKind) -> Result<StrategyKind> {
        match &self.strategy {
            Some(name) => name.parse(),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Question;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decision_json_shapes() {
        let question = Decision::question("color", vec!["red".to_string(), "blue".to_string()]);
        assert_eq!(
            serde_json::to_value(&question).unwrap(),
            serde_json::json!({"question": "color", "values": ["red", "blue"]})
        );

        let guess = Decision::guess("dog", GuessReason::SingleClass);
        assert_eq!(
            serde_json::to_value(&guess).unwrap(),
            serde_json::json!({"guess": "dog", "reason": "single_class"})
        );

        let parsed: Decision =
            serde_json::from_str(r#"{"guess": "cat", "reason": "depth_limit"}"#).unwrap();
        assert_eq!(parsed.guess_label(), Some("cat"));
        assert!(parsed.is_guess());
    }

    #[test]
    fn test_request_defaults() {
        let request: GuessRequest = serde_json::from_str(
            r#"{"questions": [{"name": "legs", "answer": "4"}, {"name": "fur"}]}"#,
        )
        .unwrap();
        assert_eq!(request.max_depth, 20);
        assert_eq!(
            request.questions,
            History::from(vec![Question::answered("legs", "4"), Question::unknown("fur")])
        );
        assert_eq!(
            request.strategy_kind(StrategyKind::GiniImpurity).unwrap(),
            StrategyKind::GiniImpurity
        );
    }

    #[test]
    fn test_request_strategy_parsing() {
        let mut request = GuessRequest::new(History::new());
        request.strategy = Some("c45_mr".to_string());
        assert_eq!(
            request.strategy_kind(StrategyKind::default()).unwrap(),
            StrategyKind::GainRatioDistributed
        );

        request.strategy = Some("neural".to_string());
        assert_eq!(
            request.strategy_kind(StrategyKind::default()).unwrap_err().error_code(),
            "UNKNOWN_STRATEGY"
        );
    }
}
