//! Client-side session state machine.
//!
//! ```text
//! AwaitingQuestion --next_step--> AwaitingAnswer --answer--> AwaitingQuestion
//!        |                                                       ...
//!        +--next_step--> Terminated(guess)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::dataset::{History, Question};
use crate::error::{InquiryError, Result};
use crate::resolver::GuessReason;
use crate::session::dto::Decision;
use crate::session::orchestrator::SessionOrchestrator;
use crate::strategies::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingQuestion,
    AwaitingAnswer {
        attribute: String,
        values: Vec<String>,
    },
    Terminated {
        guess: String,
        reason: GuessReason,
    },
}

/// One guessing game, holding its own history.
pub struct Session {
    orchestrator: Arc<SessionOrchestrator>,
    strategy: StrategyKind,
    max_depth: usize,
    history: History,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session with the orchestrator's default strategy and depth.
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        let config = orchestrator.config();
        let (strategy, max_depth) = (config.default_strategy, config.max_depth);
        Self {
            orchestrator,
            strategy,
            max_depth,
            history: History::new(),
            state: SessionState::AwaitingQuestion,
            started_at: Utc::now(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Terminated { .. })
    }

    pub fn guess(&self) -> Option<&str> {
        match &self.state {
            SessionState::Terminated { guess, .. } => Some(guess),
            _ => None,
        }
    }

    /// Ask the orchestrator for the next question or the final guess.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::InvalidState`] unless a question is due.
    /// Orchestrator errors leave the state unchanged.
    pub fn next_step(&mut self) -> Result<&SessionState> {
        match &self.state {
            SessionState::AwaitingQuestion => {}
            SessionState::AwaitingAnswer { attribute, .. } => {
                return Err(InquiryError::InvalidState(format!(
                    "an answer to '{}' is pending",
                    attribute
                )));
            }
            SessionState::Terminated { guess, .. } => {
                return Err(InquiryError::InvalidState(format!(
                    "session already ended with guess '{}'",
                    guess
                )));
            }
        }

        let decision =
            self.orchestrator
                .decide_next_step(&self.history, self.strategy, self.max_depth)?;
        self.state = match decision {
            Decision::Question { question, values } => SessionState::AwaitingAnswer {
                attribute: question,
                values,
            },
            Decision::Guess { guess, reason } => SessionState::Terminated { guess, reason },
        };
        Ok(&self.state)
    }

    /// Record the answer to the pending question; `None` means unknown.
    ///
    /// # Errors
    ///
    /// - [`InquiryError::InvalidState`] if no question is pending
    /// - [`InquiryError::InvalidAnswer`] if the answer was not offered
    pub fn answer(&mut self, answer: Option<String>) -> Result<()> {
        let SessionState::AwaitingAnswer { attribute, values } = &self.state else {
            return Err(InquiryError::InvalidState(
                "no question is awaiting an answer".to_string(),
            ));
        };

        let question = match answer {
            Some(answer) if !values.contains(&answer) => {
                return Err(InquiryError::InvalidAnswer {
                    attribute: attribute.clone(),
                    answer,
                });
            }
            Some(answer) => Question::answered(attribute.clone(), answer),
            None => Question::unknown(attribute.clone()),
        };

        debug!("Answer recorded: {:?}", question);
        self.history.push(question);
        self.state = SessionState::AwaitingQuestion;
        Ok(())
    }
}
