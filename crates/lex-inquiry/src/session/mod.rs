//! Session orchestration: per-turn decisions and the session state machine.

mod dto;
mod orchestrator;
mod state;

pub use dto::{Decision, GuessRequest};
pub use orchestrator::{SessionOrchestrator, SessionOrchestratorBuilder};
pub use state::{Session, SessionState};
