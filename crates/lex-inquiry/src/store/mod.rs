//! Knowledge store contract.
//!
//! The orchestrator only needs three queries from the store that holds the
//! candidate entities. Stores are shared across sessions and threads.

mod memory;

pub use memory::InMemoryKnowledgeStore;

use crate::dataset::{History, Record};
use crate::error::Result;

pub trait KnowledgeStore: Send + Sync {
    /// Records consistent with every answered question in `history`.
    ///
    /// Records that lack an answered attribute entirely are kept. Every asked
    /// attribute other than the target is removed from the returned records.
    fn candidate_section(&self, history: &History) -> Result<Vec<Record>>;

    /// Name of the attribute that identifies an entity.
    fn target_field(&self) -> Result<String>;

    /// Reference vocabulary of an attribute, for presentation only.
    fn attribute_values(&self, attribute: &str) -> Result<Vec<String>>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "knowledge-store"
    }
}
