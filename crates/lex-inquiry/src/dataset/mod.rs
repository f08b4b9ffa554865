//! Candidate records, session history and the tabular dataset view.

mod record;
mod view;

pub use record::{AttributeValue, History, Question, Record};
pub use view::DatasetView;
