//! Termination checks run before any strategy.
//!
//! The resolver decides whether the candidate set already determines a final
//! guess: a single remaining class, no candidate attributes left, or no
//! attribute that still tells rows apart.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::DatasetView;
use crate::error::{InquiryError, Result};

/// Why a guess was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessReason {
    /// Every candidate shares one target value.
    SingleClass,
    /// Only the target column is left.
    NoAttributes,
    /// No candidate attribute has two distinct known values.
    NoDiscriminatingAttributes,
    /// The question-depth bound was reached.
    DepthLimit,
    /// The strategy could not score any attribute.
    NoSplit,
    /// The chosen attribute offered fewer than two answers.
    DegenerateSplit,
}

impl GuessReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::SingleClass => "single remaining class",
            Self::NoAttributes => "no attributes left to ask",
            Self::NoDiscriminatingAttributes => "no attribute separates the candidates",
            Self::DepthLimit => "question limit reached",
            Self::NoSplit => "no attribute could be scored",
            Self::DegenerateSplit => "best attribute has a single answer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Guess { label: String, reason: GuessReason },
    Undecided,
}

/// Check the three termination rules in order.
pub fn resolve(view: &DatasetView) -> Result<Resolution> {
    let distribution = view.target_distribution()?;
    if let [(label, _)] = distribution.as_slice() {
        debug!("Single class '{}' remains", label);
        return Ok(Resolution::Guess {
            label: label.clone(),
            reason: GuessReason::SingleClass,
        });
    }

    let attributes = view.candidate_attributes();
    if attributes.is_empty() {
        return Ok(Resolution::Guess {
            label: majority_of(&distribution)?,
            reason: GuessReason::NoAttributes,
        });
    }

    for attribute in &attributes {
        if view.known_values(attribute)?.len() > 1 {
            return Ok(Resolution::Undecided);
        }
    }

    Ok(Resolution::Guess {
        label: majority_of(&distribution)?,
        reason: GuessReason::NoDiscriminatingAttributes,
    })
}

/// Modal target value; ties go to the label seen first.
pub fn majority_label(view: &DatasetView) -> Result<String> {
    majority_of(&view.target_distribution()?)
}

fn majority_of(distribution: &[(String, usize)]) -> Result<String> {
    let mut best: Option<&(String, usize)> = None;
    for entry in distribution {
        if best.is_none_or(|(_, count)| entry.1 > *count) {
            best = Some(entry);
        }
    }
    best.map(|(label, _)| label.clone())
        .ok_or_else(|| InquiryError::Internal("majority vote over an empty candidate set".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeValue, Record};

    fn view(records: Vec<Record>) -> DatasetView {
        DatasetView::from_records(&records, "cls", &[]).unwrap()
    }

    #[test]
    fn test_single_class() {
        let view = view(vec![
            Record::new().with("a", "1").with("cls", "X"),
            Record::new().with("a", "2").with("cls", "X"),
        ]);
        assert_eq!(
            resolve(&view).unwrap(),
            Resolution::Guess {
                label: "X".to_string(),
                reason: GuessReason::SingleClass
            }
        );
    }

    #[test]
    fn test_no_attributes_uses_majority() {
        let view = view(vec![
            Record::new().with("cls", "Y"),
            Record::new().with("cls", "X"),
            Record::new().with("cls", "X"),
        ]);
        assert_eq!(
            resolve(&view).unwrap(),
            Resolution::Guess {
                label: "X".to_string(),
                reason: GuessReason::NoAttributes
            }
        );
    }

    #[test]
    fn test_constant_columns_use_majority() {
        let view = view(vec![
            Record::new().with("a", "1").with("b", AttributeValue::Unknown).with("cls", "X"),
            Record::new().with("a", "1").with("b", "z").with("cls", "Y"),
            Record::new().with("a", "1").with("cls", "Y"),
        ]);
        assert_eq!(
            resolve(&view).unwrap(),
            Resolution::Guess {
                label: "Y".to_string(),
                reason: GuessReason::NoDiscriminatingAttributes
            }
        );
    }

    #[test]
    fn test_undecided_when_an_attribute_varies() {
        let view = view(vec![
            Record::new().with("a", "1").with("cls", "X"),
            Record::new().with("a", "2").with("cls", "Y"),
        ]);
        assert_eq!(resolve(&view).unwrap(), Resolution::Undecided);
    }

    #[test]
    fn test_majority_tie_keeps_first_label() {
        let view = view(vec![
            Record::new().with("cls", "B"),
            Record::new().with("cls", "A"),
            Record::new().with("cls", "A"),
            Record::new().with("cls", "B"),
        ]);
        assert_eq!(majority_label(&view).unwrap(), "B");
    }

    #[test]
    fn test_majority_of_empty_view_fails() {
        let view = view(Vec::new());
        assert!(majority_label(&view).is_err());
    }
}
