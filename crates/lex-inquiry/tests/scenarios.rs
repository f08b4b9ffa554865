//! End-to-end decision scenarios through the session orchestrator.

use lex_inquiry::{
    AttributeValue, Decision, GuessReason, History, InMemoryKnowledgeStore, InquiryError, Question,
    Record, SessionOrchestrator, StrategyKind,
};
use lex_inquiry::strategies::information_gain;
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn orchestrator(records: Vec<Record>) -> SessionOrchestrator {
    let store = InMemoryKnowledgeStore::new(records, "cls").expect("valid store");
    SessionOrchestrator::builder()
        .store(Arc::new(store))
        .build()
        .expect("orchestrator builds")
}

fn color_size_rows() -> Vec<Record> {
    vec![
        Record::new().with("color", "red").with("size", "big").with("cls", "X"),
        Record::new().with("color", "red").with("size", "small").with("cls", "X"),
        Record::new().with("color", "blue").with("size", "big").with("cls", "Y"),
    ]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_information_gain_prefers_separating_attribute() {
    let orchestrator = orchestrator(color_size_rows());

    for strategy in [StrategyKind::InformationGain, StrategyKind::InformationGainDistributed] {
        let decision = orchestrator
            .decide_next_step(&History::new(), strategy, 20)
            .unwrap();
        assert_eq!(decision, Decision::question("color", strings(&["red", "blue"])));
    }
}

#[test]
fn test_single_class_guesses_without_strategy() {
    let rows = vec![
        Record::new().with("color", "red").with("cls", "X"),
        Record::new().with("color", "blue").with("cls", "X"),
        Record::new().with("color", "green").with("cls", "X"),
    ];
    let orchestrator = orchestrator(rows);

    for strategy in StrategyKind::all() {
        let decision = orchestrator
            .decide_next_step(&History::new(), strategy, 20)
            .unwrap();
        assert_eq!(decision, Decision::guess("X", GuessReason::SingleClass));
    }
}

#[test]
fn test_contradictory_answers_are_an_error() {
    let orchestrator = orchestrator(color_size_rows());
    let history: History = vec![Question::answered("color", "green")].into();

    let err = orchestrator
        .decide_next_step(&history, StrategyKind::GainRatio, 20)
        .unwrap_err();
    assert!(matches!(err, InquiryError::EmptyCandidateSet { depth: 1 }));
    assert_eq!(err.error_code(), "EMPTY_CANDIDATE_SET");
}

#[test]
fn test_depth_limit_forces_majority_guess() {
    let rows = vec![
        Record::new().with("a", "1").with("size", "s").with("cls", "Y"),
        Record::new().with("a", "2").with("size", "m").with("cls", "X"),
        Record::new().with("a", "3").with("size", "l").with("cls", "X"),
        Record::new().with("a", "4").with("size", "s").with("cls", "X"),
    ];
    let orchestrator = orchestrator(rows);
    let history: History = vec![Question::unknown("size")].into();

    let decision = orchestrator
        .decide_next_step(&history, StrategyKind::GiniImpurity, 1)
        .unwrap();
    assert_eq!(decision, Decision::guess("X", GuessReason::DepthLimit));
}

#[test]
fn test_unknown_cells_are_scored_attribute_locally() {
    let rows = vec![
        Record::new().with("a", "p").with("b", "1").with("cls", "X"),
        Record::new().with("a", "p").with("b", "2").with("cls", "X"),
        Record::new().with("a", "q").with("b", "1").with("cls", "Y"),
        Record::new().with("a", AttributeValue::Unknown).with("b", "2").with("cls", "Y"),
        Record::new().with("a", AttributeValue::Unknown).with("b", "1").with("cls", "Y"),
    ];
    let store = InMemoryKnowledgeStore::new(rows, "cls").unwrap();
    let orchestrator = SessionOrchestrator::builder()
        .store(Arc::new(store))
        .build()
        .unwrap();
    let view = orchestrator.candidate_view(&History::new()).unwrap();

    // Entropy of (X, X, Y) over the three known rows, split perfectly.
    let gain = information_gain(&view, "a").unwrap().unwrap();
    let expected = -(2.0 / 3.0 * (2.0f64 / 3.0).log2() + 1.0 / 3.0 * (1.0f64 / 3.0).log2());
    assert!((gain - expected).abs() < 1e-9, "gain {} != {}", gain, expected);

    let decision = orchestrator.decide(&History::new()).unwrap();
    assert_eq!(decision, Decision::question("a", strings(&["p", "q"])));
}

#[test]
fn test_unknown_answer_does_not_filter() {
    let orchestrator = orchestrator(color_size_rows());
    let history: History = vec![Question::unknown("color")].into();

    let view = orchestrator.candidate_view(&history).unwrap();
    assert_eq!(view.height(), 3);
    assert_eq!(view.candidate_attributes(), strings(&["size"]));

    let decision = orchestrator
        .decide_next_step(&history, StrategyKind::InformationGain, 20)
        .unwrap();
    assert_eq!(decision, Decision::question("size", strings(&["big", "small"])));
}

#[test]
fn test_absent_attribute_never_excludes_a_row() {
    let rows = vec![
        Record::new().with("wings", "yes").with("legs", "2").with("cls", "bird"),
        Record::new().with("legs", "4").with("cls", "dog"),
        Record::new().with("wings", "no").with("legs", "4").with("cls", "cat"),
    ];
    let orchestrator = orchestrator(rows);
    let history: History = vec![Question::answered("wings", "no")].into();

    let view = orchestrator.candidate_view(&history).unwrap();
    assert_eq!(view.target_values().unwrap(), vec!["dog", "cat"]);

    // Both remaining rows share `legs`, so nothing discriminates them.
    let decision = orchestrator.decide(&history).unwrap();
    assert_eq!(
        decision,
        Decision::guess("dog", GuessReason::NoDiscriminatingAttributes)
    );
}

#[test]
fn test_request_with_unknown_strategy_is_rejected() {
    let orchestrator = orchestrator(color_size_rows());
    let request = serde_json::from_str(r#"{"questions": [], "strategy": "random_forest"}"#).unwrap();

    let err = orchestrator.handle_request(&request).unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_STRATEGY");
}

#[test]
fn test_request_round_trip_as_json() {
    let orchestrator = orchestrator(color_size_rows());
    let request = serde_json::from_str(
        r#"{"questions": [{"name": "color", "answer": "red"}], "strategy": "gini_mr"}"#,
    )
    .unwrap();

    let decision = orchestrator.handle_request(&request).unwrap();
    assert_eq!(
        serde_json::to_value(&decision).unwrap(),
        serde_json::json!({"guess": "X", "reason": "single_class"})
    );
}

#[test]
fn test_empty_answer_is_treated_as_unknown() {
    let orchestrator = orchestrator(color_size_rows());
    let request = serde_json::from_str(r#"{"questions": [{"name": "color", "answer": ""}]}"#).unwrap();

    let decision = orchestrator.handle_request(&request).unwrap();
    assert_eq!(decision, Decision::question("size", strings(&["big", "small"])));
}
