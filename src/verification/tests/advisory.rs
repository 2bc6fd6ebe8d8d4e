use super::common::*;
use crate::verification::advisory::{arbitrate, parse_verdict, AdvisoryError};
use crate::verification::domain::{
    AdvisoryVerdict, ExtractedSignals, Recommendation, RuleOutcome,
};

fn signals() -> ExtractedSignals {
    ExtractedSignals::new("0f".repeat(32))
}

fn flagged_outcome(points: u32, flag: &str) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();
    outcome.penalize(points, flag);
    outcome
}

#[tokio::test]
async fn approve_score_outside_band_is_clamped_to_band_midpoint() {
    let scorer = StubScorer::Fixed(AdvisoryVerdict {
        score: 90,
        recommendation: Recommendation::Approve,
        reasoning: "Looks fine.".to_string(),
    });
    let outcome = RuleOutcome::default();

    let verdict = arbitrate(&scorer, &outcome, &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::Approve);
    assert_eq!(verdict.score, 25);
}

#[tokio::test]
async fn pending_review_score_outside_band_is_clamped() {
    let scorer = StubScorer::Fixed(AdvisoryVerdict {
        score: 5,
        recommendation: Recommendation::PendingReview,
        reasoning: "Some concerns.".to_string(),
    });
    let outcome = flagged_outcome(15, "History Mismatch (Diagnosis): 'flu' not in patient history.");

    let verdict = arbitrate(&scorer, &outcome, &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::PendingReview);
    assert_eq!(verdict.score, 50);
}

#[tokio::test]
async fn in_band_scores_are_preserved() {
    let scorer = StubScorer::Fixed(AdvisoryVerdict {
        score: 42,
        recommendation: Recommendation::PendingReview,
        reasoning: "Borderline.".to_string(),
    });
    let outcome = flagged_outcome(20, "External Warn: provider not found.");

    let verdict = arbitrate(&scorer, &outcome, &signals()).await;

    assert_eq!(verdict.score, 42);
}

#[tokio::test]
async fn hard_failure_overrides_an_approving_verdict() {
    let scorer = StubScorer::Fixed(AdvisoryVerdict {
        score: 10,
        recommendation: Recommendation::Approve,
        reasoning: "Claim appears routine.".to_string(),
    });
    let outcome = flagged_outcome(100, "Policy Fail: claim within 30-day waiting period.");

    let verdict = arbitrate(&scorer, &outcome, &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::Reject);
    assert!(verdict.score >= 85);
    assert!(verdict
        .reasoning
        .starts_with("[AUTO-REJECTED due to hard rule failure]"));
    assert!(verdict.reasoning.contains("Claim appears routine."));
}

#[tokio::test]
async fn unavailable_scorer_falls_back_to_approve_for_clean_outcomes() {
    let verdict = arbitrate(&StubScorer::Unavailable, &RuleOutcome::default(), &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::Approve);
    assert!(verdict.score <= 30);
}

#[tokio::test]
async fn unavailable_scorer_falls_back_to_review_for_flagged_outcomes() {
    let outcome = flagged_outcome(15, "History Mismatch (Diagnosis): 'flu' not in patient history.");

    let verdict = arbitrate(&StubScorer::Unavailable, &outcome, &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::PendingReview);
    assert_eq!(verdict.score, 50);
}

#[tokio::test]
async fn unavailable_scorer_still_rejects_hard_failures() {
    let outcome = flagged_outcome(70, "Identity Fail: Name Mismatch.");

    let verdict = arbitrate(&StubScorer::Unavailable, &outcome, &signals()).await;

    assert_eq!(verdict.recommendation, Recommendation::Reject);
    assert!(verdict.score >= 85);
}

#[test]
fn parse_verdict_accepts_the_documented_schema() {
    let verdict = parse_verdict(
        r#"{"aggregate_score": 55, "recommendation": "PENDING_REVIEW", "reasoning": "Mixed signals."}"#,
    )
    .expect("schema matches");

    assert_eq!(verdict.score, 55);
    assert_eq!(verdict.recommendation, Recommendation::PendingReview);
}

#[test]
fn parse_verdict_accepts_the_spaced_review_label() {
    let verdict = parse_verdict(
        r#"{"aggregate_score": 50, "recommendation": "PENDING REVIEW", "reasoning": "ok"}"#,
    )
    .expect("alias accepted");

    assert_eq!(verdict.recommendation, Recommendation::PendingReview);
}

#[test]
fn parse_verdict_rejects_out_of_range_scores() {
    let result = parse_verdict(
        r#"{"aggregate_score": 150, "recommendation": "REJECT", "reasoning": "bad"}"#,
    );
    assert!(matches!(result, Err(AdvisoryError::Schema(_))));

    let result = parse_verdict(
        r#"{"aggregate_score": -3, "recommendation": "APPROVE", "reasoning": "bad"}"#,
    );
    assert!(matches!(result, Err(AdvisoryError::Schema(_))));
}

#[test]
fn parse_verdict_rejects_unknown_labels_and_malformed_json() {
    let result = parse_verdict(
        r#"{"aggregate_score": 10, "recommendation": "ESCALATE", "reasoning": "bad"}"#,
    );
    assert!(matches!(result, Err(AdvisoryError::Schema(_))));

    assert!(matches!(
        parse_verdict("not json at all"),
        Err(AdvisoryError::Schema(_))
    ));
}
