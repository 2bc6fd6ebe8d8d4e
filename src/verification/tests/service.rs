use std::sync::Arc;

use super::common::*;
use crate::verification::domain::{PatientId, Recommendation};
use crate::verification::retrieval::RetrievalError;
use crate::verification::service::{AssessmentError, ClaimVerificationService};
use crate::verification::stores::ReferenceStores;

#[tokio::test]
async fn clean_claim_is_assessed_end_to_end() {
    let service = build_service(&clean_document(), StubScorer::approving(), demo_data());

    let report = service
        .assess("bafy-claim-001", &rohan_id())
        .await
        .expect("assessment succeeds");

    assert_eq!(report.recommendation, Recommendation::Approve);
    assert_eq!(report.rule_score, 0);
    assert!(report.red_flags.is_empty());
    assert!(!report.narrative.is_empty());
    assert_eq!(report.signals.total_amount, 1450.0);
    assert_eq!(report.signals.provider_name, "PUNE RESPIRATORY CLINIC");
}

#[tokio::test]
async fn clean_claim_is_approved_even_when_the_scorer_is_down() {
    let service = build_service(&clean_document(), StubScorer::Unavailable, demo_data());

    let report = service
        .assess("bafy-claim-002", &rohan_id())
        .await
        .expect("assessment succeeds");

    assert_eq!(report.recommendation, Recommendation::Approve);
    assert!(report.aggregate_score <= 30);
}

#[tokio::test]
async fn hard_rule_failure_rejects_despite_an_approving_scorer() {
    let document = clean_document().replace("Bill Date: 12-08-2025", "Bill Date: 10-07-2024");
    let service = build_service(&document, StubScorer::approving(), demo_data());

    let report = service
        .assess("bafy-claim-003", &rohan_id())
        .await
        .expect("assessment succeeds");

    assert_eq!(report.recommendation, Recommendation::Reject);
    assert!(report.aggregate_score >= 85);
    assert!(report
        .reasoning
        .starts_with("[AUTO-REJECTED due to hard rule failure]"));
    assert!(report.rule_score >= 100);
}

#[tokio::test]
async fn unknown_patient_is_reported_as_missing_profile() {
    let service = build_service(&clean_document(), StubScorer::approving(), demo_data());

    let result = service
        .assess("bafy-claim-004", &PatientId("000000000000".to_string()))
        .await;

    match result {
        Err(AssessmentError::ProfileNotFound(id)) => assert_eq!(id.0, "000000000000"),
        other => panic!("expected missing profile error, got {other:?}"),
    }
}

#[tokio::test]
async fn retrieval_failures_propagate() {
    let stores = ReferenceStores::from_memory(demo_data());
    let service = ClaimVerificationService::new(
        Arc::new(OfflineDocumentSource),
        Arc::new(StubScorer::approving()),
        stores,
        standard_engine(),
    )
    .expect("service builds");

    let result = service.assess("bafy-claim-005", &rohan_id()).await;

    match result {
        Err(AssessmentError::Retrieval(RetrievalError::NotAvailable(_))) => {}
        other => panic!("expected retrieval error, got {other:?}"),
    }
}
