use std::sync::Arc;

use chrono::NaiveDate;

use super::common::*;
use crate::verification::domain::RuleOutcome;
use crate::verification::extraction::SignalExtractor;
use crate::verification::rules::{Rule, RuleContext, RuleEngine, RuleError};
use crate::verification::stores::{
    LicenseRecord, LicenseStatus, MemoryReferenceData, PriorClaim, ReferenceStores,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 12).expect("valid date")
}

fn run_rules(document: &str, data: Arc<MemoryReferenceData>) -> RuleOutcome {
    let profile = rohan_profile(&data);
    let extractor = SignalExtractor::new().expect("patterns compile");
    let (text, signals) = extractor
        .extract(document.as_bytes(), &profile, today())
        .expect("document has text");
    let stores = ReferenceStores::from_memory(data);
    let engine = standard_engine();
    engine.run(&RuleContext {
        document: &text,
        signals: &signals,
        profile: &profile,
        stores: &stores,
        today: today(),
    })
}

#[test]
fn clean_claim_passes_every_check() {
    let outcome = run_rules(&clean_document(), demo_data());

    assert_eq!(outcome.score(), 0, "flags: {:?}", outcome.flags());
    assert!(outcome.flags().is_empty());
    assert!(!outcome.hard_failure());
    assert!(!outcome.narrative().is_empty());
}

#[test]
fn identity_mismatch_is_a_hard_failure() {
    let document = clean_document().replace("Rohan Mehta", "Ravi Kumar");
    let outcome = run_rules(&document, demo_data());

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.starts_with("Identity Fail")));
    assert!(outcome.score() >= 70);
    assert!(outcome.hard_failure());
}

#[test]
fn implausible_age_for_diagnosis_is_flagged() {
    let document = clean_document()
        .replace(
            "Primary Diagnosis: Asthma",
            "Primary Diagnosis: Juvenile Idiopathic Arthritis",
        )
        .replace(
            "Diagnosis: J45 - Asthma",
            "Diagnosis: M08 - Juvenile Idiopathic Arthritis",
        );
    let outcome = run_rules(&document, demo_data());

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.contains("Logic Fail (Age-Disease)")));
    assert!(outcome.score() >= 40);
    assert!(outcome.hard_failure());
}

#[test]
fn claim_inside_waiting_period_is_a_hard_failure() {
    let document = clean_document().replace("Bill Date: 12-08-2025", "Bill Date: 10-07-2024");
    let outcome = run_rules(&document, demo_data());

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.starts_with("Policy Fail")));
    assert!(outcome.score() >= 100);
    assert!(outcome.hard_failure());
}

#[test]
fn duplicate_fingerprint_is_a_hard_failure() {
    let data = demo_data();
    let fingerprint = crate::verification::extraction::fingerprint(clean_document().as_bytes());
    data.insert_duplicate(fingerprint);

    let outcome = run_rules(&clean_document(), data);

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.starts_with("Authenticity Fail (Duplicate)")));
    assert!(outcome.score() >= 100);
    assert!(outcome.hard_failure());
}

#[test]
fn suspended_practitioner_license_is_flagged_hard() {
    let data = demo_data();
    data.insert_license(
        "MH-MC-00001",
        LicenseRecord {
            practitioner: "Dr. S. Rao".to_string(),
            status: LicenseStatus::Suspended,
        },
    );
    let document =
        clean_document().replace("Registration ID: MH-MC-54321", "Registration ID: MH-MC-00001");

    let outcome = run_rules(&document, data);

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.contains("SUSPENDED")));
    assert!(outcome.score() >= 50);
    assert!(outcome.hard_failure());
}

#[test]
fn unverifiable_practitioner_license_is_a_soft_warning() {
    let document =
        clean_document().replace("Registration ID: MH-MC-54321", "Registration ID: XX-99999");
    let outcome = run_rules(&document, demo_data());

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.contains("could not be verified")));
    assert!(!outcome.hard_failure());
}

#[test]
fn unknown_provider_is_a_soft_warning() {
    let document =
        clean_document().replace("PUNE RESPIRATORY CLINIC", "RIVERDALE RESPIRATORY CLINIC");
    let outcome = run_rules(&document, demo_data());

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.contains("not found in the risk registry")));
    assert!(!outcome.hard_failure());
}

#[test]
fn burst_of_recent_claims_is_flagged() {
    let data = demo_data();
    data.insert_claim(
        rohan_id(),
        PriorClaim {
            claim_date: NaiveDate::from_ymd_opt(2025, 8, 20).expect("valid date"),
            amount: 2000.0,
        },
    );
    let document = clean_document().replace("Bill Date: 12-08-2025", "Bill Date: 12-09-2025");

    let outcome = run_rules(&document, data);

    assert!(outcome
        .flags()
        .iter()
        .any(|flag| flag.starts_with("History Risk: high claim frequency")));
}

struct ExplodingRule;

impl Rule for ExplodingRule {
    fn name(&self) -> &'static str {
        "exploding_rule"
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>, _outcome: &mut RuleOutcome) -> Result<(), RuleError> {
        Err(RuleError::Evaluation("reference data corrupt".to_string()))
    }
}

struct QuietRule;

impl Rule for QuietRule {
    fn name(&self) -> &'static str {
        "quiet_rule"
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>, outcome: &mut RuleOutcome) -> Result<(), RuleError> {
        outcome.note("Analysis (quiet_rule): nothing to report.");
        Ok(())
    }
}

#[test]
fn failing_rules_cost_a_fixed_penalty_and_never_abort_the_run() {
    let data = demo_data();
    let profile = rohan_profile(&data);
    let extractor = SignalExtractor::new().expect("patterns compile");
    let document = clean_document();
    let (text, signals) = extractor
        .extract(document.as_bytes(), &profile, today())
        .expect("document has text");
    let stores = ReferenceStores::from_memory(data);

    let engine = RuleEngine::with_catalog(
        vec![
            Box::new(ExplodingRule),
            Box::new(QuietRule),
            Box::new(ExplodingRule),
        ],
        5,
    );
    let outcome = engine.run(&RuleContext {
        document: &text,
        signals: &signals,
        profile: &profile,
        stores: &stores,
        today: today(),
    });

    assert_eq!(outcome.score(), 10);
    assert!(outcome.flags().is_empty());
    let failures = outcome
        .narrative()
        .iter()
        .filter(|entry| entry.contains("failed with error"))
        .count();
    assert_eq!(failures, 2);
    assert!(outcome
        .narrative()
        .iter()
        .any(|entry| entry.contains("nothing to report")));
}
