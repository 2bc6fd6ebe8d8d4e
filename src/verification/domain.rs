use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel provider name used when extraction could not resolve one.
/// Downstream rules key off this value, so it is part of the contract.
pub const UNKNOWN_PROVIDER: &str = "UNKNOWN";

/// Identifier wrapper for patients across every reference store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientId(pub String);

/// A single historical diagnosis on the patient's record. `code` is "N/A"
/// when the upstream registry did not supply one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub code: String,
    pub description: String,
}

/// Known medical profile for a patient, loaded once per assessment and
/// treated as read-only from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient_id: PatientId,
    pub name: String,
    /// Day-first textual date, e.g. "14-03-1985". Kept as text because the
    /// identity rule compares it verbatim against the document.
    pub date_of_birth: String,
    pub address: String,
    pub past_diagnoses: Vec<Diagnosis>,
    pub medications: Vec<String>,
}

/// Structured fields recovered from a claim document. Every field except the
/// fingerprint degrades to its default when extraction finds nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSignals {
    pub total_amount: f64,
    pub age_years: Option<u32>,
    pub bill_date: Option<NaiveDate>,
    pub provider_name: String,
    pub registration_id: Option<String>,
    /// Lower-cased, deduplicated, insertion order preserved so the first
    /// entry can serve as the primary diagnosis.
    pub diagnoses: Vec<String>,
    pub medications: Vec<String>,
    /// Hex SHA-256 of the raw document bytes; always computed.
    pub fingerprint: String,
    /// Reserved for in-patient duration checks; currently never populated.
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
}

impl ExtractedSignals {
    pub fn new(fingerprint: String) -> Self {
        Self {
            total_amount: 0.0,
            age_years: None,
            bill_date: None,
            provider_name: UNKNOWN_PROVIDER.to_string(),
            registration_id: None,
            diagnoses: Vec::new(),
            medications: Vec::new(),
            fingerprint,
            admission_date: None,
            discharge_date: None,
        }
    }

    pub fn primary_diagnosis(&self) -> Option<&str> {
        self.diagnoses.first().map(String::as_str)
    }
}

/// Running aggregate for one rule engine invocation. The score field is
/// private and only reachable through additive methods, so it can never
/// decrease while the catalog executes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    score: u32,
    flags: Vec<String>,
    narrative: Vec<String>,
}

impl RuleOutcome {
    /// Raise the risk score and record the human-readable flag explaining it.
    pub fn penalize(&mut self, points: u32, flag: impl Into<String>) {
        self.score += points;
        self.flags.push(flag.into());
    }

    /// Raise the score without a flag; used for the fixed per-rule failure
    /// penalty.
    pub fn add_score(&mut self, points: u32) {
        self.score += points;
    }

    /// Append a narrative entry for the audit trail.
    pub fn note(&mut self, entry: impl Into<String>) {
        self.narrative.push(entry.into());
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn narrative(&self) -> &[String] {
        &self.narrative
    }

    /// A hard failure forces rejection regardless of the advisory verdict.
    pub fn hard_failure(&self) -> bool {
        self.score >= 100 || self.flags.iter().any(|flag| flag.contains("Fail"))
    }

    pub fn into_parts(self) -> (u32, Vec<String>, Vec<String>) {
        (self.score, self.flags, self.narrative)
    }
}

/// Final three-valued recommendation for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "APPROVE")]
    Approve,
    #[serde(rename = "PENDING_REVIEW", alias = "PENDING REVIEW")]
    PendingReview,
    #[serde(rename = "REJECT")]
    Reject,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Approve => "APPROVE",
            Recommendation::PendingReview => "PENDING_REVIEW",
            Recommendation::Reject => "REJECT",
        }
    }

    /// Score band implied by the label, inclusive on both ends.
    pub const fn score_band(self) -> (u32, u32) {
        match self {
            Recommendation::Approve => (0, 30),
            Recommendation::PendingReview => (31, 70),
            Recommendation::Reject => (71, 100),
        }
    }
}

/// Secondary judgment over the deterministic rule outcome, either returned by
/// the external advisory scorer or synthesized by the local fallback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryVerdict {
    pub score: u32,
    pub recommendation: Recommendation,
    pub reasoning: String,
}
