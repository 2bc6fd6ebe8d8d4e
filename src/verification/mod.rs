//! Claim document verification pipeline.
//!
//! A claim arrives as an opaque document reference plus a patient identifier.
//! The pipeline retrieves the raw document, extracts structured signals from
//! its text, runs an ordered catalog of independent risk rules with per-rule
//! fault isolation, and then arbitrates the final verdict with an advisory
//! scorer whose opinion can never override a hard rule failure.

pub mod advisory;
pub mod domain;
pub mod extraction;
pub mod knowledge;
pub mod retrieval;
pub mod router;
pub mod rules;
pub mod service;
pub mod stores;

#[cfg(test)]
mod tests;

pub use advisory::{arbitrate, AdvisoryError, AdvisoryRequest, AdvisoryScorer, HttpAdvisoryScorer};
pub use domain::{
    AdvisoryVerdict, Diagnosis, ExtractedSignals, PatientId, PatientProfile, Recommendation,
    RuleOutcome,
};
pub use extraction::{ExtractionError, SignalExtractor};
pub use knowledge::RuleKnowledge;
pub use retrieval::{DocumentSource, FileDocumentSource, GatewayDocumentSource, RetrievalError};
pub use router::claims_router;
pub use rules::{Rule, RuleContext, RuleEngine, RuleError};
pub use service::{AssessmentError, AssessmentReport, ClaimVerificationService};
pub use stores::{MemoryReferenceData, ReferenceStores, StoreError};
