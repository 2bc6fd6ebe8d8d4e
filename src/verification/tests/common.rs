use std::sync::Arc;

use crate::verification::advisory::{AdvisoryError, AdvisoryRequest, AdvisoryScorer};
use crate::verification::domain::{AdvisoryVerdict, PatientId, PatientProfile, Recommendation};
use crate::verification::retrieval::{DocumentSource, RetrievalError};
use crate::verification::rules::RuleEngine;
use crate::verification::service::ClaimVerificationService;
use crate::verification::stores::{MemoryReferenceData, ReferenceStores};
use crate::verification::RuleKnowledge;

/// Invoice that matches the demo profile for patient 123456789012 on every
/// check in the catalog.
pub(super) fn clean_document() -> String {
    [
        "PUNE RESPIRATORY CLINIC",
        "Bill ID: PRC-2025-1182",
        "Patient Name: Rohan Mehta",
        "Date of Birth: 14-03-1985",
        "Address: 12 Marine Drive, Mumbai",
        "Doctor: Dr. Priya Sharma",
        "Registration ID: MH-MC-54321",
        "Bill Date: 12-08-2025",
        "Primary Diagnosis: Asthma",
        "Diagnosis: J45 - Asthma",
        "Medicine: Albuterol 2mg tab",
        "Spirometry test performed during OPD consultation.",
        "Total Amount: 1,450.00",
    ]
    .join("\n")
}

pub(super) fn rohan_id() -> PatientId {
    PatientId("123456789012".to_string())
}

pub(super) fn demo_data() -> Arc<MemoryReferenceData> {
    Arc::new(MemoryReferenceData::with_demo_data())
}

pub(super) fn rohan_profile(data: &MemoryReferenceData) -> PatientProfile {
    use crate::verification::stores::ProfileStore;
    data.lookup(&rohan_id())
        .expect("memory store never fails")
        .expect("demo profile present")
}

pub(super) fn standard_engine() -> RuleEngine {
    RuleEngine::standard(RuleKnowledge::default()).expect("standard catalog compiles")
}

/// Advisory double returning either a fixed verdict or an unavailability
/// error.
pub(super) enum StubScorer {
    Fixed(AdvisoryVerdict),
    Unavailable,
}

impl StubScorer {
    pub(super) fn approving() -> Self {
        Self::Fixed(AdvisoryVerdict {
            score: 10,
            recommendation: Recommendation::Approve,
            reasoning: "No concerns identified.".to_string(),
        })
    }
}

impl AdvisoryScorer for StubScorer {
    async fn score(&self, _request: &AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> {
        match self {
            StubScorer::Fixed(verdict) => Ok(verdict.clone()),
            StubScorer::Unavailable => {
                Err(AdvisoryError::Transport("connection refused".to_string()))
            }
        }
    }
}

/// Document source double serving one fixed payload for any reference.
pub(super) struct StaticDocumentSource {
    bytes: Vec<u8>,
}

impl StaticDocumentSource {
    pub(super) fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl DocumentSource for StaticDocumentSource {
    async fn fetch(&self, _reference: &str) -> Result<Vec<u8>, RetrievalError> {
        Ok(self.bytes.clone())
    }
}

/// Document source double that always fails retrieval.
pub(super) struct OfflineDocumentSource;

impl DocumentSource for OfflineDocumentSource {
    async fn fetch(&self, _reference: &str) -> Result<Vec<u8>, RetrievalError> {
        Err(RetrievalError::NotAvailable("gateway offline".to_string()))
    }
}

pub(super) fn build_service(
    document: &str,
    scorer: StubScorer,
    data: Arc<MemoryReferenceData>,
) -> ClaimVerificationService<StaticDocumentSource, StubScorer> {
    let stores = ReferenceStores::from_memory(data);
    ClaimVerificationService::new(
        Arc::new(StaticDocumentSource::new(document.as_bytes().to_vec())),
        Arc::new(scorer),
        stores,
        standard_engine(),
    )
    .expect("service builds")
}
