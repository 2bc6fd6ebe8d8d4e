//! Assessment orchestration: retrieve the document, load the profile, extract
//! signals, run the rule catalog and arbitrate the final verdict.

use std::sync::Arc;

use serde::Serialize;

use super::advisory::{arbitrate, AdvisoryScorer};
use super::domain::{ExtractedSignals, PatientId, Recommendation};
use super::extraction::{ExtractionError, SignalExtractor};
use super::retrieval::{DocumentSource, RetrievalError};
use super::rules::{RuleContext, RuleEngine};
use super::stores::{ReferenceStores, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("no profile on record for patient {0:?}")]
    ProfileNotFound(PatientId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Complete result of one claim assessment, returned to API callers verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub aggregate_score: u32,
    pub recommendation: Recommendation,
    pub reasoning: String,
    pub rule_score: u32,
    pub red_flags: Vec<String>,
    pub narrative: Vec<String>,
    pub signals: ExtractedSignals,
}

/// Claim assessment pipeline, generic over the document source and advisory
/// scorer so tests can substitute deterministic doubles.
pub struct ClaimVerificationService<D, S> {
    documents: Arc<D>,
    scorer: Arc<S>,
    stores: ReferenceStores,
    extractor: SignalExtractor,
    engine: RuleEngine,
}

impl<D, S> ClaimVerificationService<D, S>
where
    D: DocumentSource,
    S: AdvisoryScorer,
{
    pub fn new(
        documents: Arc<D>,
        scorer: Arc<S>,
        stores: ReferenceStores,
        engine: RuleEngine,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            documents,
            scorer,
            stores,
            extractor: SignalExtractor::new()?,
            engine,
        })
    }

    /// Run the full pipeline for one claim. Rule failures and advisory
    /// failures are absorbed along the way; only missing inputs (document,
    /// profile, text) surface as errors.
    pub async fn assess(
        &self,
        document_reference: &str,
        patient_id: &PatientId,
    ) -> Result<AssessmentReport, AssessmentError> {
        tracing::info!(reference = document_reference, "retrieving claim document");
        let raw_bytes = self.documents.fetch(document_reference).await?;

        let profile = self
            .stores
            .profiles
            .lookup(patient_id)?
            .ok_or_else(|| AssessmentError::ProfileNotFound(patient_id.clone()))?;

        let today = chrono::Local::now().date_naive();
        let (document, signals) = self.extractor.extract(&raw_bytes, &profile, today)?;
        tracing::info!(
            provider = %signals.provider_name,
            diagnoses = signals.diagnoses.len(),
            medications = signals.medications.len(),
            "extracted claim signals"
        );

        let ctx = RuleContext {
            document: &document,
            signals: &signals,
            profile: &profile,
            stores: &self.stores,
            today,
        };
        let outcome = self.engine.run(&ctx);
        tracing::info!(
            rule_score = outcome.score(),
            flags = outcome.flags().len(),
            "rule catalog complete"
        );

        let verdict = arbitrate(self.scorer.as_ref(), &outcome, &signals).await;
        tracing::info!(
            score = verdict.score,
            recommendation = verdict.recommendation.label(),
            "assessment complete"
        );

        let (rule_score, red_flags, narrative) = outcome.into_parts();
        Ok(AssessmentReport {
            aggregate_score: verdict.score,
            recommendation: verdict.recommendation,
            reasoning: verdict.reasoning,
            rule_score,
            red_flags,
            narrative,
            signals,
        })
    }
}
