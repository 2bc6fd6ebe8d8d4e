mod catalog;

use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{ExtractedSignals, PatientProfile, RuleOutcome};
use super::extraction::DocumentText;
use super::knowledge::RuleKnowledge;
use super::stores::{ReferenceStores, StoreError};

/// Error raised by a single rule; recovered by the runner with a fixed
/// penalty, never surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Evaluation(String),
}

/// Read-only view of one assessment shared by every rule in the catalog.
pub struct RuleContext<'a> {
    pub document: &'a DocumentText,
    pub signals: &'a ExtractedSignals,
    pub profile: &'a PatientProfile,
    pub stores: &'a ReferenceStores,
    pub today: NaiveDate,
}

/// One independent check contributing to the shared accumulator. Rules only
/// ever add score and append flags/narrative; they never read each other's
/// results.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &RuleContext<'_>, outcome: &mut RuleOutcome) -> Result<(), RuleError>;
}

/// Executes the ordered catalog with per-rule fault isolation: a failing rule
/// costs a fixed penalty and a narrative entry, and the run always continues
/// to the next rule.
pub struct RuleEngine {
    catalog: Vec<Box<dyn Rule>>,
    failure_penalty: u32,
}

impl RuleEngine {
    /// Build the standard catalog from the heuristic knowledge tables.
    pub fn standard(knowledge: RuleKnowledge) -> Result<Self, regex::Error> {
        let failure_penalty = knowledge.rule_failure_penalty;
        let catalog = catalog::standard_catalog(Arc::new(knowledge))?;
        Ok(Self {
            catalog,
            failure_penalty,
        })
    }

    pub fn with_catalog(catalog: Vec<Box<dyn Rule>>, failure_penalty: u32) -> Self {
        Self {
            catalog,
            failure_penalty,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn run(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        for rule in &self.catalog {
            if let Err(err) = rule.evaluate(ctx, &mut outcome) {
                tracing::warn!(rule = rule.name(), error = %err, "rule evaluation failed");
                outcome.note(format!(
                    "Analysis ({}): failed with error: {err}",
                    rule.name()
                ));
                outcome.add_score(self.failure_penalty);
            }
        }
        outcome
    }
}
