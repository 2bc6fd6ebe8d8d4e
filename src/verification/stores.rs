use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Diagnosis, PatientId, PatientProfile};

/// Error enumeration for reference store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reference store unavailable: {0}")]
    Unavailable(String),
}

/// Licensing status reported by the medical council registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub practitioner: String,
    pub status: LicenseStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRisk {
    pub risk_score: u32,
    pub claims_processed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorClaim {
    pub claim_date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTerms {
    pub policy_id: String,
    pub waiting_period_days: i64,
    pub sum_insured: f64,
    pub start_date: NaiveDate,
}

/// Read-only lookup interfaces so the rule catalog can be exercised against
/// in-memory doubles while production wiring swaps in real stores.
pub trait ProfileStore: Send + Sync {
    fn lookup(&self, patient_id: &PatientId) -> Result<Option<PatientProfile>, StoreError>;
}

pub trait LicenseRegistry: Send + Sync {
    fn lookup(&self, registration_id: &str) -> Result<Option<LicenseRecord>, StoreError>;
}

pub trait ProviderRiskRegistry: Send + Sync {
    fn lookup(&self, provider_name: &str) -> Result<Option<ProviderRisk>, StoreError>;
}

pub trait ClaimHistoryStore: Send + Sync {
    fn history(&self, patient_id: &PatientId) -> Result<Vec<PriorClaim>, StoreError>;
}

pub trait PolicyStore: Send + Sync {
    fn lookup(&self, patient_id: &PatientId) -> Result<Option<PolicyTerms>, StoreError>;
}

pub trait DuplicateRegistry: Send + Sync {
    fn contains(&self, fingerprint: &str) -> Result<bool, StoreError>;
}

/// Bundle of every reference adapter an assessment consults. All lookups are
/// read-only within a request, so the adapters can be shared freely across
/// concurrent assessments.
#[derive(Clone)]
pub struct ReferenceStores {
    pub profiles: Arc<dyn ProfileStore>,
    pub licenses: Arc<dyn LicenseRegistry>,
    pub provider_risk: Arc<dyn ProviderRiskRegistry>,
    pub claim_history: Arc<dyn ClaimHistoryStore>,
    pub policies: Arc<dyn PolicyStore>,
    pub duplicates: Arc<dyn DuplicateRegistry>,
}

impl ReferenceStores {
    /// Wire every adapter to one shared in-memory dataset.
    pub fn from_memory(data: Arc<MemoryReferenceData>) -> Self {
        Self {
            profiles: data.clone(),
            licenses: data.clone(),
            provider_risk: data.clone(),
            claim_history: data.clone(),
            policies: data.clone(),
            duplicates: data,
        }
    }
}

/// In-memory test double backing all six reference interfaces.
#[derive(Default)]
pub struct MemoryReferenceData {
    profiles: Mutex<HashMap<PatientId, PatientProfile>>,
    licenses: Mutex<HashMap<String, LicenseRecord>>,
    provider_risk: Mutex<HashMap<String, ProviderRisk>>,
    claim_history: Mutex<HashMap<PatientId, Vec<PriorClaim>>>,
    policies: Mutex<HashMap<PatientId, PolicyTerms>>,
    duplicates: Mutex<HashSet<String>>,
}

impl MemoryReferenceData {
    pub fn insert_profile(&self, profile: PatientProfile) {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(profile.patient_id.clone(), profile);
    }

    pub fn insert_license(&self, registration_id: impl Into<String>, record: LicenseRecord) {
        self.licenses
            .lock()
            .expect("license mutex poisoned")
            .insert(registration_id.into(), record);
    }

    pub fn insert_provider_risk(&self, provider_name: impl Into<String>, risk: ProviderRisk) {
        self.provider_risk
            .lock()
            .expect("provider risk mutex poisoned")
            .insert(provider_name.into(), risk);
    }

    pub fn insert_claim(&self, patient_id: PatientId, claim: PriorClaim) {
        self.claim_history
            .lock()
            .expect("claim history mutex poisoned")
            .entry(patient_id)
            .or_default()
            .push(claim);
    }

    pub fn insert_policy(&self, patient_id: PatientId, terms: PolicyTerms) {
        self.policies
            .lock()
            .expect("policy mutex poisoned")
            .insert(patient_id, terms);
    }

    pub fn insert_duplicate(&self, fingerprint: impl Into<String>) {
        self.duplicates
            .lock()
            .expect("duplicate mutex poisoned")
            .insert(fingerprint.into());
    }

    /// Demo dataset used by the CLI and the default server wiring.
    pub fn with_demo_data() -> Self {
        let data = Self::default();

        data.insert_profile(PatientProfile {
            patient_id: PatientId("123456789012".to_string()),
            name: "Rohan Mehta".to_string(),
            date_of_birth: "14-03-1985".to_string(),
            address: "12 Marine Drive, Mumbai".to_string(),
            past_diagnoses: vec![Diagnosis {
                code: "N/A".to_string(),
                description: "Asthma".to_string(),
            }],
            medications: vec!["albuterol".to_string()],
        });
        data.insert_profile(PatientProfile {
            patient_id: PatientId("98-7654-3210-9876".to_string()),
            name: "Meera Iyer".to_string(),
            date_of_birth: "02-11-1956".to_string(),
            address: "8 FC Road, Pune".to_string(),
            past_diagnoses: vec![
                Diagnosis {
                    code: "I10".to_string(),
                    description: "Hypertension".to_string(),
                },
                Diagnosis {
                    code: "N/A".to_string(),
                    description: "Type 2 Diabetes".to_string(),
                },
            ],
            medications: vec!["losartan".to_string(), "metformin".to_string()],
        });

        data.insert_license(
            "MH-MC-11223",
            LicenseRecord {
                practitioner: "Dr. Alok Deshpande".to_string(),
                status: LicenseStatus::Active,
            },
        );
        data.insert_license(
            "MH-MC-54321",
            LicenseRecord {
                practitioner: "Dr. Priya Sharma".to_string(),
                status: LicenseStatus::Active,
            },
        );

        data.insert_provider_risk(
            "MUMBAI ARTHRITIS & HEART CLINIC",
            ProviderRisk {
                risk_score: 5,
                claims_processed: 1200,
            },
        );
        data.insert_provider_risk(
            "PUNE RESPIRATORY CLINIC",
            ProviderRisk {
                risk_score: 2,
                claims_processed: 4500,
            },
        );

        if let Some(date) = NaiveDate::from_ymd_opt(2025, 9, 10) {
            data.insert_claim(
                PatientId("123456789012".to_string()),
                PriorClaim {
                    claim_date: date,
                    amount: 4500.0,
                },
            );
        }
        if let Some(date) = NaiveDate::from_ymd_opt(2025, 8, 5) {
            data.insert_claim(
                PatientId("123456789012".to_string()),
                PriorClaim {
                    claim_date: date,
                    amount: 6000.0,
                },
            );
        }

        if let Some(start) = NaiveDate::from_ymd_opt(2024, 7, 1) {
            data.insert_policy(
                PatientId("123456789012".to_string()),
                PolicyTerms {
                    policy_id: "POL-AAA".to_string(),
                    waiting_period_days: 30,
                    sum_insured: 300_000.0,
                    start_date: start,
                },
            );
        }
        if let Some(start) = NaiveDate::from_ymd_opt(2020, 1, 1) {
            data.insert_policy(
                PatientId("98-7654-3210-9876".to_string()),
                PolicyTerms {
                    policy_id: "POL-CCC".to_string(),
                    waiting_period_days: 0,
                    sum_insured: 1_000_000.0,
                    start_date: start,
                },
            );
        }

        data
    }
}

impl ProfileStore for MemoryReferenceData {
    fn lookup(&self, patient_id: &PatientId) -> Result<Option<PatientProfile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(patient_id)
            .cloned())
    }
}

impl LicenseRegistry for MemoryReferenceData {
    fn lookup(&self, registration_id: &str) -> Result<Option<LicenseRecord>, StoreError> {
        Ok(self
            .licenses
            .lock()
            .expect("license mutex poisoned")
            .get(registration_id)
            .cloned())
    }
}

impl ProviderRiskRegistry for MemoryReferenceData {
    fn lookup(&self, provider_name: &str) -> Result<Option<ProviderRisk>, StoreError> {
        Ok(self
            .provider_risk
            .lock()
            .expect("provider risk mutex poisoned")
            .get(provider_name)
            .copied())
    }
}

impl ClaimHistoryStore for MemoryReferenceData {
    fn history(&self, patient_id: &PatientId) -> Result<Vec<PriorClaim>, StoreError> {
        Ok(self
            .claim_history
            .lock()
            .expect("claim history mutex poisoned")
            .get(patient_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl PolicyStore for MemoryReferenceData {
    fn lookup(&self, patient_id: &PatientId) -> Result<Option<PolicyTerms>, StoreError> {
        Ok(self
            .policies
            .lock()
            .expect("policy mutex poisoned")
            .get(patient_id)
            .cloned())
    }
}

impl DuplicateRegistry for MemoryReferenceData {
    fn contains(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self
            .duplicates
            .lock()
            .expect("duplicate mutex poisoned")
            .contains(fingerprint))
    }
}
