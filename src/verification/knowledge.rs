use std::collections::BTreeMap;

/// Expected diagnostic test evidence for a diagnosis keyword.
#[derive(Debug, Clone)]
pub struct LabExpectation {
    pub diagnosis_keyword: String,
    /// Short label used when flagging the missing evidence.
    pub label: String,
    /// Any one of these keywords in the document satisfies the expectation.
    pub test_keywords: Vec<String>,
}

/// Heuristic tables and thresholds consumed by the rule catalog.
///
/// The literal values mirror the reference datasets the scoring policy was
/// calibrated against; they are grouped here so deployments can tune them
/// without touching rule logic.
#[derive(Debug, Clone)]
pub struct RuleKnowledge {
    /// Medication name stem -> diagnosis keywords that justify prescribing it.
    pub drug_indications: BTreeMap<String, Vec<String>>,
    /// Diagnosis phrase -> inclusive plausible age range in years.
    pub diagnosis_age_ranges: BTreeMap<String, (u32, u32)>,
    /// ICD-10 code -> diagnosis keyword expected alongside it.
    pub icd_expectations: Vec<(String, String)>,
    pub lab_expectations: Vec<LabExpectation>,
    /// (claimed keyword, chronic-history keyword) pairs considered unrelated
    /// when the claimed keyword is new for the patient.
    pub chronic_conflicts: Vec<(String, String)>,
    /// Fixed score added when a rule fails to evaluate.
    pub rule_failure_penalty: u32,
    /// Window and threshold for the claim frequency check.
    pub frequency_window_days: i64,
    pub frequency_threshold: usize,
    /// Non-ASCII character count above which a document looks tampered.
    pub tampering_char_limit: usize,
}

impl Default for RuleKnowledge {
    fn default() -> Self {
        let drug_indications = BTreeMap::from([
            (
                "losartan".to_string(),
                vec!["hypertension".to_string(), "high blood pressure".to_string()],
            ),
            (
                "methotrexate".to_string(),
                vec![
                    "arthritis".to_string(),
                    "rheumatoid arthritis".to_string(),
                    "psoriasis".to_string(),
                ],
            ),
            (
                "albuterol".to_string(),
                vec!["asthma".to_string(), "copd".to_string()],
            ),
            ("metformin".to_string(), vec!["diabetes".to_string()]),
        ]);

        let diagnosis_age_ranges = BTreeMap::from([
            ("juvenile idiopathic arthritis".to_string(), (0, 18)),
            ("alzheimer's".to_string(), (60, 120)),
            ("hypertension".to_string(), (20, 120)),
            ("asthma".to_string(), (1, 120)),
        ]);

        let icd_expectations = vec![
            ("J45".to_string(), "asthma".to_string()),
            ("I10".to_string(), "hypertension".to_string()),
            ("M08".to_string(), "arthritis".to_string()),
        ];

        let lab_expectations = vec![
            LabExpectation {
                diagnosis_keyword: "asthma".to_string(),
                label: "Spirometry/PFT for Asthma".to_string(),
                test_keywords: vec!["spirometry".to_string(), "pft".to_string()],
            },
            LabExpectation {
                diagnosis_keyword: "hypertension".to_string(),
                label: "BP Check for Hypertension".to_string(),
                test_keywords: vec!["blood pressure".to_string(), " bp ".to_string()],
            },
            LabExpectation {
                diagnosis_keyword: "diabetes".to_string(),
                label: "HbA1c for Diabetes".to_string(),
                test_keywords: vec!["hba1c".to_string(), "glycated hemoglobin".to_string()],
            },
        ];

        let chronic_conflicts = vec![
            ("arthritis".to_string(), "diabetes".to_string()),
            ("cancer".to_string(), "hypertension".to_string()),
        ];

        Self {
            drug_indications,
            diagnosis_age_ranges,
            icd_expectations,
            lab_expectations,
            chronic_conflicts,
            rule_failure_penalty: 5,
            frequency_window_days: 30,
            frequency_threshold: 2,
            tampering_char_limit: 20,
        }
    }
}
