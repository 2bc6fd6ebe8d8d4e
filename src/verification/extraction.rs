use chrono::{Datelike, NaiveDate};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::domain::{ExtractedSignals, PatientProfile};

/// Lines scanned for an institutional header when resolving the provider.
const PROVIDER_SCAN_LINES: usize = 5;
const PROVIDER_KEYWORDS: [&str; 3] = ["CLINIC", "HOSPITAL", "MEDICAL CENTER"];

/// Invoice and clinical boilerplate that must never be mistaken for a
/// medication name.
const MEDICATION_STOP_WORDS: [&str; 21] = [
    "description",
    "sr. no.",
    "medicine:",
    "dosage",
    "quantity",
    "amount",
    "total",
    "consultation",
    "test",
    "procedure",
    "fee",
    "charges",
    "room",
    "nursing",
    "tax",
    "gst",
    "paid",
    "therapy",
    "counseling",
    "sessions",
    "exercises",
];

/// Phrases at or below this length are treated as extraction noise.
const MIN_PHRASE_LEN: usize = 3;

/// Raised only when the document carries no recoverable text at all. Every
/// other extraction miss degrades to a field default instead.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("document contains no recoverable text")]
    NoText,
}

/// Decoded document text with a cached lower-cased view for the
/// case-insensitive checks used throughout the rule catalog.
#[derive(Debug, Clone)]
pub struct DocumentText {
    raw: String,
    lower: String,
}

impl DocumentText {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let lower = raw.to_lowercase();
        Self { raw, lower }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn contains_ci(&self, needle: &str) -> bool {
        self.lower.contains(&needle.to_lowercase())
    }
}

/// Hex SHA-256 of the raw document bytes, used for duplicate detection.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Best-effort pattern extractor tuned to one invoice style. Patterns are
/// compiled once at construction; every lookup is non-fatal by design.
pub struct SignalExtractor {
    total_amount: Regex,
    bill_date: Regex,
    registration_id: Regex,
    diagnosis_patterns: Vec<Regex>,
    diagnosis_qualifier: Regex,
    medication_patterns: Vec<Regex>,
    dosage_suffix: Regex,
}

impl SignalExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            total_amount: Regex::new(r"(?s)(net amount|total amount|net payable).*?([\d,]+\.\d{2})")?,
            bill_date: Regex::new(r"(?:bill|invoice)\s*date:?\s*(\d{1,2}[-/]\d{1,2}[-/]\d{4})")?,
            registration_id: Regex::new(r"(?i)reg(?:istration)?\.?\s*id:?\s*([A-Za-z0-9/\-]+)")?,
            diagnosis_patterns: vec![
                Regex::new(r"(?i)diagnosis:?\s*(?:[A-Z]\d{2}(?:\.\d+)?)\s*-\s*([\w (),/\-]+)")?,
                Regex::new(r"(?i)primary diagnosis:?\s*([\w (),/\-]+)")?,
                Regex::new(r"(?i)secondary diagnosis:?\s*([\w (),/\-]+)")?,
                Regex::new(r"(?i)provisional diagnosis:?\s*([\w (),/\-]+)")?,
            ],
            diagnosis_qualifier: Regex::new(r"(?i)\((primary|secondary)\)")?,
            medication_patterns: vec![
                Regex::new(r"(?i)medicine:?\s*([\w \-()+]+?)\s*(?:\(|tab|mg|inj|unit|cream|suspension|\d)")?,
                Regex::new(r"(?i)rx only\s*([\w \-+]+)")?,
                Regex::new(r#"(?i)prescribed_medications":\s*\["([\w ]+)"#)?,
            ],
            dosage_suffix: Regex::new(r"\s*\d+.*")?,
        })
    }

    /// Decode the document and populate every signal it can find. The only
    /// fatal condition is a document without any text; each individual field
    /// falls back to its default when its pattern finds nothing.
    pub fn extract(
        &self,
        raw_bytes: &[u8],
        profile: &PatientProfile,
        today: NaiveDate,
    ) -> Result<(DocumentText, ExtractedSignals), ExtractionError> {
        let text = String::from_utf8_lossy(raw_bytes).into_owned();
        if !text.chars().any(char::is_alphanumeric) {
            return Err(ExtractionError::NoText);
        }
        let document = DocumentText::new(text);

        let mut signals = ExtractedSignals::new(fingerprint(raw_bytes));
        signals.age_years = estimate_age(&profile.date_of_birth, today);
        signals.provider_name = provider_name(&document);
        signals.total_amount = self.total_amount(&document);
        signals.bill_date = self.bill_date(&document);
        signals.registration_id = self.registration_id(&document);
        signals.diagnoses = self.diagnoses(&document);
        signals.medications = self.medications(&document);

        Ok((document, signals))
    }

    fn total_amount(&self, document: &DocumentText) -> f64 {
        self.total_amount
            .captures(document.lower())
            .and_then(|caps| caps.get(2))
            .and_then(|amount| amount.as_str().replace(',', "").parse::<f64>().ok())
            .filter(|value| *value >= 0.0)
            .unwrap_or(0.0)
    }

    fn bill_date(&self, document: &DocumentText) -> Option<NaiveDate> {
        self.bill_date
            .captures(document.lower())
            .and_then(|caps| caps.get(1))
            .and_then(|token| parse_dayfirst(token.as_str()))
    }

    fn registration_id(&self, document: &DocumentText) -> Option<String> {
        self.registration_id
            .captures(document.raw())
            .and_then(|caps| caps.get(1))
            .map(|token| token.as_str().to_uppercase())
    }

    fn diagnoses(&self, document: &DocumentText) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.diagnosis_patterns {
            for caps in pattern.captures_iter(document.raw()) {
                let Some(matched) = caps.get(1) else { continue };
                let phrase = matched.as_str().trim().to_lowercase();
                let phrase = self
                    .diagnosis_qualifier
                    .replace_all(&phrase, "")
                    .trim()
                    .to_string();
                if phrase.len() > MIN_PHRASE_LEN && !found.contains(&phrase) {
                    found.push(phrase);
                }
            }
        }
        found
    }

    fn medications(&self, document: &DocumentText) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.medication_patterns {
            for caps in pattern.captures_iter(document.raw()) {
                let Some(matched) = caps.get(1) else { continue };
                let name = matched.as_str().trim().to_lowercase();
                let name = self.dosage_suffix.replace(&name, "").trim().to_string();
                let is_boilerplate = MEDICATION_STOP_WORDS.iter().any(|word| *word == name)
                    || name
                        .split_whitespace()
                        .any(|token| MEDICATION_STOP_WORDS.contains(&token));
                if name.len() > MIN_PHRASE_LEN && !is_boilerplate && !found.contains(&name) {
                    found.push(name);
                }
            }
        }
        found
    }
}

/// Scan the document header for an institutional keyword; fall back to the
/// second line when none of the first lines carry one.
fn provider_name(document: &DocumentText) -> String {
    let lines: Vec<&str> = document.raw().lines().collect();
    for line in lines.iter().take(PROVIDER_SCAN_LINES) {
        let upper = line.trim().to_uppercase();
        if PROVIDER_KEYWORDS.iter().any(|keyword| upper.contains(keyword)) {
            return upper;
        }
    }
    lines
        .get(1)
        .map(|line| line.trim().to_uppercase())
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| super::domain::UNKNOWN_PROVIDER.to_string())
}

/// Parse a day-first date token, tolerating `/` separators.
pub fn parse_dayfirst(value: &str) -> Option<NaiveDate> {
    let normalized = value.trim().replace('/', "-");
    NaiveDate::parse_from_str(&normalized, "%d-%m-%Y").ok()
}

/// Whole years between the textual day-first date of birth and `today`;
/// absent when the date does not parse or lies in the future.
fn estimate_age(date_of_birth: &str, today: NaiveDate) -> Option<u32> {
    let born = parse_dayfirst(date_of_birth)?;
    if born > today {
        return None;
    }
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
