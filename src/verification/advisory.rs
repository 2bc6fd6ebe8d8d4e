//! Advisory arbitration over the deterministic rule outcome. The external
//! scorer is strictly advisory: its score is clamped to the band implied by
//! its own recommendation, and a hard rule failure overrides it entirely.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::domain::{AdvisoryVerdict, ExtractedSignals, Recommendation, RuleOutcome};
use crate::config::AdvisoryConfig;

const HARD_FAILURE_PREFIX: &str = "[AUTO-REJECTED due to hard rule failure] ";

/// Condensed view of an assessment handed to the advisory scorer.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryRequest {
    pub rule_score: u32,
    pub red_flags: Vec<String>,
    pub primary_diagnosis: Option<String>,
    pub total_amount: f64,
}

impl AdvisoryRequest {
    pub fn from_assessment(outcome: &RuleOutcome, signals: &ExtractedSignals) -> Self {
        Self {
            rule_score: outcome.score(),
            red_flags: outcome.flags().to_vec(),
            primary_diagnosis: signals.primary_diagnosis().map(str::to_string),
            total_amount: signals.total_amount,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("advisory scorer is not configured")]
    NotConfigured,
    #[error("advisory transport failure: {0}")]
    Transport(String),
    #[error("advisory request timed out")]
    Timeout,
    #[error("advisory response did not match the expected schema: {0}")]
    Schema(String),
}

/// Secondary scorer consulted after the rule engine. Implementations must
/// treat the request as read-only and return a complete verdict or an error;
/// a failed call never aborts an assessment.
pub trait AdvisoryScorer: Send + Sync {
    fn score(
        &self,
        request: &AdvisoryRequest,
    ) -> impl Future<Output = Result<AdvisoryVerdict, AdvisoryError>> + Send;
}

/// Produce the final verdict for an assessment. The scorer's opinion is
/// consulted first; any scorer failure falls back to a deterministic local
/// policy, and a hard rule failure overrides whatever came out of either.
pub async fn arbitrate<S: AdvisoryScorer>(
    scorer: &S,
    outcome: &RuleOutcome,
    signals: &ExtractedSignals,
) -> AdvisoryVerdict {
    let request = AdvisoryRequest::from_assessment(outcome, signals);
    let verdict = match scorer.score(&request).await {
        Ok(verdict) => verdict,
        Err(err) => {
            tracing::warn!(error = %err, "advisory scorer unavailable, using local fallback");
            local_fallback(outcome)
        }
    };
    let verdict = clamp_to_band(verdict);
    apply_hard_failure_override(verdict, outcome)
}

/// Deterministic stand-in verdict derived from the rule outcome alone.
fn local_fallback(outcome: &RuleOutcome) -> AdvisoryVerdict {
    let score = outcome.score().min(100);
    if outcome.hard_failure() {
        AdvisoryVerdict {
            score: score.max(85),
            recommendation: Recommendation::Reject,
            reasoning: "Advisory scorer unavailable; rule outcome contains a hard failure."
                .to_string(),
        }
    } else if score == 0 && outcome.flags().is_empty() {
        AdvisoryVerdict {
            score,
            recommendation: Recommendation::Approve,
            reasoning: "Advisory scorer unavailable; no red flags were raised by the rules."
                .to_string(),
        }
    } else {
        AdvisoryVerdict {
            score,
            recommendation: Recommendation::PendingReview,
            reasoning: "Advisory scorer unavailable; rule outcome requires manual review."
                .to_string(),
        }
    }
}

/// Force the score into the band implied by the recommendation. An advisory
/// score can never move a claim across a band boundary on its own.
fn clamp_to_band(mut verdict: AdvisoryVerdict) -> AdvisoryVerdict {
    let (min, max) = verdict.recommendation.score_band();
    if verdict.score < min || verdict.score > max {
        verdict.score = match verdict.recommendation {
            Recommendation::Approve => 25,
            Recommendation::PendingReview => 50,
            Recommendation::Reject => 85,
        };
    }
    verdict
}

fn apply_hard_failure_override(
    verdict: AdvisoryVerdict,
    outcome: &RuleOutcome,
) -> AdvisoryVerdict {
    if !outcome.hard_failure() {
        return verdict;
    }
    AdvisoryVerdict {
        score: verdict.score.max(85),
        recommendation: Recommendation::Reject,
        reasoning: format!("{HARD_FAILURE_PREFIX}{}", verdict.reasoning),
    }
}

/// OpenAI-compatible chat-completions client used as the advisory scorer in
/// production wiring.
pub struct HttpAdvisoryScorer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpAdvisoryScorer {
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn prompt(request: &AdvisoryRequest) -> String {
        let flags = if request.red_flags.is_empty() {
            "none".to_string()
        } else {
            request.red_flags.join("; ")
        };
        format!(
            "You are a senior insurance claim adjudicator. A deterministic rule engine \
             produced the findings below for one health claim. Weigh the severity and \
             coherence of the red flags and reply with a JSON object containing exactly \
             these keys: \"aggregate_score\" (integer 0-100), \"recommendation\" (one of \
             \"APPROVE\", \"PENDING_REVIEW\", \"REJECT\") and \"reasoning\" (a short \
             paragraph).\n\nRule score: {}\nRed flags: {}\nPrimary diagnosis: {}\nClaimed \
             amount: {:.2}",
            request.rule_score,
            flags,
            request.primary_diagnosis.as_deref().unwrap_or("unknown"),
            request.total_amount,
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    aggregate_score: i64,
    recommendation: Recommendation,
    reasoning: String,
}

/// Strict parse of the scorer's JSON payload. Anything outside the documented
/// schema is rejected so a malformed response falls back locally instead of
/// leaking a bogus score.
pub(crate) fn parse_verdict(content: &str) -> Result<AdvisoryVerdict, AdvisoryError> {
    let raw: RawVerdict =
        serde_json::from_str(content).map_err(|err| AdvisoryError::Schema(err.to_string()))?;
    let score = u32::try_from(raw.aggregate_score)
        .ok()
        .filter(|score| *score <= 100)
        .ok_or_else(|| {
            AdvisoryError::Schema(format!("score {} outside 0-100", raw.aggregate_score))
        })?;
    Ok(AdvisoryVerdict {
        score,
        recommendation: raw.recommendation,
        reasoning: raw.reasoning,
    })
}

impl AdvisoryScorer for HttpAdvisoryScorer {
    async fn score(&self, request: &AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AdvisoryError::NotConfigured);
        };

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: Self::prompt(request),
            }],
            temperature: 0.1,
            max_tokens: 400,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?
            .error_for_status()
            .map_err(classify_transport)?;

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| AdvisoryError::Schema(err.to_string()))?;
        let content = payload
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| AdvisoryError::Schema("response carried no choices".to_string()))?;
        parse_verdict(content)
    }
}

fn classify_transport(err: reqwest::Error) -> AdvisoryError {
    if err.is_timeout() {
        AdvisoryError::Timeout
    } else {
        AdvisoryError::Transport(err.to_string())
    }
}
