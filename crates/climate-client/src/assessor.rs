use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClimateResult;
use crate::provider::RiskAssessor;
use crate::rate_limit::{ensure_success, send_request};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-nemo:free";

const SERVICE: &str = "OpenRouter";
const TEMPERATURE: f64 = 0.7;

/// Inputs for an LLM risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub pm25: Option<f64>,
    /// Annual solar output, kWh/m²/year
    pub solar: Option<f64>,
    pub location: String,
}

/// Structured assessment returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_tier: String,
    pub explanation: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    Parsed(RiskAssessment),
    /// The model answered but not with the expected JSON.
    Unparseable { raw: Option<String> },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn format_value(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "unknown".to_string())
}

pub fn build_prompt(request: &AssessmentRequest) -> String {
    format!(
        r#"You are an AI climate risk assessor. A user is located in {location}.
- PM2.5 level: {pm25}
- Solar output: {solar} kWh/m²/year

Determine:
1. Risk Tier: Low / Medium / High
2. Explanation: a short summary of why this tier applies
3. Recommendations: 1-2 climate insurance products or schemes that would help small farmers or rural users in this region

Respond with a single JSON object and nothing else, in exactly this shape:

{{
  "riskTier": "Medium",
  "explanation": "Short reasoning here.",
  "recommendations": [
    "Insurance Product 1 - short description",
    "Insurance Product 2 - short description"
  ]
}}

"recommendations" must be an array of plain strings, never objects."#,
        location = request.location,
        pm25 = format_value(request.pm25),
        solar = format_value(request.solar),
    )
}

/// Models often wrap JSON in a markdown fence; strip it before parsing.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Interpret the model's message content.
pub fn parse_assessment(content: Option<String>) -> AssessmentOutcome {
    let parsed = content
        .as_deref()
        .and_then(|c| serde_json::from_str::<RiskAssessment>(strip_code_fence(c)).ok());

    match parsed {
        Some(assessment) => AssessmentOutcome::Parsed(assessment),
        None => AssessmentOutcome::Unparseable { raw: content },
    }
}

#[derive(Clone)]
pub struct OpenRouterAssessor {
    api_key: String,
    model: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenRouterAssessor {
    pub fn new(api_key: String, model: String, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            client: crate::http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, request: &AssessmentRequest) -> ClimateResult<AssessmentOutcome> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
            temperature: TEMPERATURE,
        };

        let response = send_request(
            &self.client,
            None,
            self.client
                .post(format!("{}/api/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body),
            SERVICE,
        )
        .await?;
        let response = ensure_success(response, SERVICE).await?;
        let chat: ChatResponse = response.json().await?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        let outcome = parse_assessment(content);
        if let AssessmentOutcome::Unparseable { .. } = outcome {
            tracing::warn!("{} reply from {} was not valid assessment JSON", SERVICE, self.model);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl RiskAssessor for OpenRouterAssessor {
    async fn assess(&self, request: &AssessmentRequest) -> ClimateResult<AssessmentOutcome> {
        self.complete(request).await
    }

    fn backend_name(&self) -> &'static str {
        "openrouter"
    }
}
