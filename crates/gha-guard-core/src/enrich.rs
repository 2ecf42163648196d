//! Language-model explanations and fix suggestions for findings.
//!
//! Each finding is sent to the Anthropic messages API together with the
//! workflow text it came from. The model answers with a JSON object holding
//! an explanation and a YAML fix; answers that are not JSON are kept as the
//! explanation.

use crate::rules::finding::Finding;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

const NO_EXPLANATION: &str = "No explanation provided.";
const NO_FIX: &str = "No fix suggested.";
const UNPARSED_FIX: &str = "Could not parse fix suggestion.";

pub const SYSTEM_PROMPT: &str = r#"You are a GitHub Actions security expert. You will receive:
1. A security finding (rule ID, severity, title, description, location)
2. The original workflow YAML file

For each finding, respond with EXACTLY this JSON format (no markdown, no extra text):
{
  "explanation": "A clear, beginner-friendly explanation of why this is a security risk. Use 2-3 sentences. Assume the reader knows basic GitHub Actions but not security.",
  "suggested_fix": "A concrete YAML snippet showing how to fix this specific issue. Only show the relevant part that needs to change, not the whole file."
}"#;

/// A finding with a model-written explanation and fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedFinding {
    #[serde(flatten)]
    pub finding: Finding,
    pub explanation: String,
    pub suggested_fix: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message; 1],
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Advice {
    explanation: Option<String>,
    suggested_fix: Option<String>,
}

/// Client for the Anthropic messages API.
pub struct EnrichmentClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl EnrichmentClient {
    /// Create a client authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("Anthropic API key is empty");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim()).context("Invalid Anthropic API key")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gha-guard/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a client from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("--enrich requires the {API_KEY_ENV} environment variable"))?;
        Self::new(&key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Explain one finding in the context of its workflow text.
    pub async fn enrich(&self, finding: &Finding, workflow_yaml: &str) -> Result<EnrichedFinding> {
        tracing::info!(rule = %finding.rule_id, title = %finding.title, "Enriching finding");
        let body = build_request(&self.model, finding, workflow_yaml);

        let response: MessagesResponse = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Failed to call Anthropic API")?
            .error_for_status()
            .context("Anthropic API returned error")?
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        Ok(parse_advice(finding, &response_text(&response)))
    }

    /// Explain every finding, in order.
    ///
    /// `sources` maps a finding's `file_path` to the workflow text; a missing
    /// entry sends an empty document.
    pub async fn enrich_all(
        &self,
        findings: &[Finding],
        sources: &HashMap<String, String>,
    ) -> Result<Vec<EnrichedFinding>> {
        let mut enriched = Vec::with_capacity(findings.len());
        for finding in findings {
            let yaml = sources
                .get(&finding.file_path)
                .map(String::as_str)
                .unwrap_or_default();
            enriched.push(self.enrich(finding, yaml).await?);
        }
        Ok(enriched)
    }
}

fn build_request<'a>(model: &'a str, finding: &Finding, workflow_yaml: &str) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens: MAX_TOKENS,
        system: SYSTEM_PROMPT,
        messages: [Message {
            role: "user",
            content: build_user_prompt(finding, workflow_yaml),
        }],
    }
}

/// The user message for one finding.
pub fn build_user_prompt(finding: &Finding, workflow_yaml: &str) -> String {
    let job = if finding.job_id.is_empty() {
        "(workflow-level)"
    } else {
        &finding.job_id
    };
    let step = if finding.step_name.is_empty() {
        "N/A"
    } else {
        &finding.step_name
    };

    format!(
        "Here is the security finding:\n\n\
         Rule ID: {}\n\
         Severity: {}\n\
         Title: {}\n\
         Description: {}\n\
         File: {}\n\
         Job: {}\n\
         Step: {}\n\n\
         Here is the full workflow YAML:\n\n\
         ```yaml\n{}\n```\n\n\
         Respond with the JSON object only.",
        finding.rule_id,
        finding.severity.as_str(),
        finding.title,
        finding.description,
        finding.file_path,
        job,
        step,
        workflow_yaml
    )
}

/// Concatenated text blocks of a response.
fn response_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

/// Turn the model's answer into an enriched finding.
///
/// Missing keys get placeholder text. An answer that is not a JSON object
/// becomes the explanation as-is.
pub fn parse_advice(finding: &Finding, text: &str) -> EnrichedFinding {
    let text = text.trim();
    match serde_json::from_str::<Advice>(strip_code_fence(text)) {
        Ok(advice) => EnrichedFinding {
            finding: finding.clone(),
            explanation: advice
                .explanation
                .unwrap_or_else(|| NO_EXPLANATION.to_string()),
            suggested_fix: advice.suggested_fix.unwrap_or_else(|| NO_FIX.to_string()),
        },
        Err(e) => {
            tracing::warn!(rule = %finding.rule_id, error = %e, "Model answer is not JSON");
            EnrichedFinding {
                finding: finding.clone(),
                explanation: text.to_string(),
                suggested_fix: UNPARSED_FIX.to_string(),
            }
        }
    }
}

/// Body of a ```` ```json ```` fenced block, or the text unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
