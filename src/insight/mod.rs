//! Narrative insight boundary
//!
//! An optional collaborator that compares an older report against a recent
//! one and narrates what changed. Failures here never block a report; the
//! caller logs and emits the report without an insight section.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Model used for insight generation; also named in the rendered output.
pub const GOOGLE_AI_MODEL: &str = "gemini-2.5-flash";

/// Upper bound on a single insight generation call.
pub const INSIGHT_TIMEOUT_SECS: u64 = 180;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_INSTRUCTION: &str = "You are a chatbot which analyzes fail2ban ban action logs and IP-based geolocation data to generate insights for the user. Offer system or security insights based on the analysis. Highlight and explain any unusual patterns or noteworthy findings. Your response must be in plain text, so do not try to emphasize words with markdown characters.";

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Compare two rendered reports and return a plain-text narrative.
    async fn generate_insight(&self, older_report: &str, recent_report: &str) -> Result<String>;
}

/// Google generative-language REST client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("banlog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(INSIGHT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client for insight generation")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

fn build_prompt(older_report: &str, recent_report: &str) -> String {
    format!(
        "Following are summarized reports of ban action logs and the geolocations of the logs.\n\
         Analyze these reports and offer system or security insights based on the analysis.\n\
         Highlight and explain any unusual patterns or noteworthy findings.\n\
         \n\
         <older_report>\n{older_report}\n</older_report>\n\
         \n\
         <recent_report>\n{recent_report}\n</recent_report>"
    )
}

#[async_trait]
impl InsightGenerator for GeminiClient {
    async fn generate_insight(&self, older_report: &str, recent_report: &str) -> Result<String> {
        let body = json!({
            "system_instruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "parts": [{ "text": build_prompt(older_report, recent_report) }]
            }]
        });

        let response: GenerateContentResponse = self
            .client
            .post(format!(
                "{API_BASE}/models/{GOOGLE_AI_MODEL}:generateContent"
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("insight generation request failed")?
            .error_for_status()
            .context("insight generation was rejected")?
            .json()
            .await
            .context("failed to decode insight generation response")?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            bail!("no candidate returned from the model");
        };

        let mut generated = String::new();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                generated.push_str(&text);
                generated.push('\n');
            }
        }

        if generated.is_empty() {
            bail!("model returned a candidate without any text parts");
        }

        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wraps_both_reports() {
        let prompt = build_prompt("OLD", "NEW");
        assert!(prompt.contains("<older_report>\nOLD\n</older_report>"));
        assert!(prompt.contains("<recent_report>\nNEW\n</recent_report>"));
        let older = prompt.find("<older_report>").unwrap();
        let recent = prompt.find("<recent_report>").unwrap();
        assert!(older < recent);
    }
}
