//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExtractorError;

use super::{GenerationRequest, TextGenerator};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Maximum number of response body bytes kept in a status error.
const ERROR_BODY_LIMIT: usize = 512;

/// Text generator backed by the Gemini REST API.
///
/// Holds one [`reqwest::Client`]; clones share its connection pool.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new() -> Result<Self, ExtractorError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rcpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractorError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ExtractorError> {
        let url = generate_url(&request.endpoint, &request.model);
        debug!(%url, "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, request.credential.expose())
            .timeout(request.timeout)
            .json(&GenerateContentRequest::new(&request.prompt))
            .send()
            .await
            .map_err(|e| transport_error(e, request))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractorError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, request))?;

        body.text().ok_or(ExtractorError::EmptyResponse)
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!("{}/models/{}:generateContent", endpoint.trim_end_matches('/'), model)
}

fn transport_error(e: reqwest::Error, request: &GenerationRequest) -> ExtractorError {
    if e.is_timeout() {
        ExtractorError::Timeout(request.timeout)
    } else {
        ExtractorError::Transport(e.to_string())
    }
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_url() {
        assert_eq!(
            generate_url("https://generativelanguage.googleapis.com/v1beta/", "gemini-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(GenerateContentRequest::new("parse this")).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{"parts": [{"text": "parse this"}]}],
                "generationConfig": {"temperature": 0.0}
            })
        );
    }

    #[test]
    fn test_response_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "```json\n{\"a\":"}, {"text": " 1}\n```"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 42}
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("```json\n{\"a\": 1}\n```"));
    }

    #[test]
    fn test_response_without_text() {
        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(blocked.text(), None);

        let empty: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
