//! Structured extraction through a text-generation service.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::error::ExtractorError;
use crate::models::config::ExtractionConfig;
use crate::models::receipt::{RawText, StructuredReceipt};

use super::prompt::build_prompt;
use super::schema::validate_with_report;
use super::{GenerationRequest, TextGenerator};

/// Turns raw text into a validated receipt with one generator call.
pub struct StructuredExtractor<G> {
    generator: G,
}

impl<G: TextGenerator> StructuredExtractor<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Run the AI path once. No retries.
    ///
    /// Every way this can go wrong is an [`ExtractorError`]; individual
    /// invalid fields are dropped by validation instead.
    pub async fn call_extractor(
        &self,
        raw_text: &RawText,
        config: &ExtractionConfig,
    ) -> Result<StructuredReceipt, ExtractorError> {
        let credential = config
            .credential()
            .ok_or_else(|| ExtractorError::Config("no API credential configured".to_string()))?;

        let timeout = config.timeout();
        let request = GenerationRequest {
            prompt: build_prompt(raw_text.as_str()),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            credential: credential.clone(),
            timeout,
        };

        let start = Instant::now();
        let response = tokio::time::timeout(timeout, self.generator.generate(&request))
            .await
            .map_err(|_| ExtractorError::Timeout(timeout))??;

        debug!(
            model = %request.model,
            response_len = response.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generator responded"
        );

        if response.trim().is_empty() {
            return Err(ExtractorError::EmptyResponse);
        }

        let payload = extract_json_payload(&response).ok_or(ExtractorError::NoJsonPayload)?;
        let value: Value = serde_json::from_str(payload)?;
        let (receipt, rejections) = validate_with_report(&value, raw_text.as_str())?;

        if !rejections.is_empty() {
            debug!(dropped = rejections.len(), "AI response had invalid fields");
        }

        Ok(receipt)
    }
}

/// Locate the JSON object in a model response.
///
/// Models often wrap the object in a Markdown code fence or add a sentence
/// around it; everything outside the outermost braces is ignored.
pub fn extract_json_payload(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}
