//! AI-assisted extraction with rule-based fallback.
//!
//! The [`Coordinator`] is the pipeline entry point: it tries the
//! [`StructuredExtractor`] once and falls back to the
//! [`FallbackParser`](crate::fallback::FallbackParser) on any failure.

mod ai;
mod coordinator;
#[cfg(feature = "http")]
mod gemini;
pub mod prompt;
pub mod schema;

pub use ai::{extract_json_payload, StructuredExtractor};
pub use coordinator::Coordinator;
#[cfg(feature = "http")]
pub use coordinator::extract;
#[cfg(feature = "http")]
pub use gemini::GeminiGenerator;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExtractorError;
use crate::models::config::Credential;

/// A single request to a text-generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Full instruction, receipt text included.
    pub prompt: String,
    /// Model identifier.
    pub model: String,
    /// Base URL of the service.
    pub endpoint: String,
    /// API credential.
    pub credential: Credential,
    /// Upper bound for the whole call.
    pub timeout: Duration,
}

/// Text-generation backend used by the AI path.
///
/// Implementations make exactly one attempt per call. Timeouts are enforced
/// by the caller as well, so an implementation that ignores
/// [`GenerationRequest::timeout`] still cannot stall the pipeline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw text produced for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ExtractorError>;
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ExtractorError> {
        (**self).generate(request).await
    }
}
