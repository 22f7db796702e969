//! Error types for the rcpt-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// The raw text handed to the pipeline was unusable.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// AI extraction error.
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Rejection of the pipeline input itself. The only failure `extract` surfaces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    /// Raw text was empty or whitespace only.
    #[error("raw text is empty")]
    Empty,
}

/// Failures of the AI extraction path.
///
/// None of these reach the caller of the coordinator; they trigger the
/// fallback parser instead.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Network or client failure talking to the text-generation service.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but produced no text.
    #[error("empty response from text generation service")]
    EmptyResponse,

    /// No JSON object could be located in the response text.
    #[error("no JSON object found in response")]
    NoJsonPayload,

    /// The located payload is not valid JSON.
    #[error("malformed JSON in response: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The payload is JSON but structurally not a receipt.
    #[error("schema validation failed: {0}")]
    Schema(#[from] ValidationError),

    /// The extractor was invoked without what it needs to make a call.
    #[error("extractor misconfigured: {0}")]
    Config(String),
}

/// Whole-record validation failures.
///
/// Problems confined to a single field never produce one of these; the field
/// is dropped and reported as a [`FieldRejection`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Top-level payload is not a JSON object.
    #[error("payload is not a JSON object (found {0})")]
    NotAnObject(&'static str),

    /// `items` is present but is not an array.
    #[error("items is not a sequence (found {0})")]
    ItemsNotSequence(&'static str),
}

/// A single field dropped during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRejection {
    /// Field path, e.g. `tax_amount` or `items[2].unit_price`.
    pub field: String,
    /// Why it was dropped.
    pub reason: String,
}

impl FieldRejection {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
