//! Core library for receipt text extraction.
//!
//! This crate provides:
//! - Receipt data models and configuration
//! - AI-assisted extraction through a text-generation service (Gemini)
//! - A deterministic rule-based fallback parser
//! - A coordinator that always returns a receipt for non-empty text
//! - Money normalization shared by both paths

pub mod error;
pub mod extract;
pub mod fallback;
pub mod models;
pub mod money;
pub mod sink;
pub mod source;

pub use error::{ExtractorError, FieldRejection, InvalidInputError, RcptError, Result, ValidationError};
pub use extract::{Coordinator, GenerationRequest, StructuredExtractor, TextGenerator};
#[cfg(feature = "http")]
pub use extract::{extract, GeminiGenerator};
pub use fallback::{parse_fallback, FallbackParser};
pub use models::config::{Credential, ExtractionConfig, FallbackConfig, RcptConfig, TieBreak};
pub use models::receipt::{AmountField, ExtractionMethod, LineItem, RawText, StructuredReceipt};
pub use sink::{JsonFileSink, ReceiptSink, StoreReport};
pub use source::{FileTextSource, TextSource};
