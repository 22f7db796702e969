//! Pipeline entry point: AI first, rule-based fallback on any failure.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::InvalidInputError;
use crate::fallback::FallbackParser;
use crate::models::config::{ExtractionConfig, FallbackConfig};
use crate::models::receipt::{RawText, StructuredReceipt};

use super::ai::StructuredExtractor;
use super::TextGenerator;

/// Chooses between the AI and fallback paths for each receipt.
///
/// Stateless between calls: the same input twice makes two independent
/// attempts. Safe to share across tasks.
pub struct Coordinator<G> {
    extractor: StructuredExtractor<G>,
    fallback: FallbackParser,
}

impl<G: TextGenerator> Coordinator<G> {
    /// Create a coordinator with default fallback settings.
    pub fn new(generator: G) -> Self {
        Self::with_fallback(generator, FallbackConfig::default())
    }

    pub fn with_fallback(generator: G, fallback: FallbackConfig) -> Self {
        Self {
            extractor: StructuredExtractor::new(generator),
            fallback: FallbackParser::new(fallback),
        }
    }

    pub fn extractor(&self) -> &StructuredExtractor<G> {
        &self.extractor
    }

    /// Extract a structured receipt from raw text.
    ///
    /// Fails only when the text itself is empty. Every AI failure (missing
    /// credential, transport, timeout, malformed or schema-invalid output)
    /// yields the fallback parser's result instead.
    pub async fn extract(
        &self,
        raw_text: &str,
        config: &ExtractionConfig,
    ) -> Result<StructuredReceipt, InvalidInputError> {
        let raw = RawText::new(raw_text)?;
        let start = Instant::now();

        let receipt = if config.ai_available() {
            match self.extractor.call_extractor(&raw, config).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(error = %e, "AI extraction failed, using fallback parser");
                    self.fallback.parse(raw.as_str())
                }
            }
        } else {
            debug!(
                ai_enabled = config.ai_enabled,
                has_credential = config.credential().is_some(),
                "AI path unavailable, using fallback parser"
            );
            self.fallback.parse(raw.as_str())
        };

        info!(
            method = %receipt.extraction_method,
            items = receipt.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extraction complete"
        );

        Ok(receipt)
    }
}

/// Extract with the Gemini service and default fallback settings.
#[cfg(feature = "http")]
pub async fn extract(
    raw_text: &str,
    config: &ExtractionConfig,
) -> Result<StructuredReceipt, InvalidInputError> {
    match super::GeminiGenerator::new() {
        Ok(generator) => Coordinator::new(generator).extract(raw_text, config).await,
        Err(e) => {
            warn!(error = %e, "HTTP client unavailable, using fallback parser");
            Coordinator::new(Unavailable(e.to_string()))
                .extract(raw_text, config)
                .await
        }
    }
}

/// Generator standing in for one that could not be built.
#[cfg(feature = "http")]
struct Unavailable(String);

#[cfg(feature = "http")]
#[async_trait::async_trait]
impl TextGenerator for Unavailable {
    async fn generate(
        &self,
        _request: &super::GenerationRequest,
    ) -> Result<String, crate::error::ExtractorError> {
        Err(crate::error::ExtractorError::Config(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    use crate::error::ExtractorError;
    use crate::extract::GenerationRequest;
    use crate::fallback::parse_fallback;
    use crate::models::receipt::ExtractionMethod;

    const ACME: &str = "ACME STORE\n2024-01-15\nCoffee 2 3.50 7.00\nSubtotal: 7.00\nTax: 0.70\nTotal: 7.70";

    /// Returns a fixed response and counts calls.
    struct Stub {
        response: Result<&'static str, fn() -> ExtractorError>,
        calls: AtomicUsize,
    }

    impl Stub {
        fn ok(response: &'static str) -> Self {
            Self {
                response: Ok(response),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(error: fn() -> ExtractorError) -> Self {
            Self {
                response: Err(error),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for Stub {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, ExtractorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.response {
                Ok(text) => Ok(text.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, ExtractorError> {
            tokio::time::sleep(self.0).await;
            Ok(r#"{"merchant_name": "TOO LATE"}"#.to_string())
        }
    }

    fn ai_config() -> ExtractionConfig {
        ExtractionConfig::default().with_api_key("test-key")
    }

    #[tokio::test]
    async fn test_empty_input_is_the_only_error() {
        let coordinator = Coordinator::new(Stub::ok("{}"));
        assert_eq!(
            coordinator.extract("", &ai_config()).await,
            Err(InvalidInputError::Empty)
        );
        assert_eq!(
            coordinator.extract(" \n\t ", &ai_config()).await,
            Err(InvalidInputError::Empty)
        );
        assert_eq!(coordinator.extractor().generator().calls(), 0);
    }

    #[tokio::test]
    async fn test_ai_success() {
        let coordinator = Coordinator::new(Stub::ok(
            r#"{"merchant_name": "ACME STORE", "total_amount": "7.70", "tax_amount": "banana", "items": []}"#,
        ));
        let receipt = coordinator.extract(ACME, &ai_config()).await.unwrap();

        assert_eq!(receipt.extraction_method, ExtractionMethod::Ai);
        assert_eq!(receipt.merchant_name.as_deref(), Some("ACME STORE"));
        assert_eq!(receipt.total_amount, Some(Decimal::new(770, 2)));
        assert_eq!(receipt.tax_amount, None);
        assert!(receipt.items.is_empty());
        assert_eq!(receipt.raw_text, ACME);
        assert_eq!(coordinator.extractor().generator().calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_matches_fallback() {
        let expected = parse_fallback(ACME);

        for response in ["not json at all", "{\"merchant_name\": ", "[1, 2, 3]", r#"{"items": {}}"#] {
            let coordinator = Coordinator::new(Stub::ok(response));
            let receipt = coordinator.extract(ACME, &ai_config()).await.unwrap();
            assert_eq!(receipt, expected, "response: {}", response);
        }
    }

    #[tokio::test]
    async fn test_generator_errors_fall_back() {
        let expected = parse_fallback(ACME);
        let errors: [fn() -> ExtractorError; 3] = [
            || ExtractorError::Transport("connection refused".to_string()),
            || ExtractorError::Status {
                status: 503,
                body: "overloaded".to_string(),
            },
            || ExtractorError::EmptyResponse,
        ];

        for error in errors {
            let coordinator = Coordinator::new(Stub::failing(error));
            let receipt = coordinator.extract(ACME, &ai_config()).await.unwrap();
            assert_eq!(receipt, expected);
            assert_eq!(coordinator.extractor().generator().calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let coordinator = Coordinator::new(Slow(Duration::from_millis(500)));
        let config = ai_config().with_timeout_ms(20);

        let receipt = coordinator.extract(ACME, &config).await.unwrap();

        assert_eq!(receipt.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(receipt.merchant_name.as_deref(), Some("ACME STORE"));
    }

    #[tokio::test]
    async fn test_ai_disabled_never_calls_generator() {
        let coordinator = Coordinator::new(Stub::ok("{}"));

        let receipt = coordinator
            .extract(ACME, &ExtractionConfig::fallback_only().with_api_key("test-key"))
            .await
            .unwrap();
        assert_eq!(receipt, parse_fallback(ACME));

        let receipt = coordinator
            .extract(ACME, &ExtractionConfig::default().with_api_key("your-gemini-api-key-here"))
            .await
            .unwrap();
        assert_eq!(receipt.extraction_method, ExtractionMethod::Fallback);

        assert_eq!(coordinator.extractor().generator().calls(), 0);
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let stub = Arc::new(Stub::ok(r#"{"merchant_name": "ACME STORE"}"#));
        let coordinator = Coordinator::new(Arc::clone(&stub));

        coordinator.extract(ACME, &ai_config()).await.unwrap();
        coordinator.extract(ACME, &ai_config()).await.unwrap();

        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_settings_are_used() {
        let coordinator = Coordinator::with_fallback(
            Stub::ok("{}"),
            FallbackConfig {
                totals_tie_break: crate::models::config::TieBreak::First,
                ..FallbackConfig::default()
            },
        );
        let receipt = coordinator
            .extract("Total: 10.00\nTotal: 12.50", &ExtractionConfig::fallback_only())
            .await
            .unwrap();
        assert_eq!(receipt.total_amount, Some(Decimal::new(1000, 2)));
    }

    #[tokio::test]
    async fn test_gibberish_still_returns_receipt() {
        let coordinator = Coordinator::new(Stub::ok("nope"));
        let receipt = coordinator.extract("@@@@", &ai_config()).await.unwrap();
        assert!(receipt.is_blank());
        assert_eq!(receipt.raw_text, "@@@@");
        assert_eq!(receipt.extraction_method, ExtractionMethod::Fallback);
    }

    #[tokio::test]
    async fn test_oversized_amounts_still_return_receipt() {
        let coordinator = Coordinator::new(Stub::ok("{}"));
        let text = "Widget 0.001 792281625142643375935439503.35\nTea 999 @ 792281625142643375935439503.35";

        let receipt = coordinator
            .extract(text, &ExtractionConfig::fallback_only())
            .await
            .unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.extraction_method, ExtractionMethod::Fallback);
    }
}
