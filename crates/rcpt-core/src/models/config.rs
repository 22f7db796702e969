//! Configuration structures for the extraction pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RcptError, Result};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Placeholder shipped in example settings; treated as "no key".
const PLACEHOLDER_API_KEY: &str = "your-gemini-api-key-here";

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// AI extraction configuration.
    pub extraction: ExtractionConfig,

    /// Rule-based fallback parser configuration.
    pub fallback: FallbackConfig,
}

/// AI extraction configuration, passed to the coordinator on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Try the text-generation service before the fallback parser.
    pub ai_enabled: bool,

    /// API key for the text-generation service.
    pub api_key: Option<Credential>,

    /// Timeout for the single outbound call, in milliseconds.
    pub timeout_ms: u64,

    /// Model identifier.
    pub model: String,

    /// Base URL of the generative language API.
    pub endpoint: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            api_key: None,
            timeout_ms: 30_000,
            model: "gemini-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Configuration that never calls the AI service.
    pub fn fallback_only() -> Self {
        Self {
            ai_enabled: false,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The credential, if one is configured and not a placeholder.
    pub fn credential(&self) -> Option<&Credential> {
        self.api_key.as_ref().filter(|c| c.is_usable())
    }

    /// Whether the coordinator should attempt the AI path at all.
    pub fn ai_available(&self) -> bool {
        self.ai_enabled && self.credential().is_some()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Credential::new(key));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Opaque API credential. Never printed in debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_usable(&self) -> bool {
        let secret = self.0.trim();
        !secret.is_empty() && secret != PLACEHOLDER_API_KEY
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How to resolve a label that appears on several lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the first value seen.
    First,
    /// Keep the last value seen. Receipts often restate totals near the bottom.
    #[default]
    Last,
}

/// Fallback parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Tie-break for repeated total/subtotal/tax/tip labels.
    pub totals_tie_break: TieBreak,

    /// How many leading lines may hold the merchant name (0 = unlimited).
    pub merchant_scan_lines: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            totals_tie_break: TieBreak::Last,
            merchant_scan_lines: 5,
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    ///
    /// Unreadable files are [`RcptError::Io`]; contents that do not describe
    /// a configuration are [`RcptError::Config`].
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RcptError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_key_override(std::env::var(API_KEY_ENV).ok())
    }

    /// Replace the API key when an override value is given.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.extraction.api_key = Some(Credential::new(key));
        }
        self
    }
}
