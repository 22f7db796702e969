//! Where structured receipts go.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::models::receipt::StructuredReceipt;

/// Outcome of storing one receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReport {
    /// Where the receipt ended up.
    pub location: PathBuf,
    /// Whether the receipt is now fully processed and stored.
    pub is_processed: bool,
}

/// A destination for extracted receipts.
pub trait ReceiptSink {
    fn store(&self, name: &str, receipt: &StructuredReceipt) -> Result<StoreReport>;
}

/// Writes each receipt as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl ReceiptSink for JsonFileSink {
    fn store(&self, name: &str, receipt: &StructuredReceipt) -> Result<StoreReport> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(receipt)?;
        std::fs::write(&path, json)?;

        debug!(path = %path.display(), "Stored receipt");

        Ok(StoreReport {
            location: path,
            is_processed: true,
        })
    }
}
