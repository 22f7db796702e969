//! Where raw OCR text comes from.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// A producer of raw OCR text for one receipt.
pub trait TextSource {
    /// Short name identifying the receipt, used to name outputs.
    fn name(&self) -> &str;

    /// Read the full text.
    fn read_text(&self) -> Result<String>;
}

/// Plain-text file, typically the output of an OCR engine.
#[derive(Debug, Clone)]
pub struct FileTextSource {
    path: PathBuf,
    name: String,
}

impl FileTextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "receipt".to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_text(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}
