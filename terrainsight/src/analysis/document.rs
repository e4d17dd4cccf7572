//! Extracted document inputs.
//!
//! Text extraction itself happens upstream; the analysis only sees the
//! resulting plain text and the structural metadata below.

use serde::{Deserialize, Serialize};

/// Structural metadata reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Original upload size in bytes.
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,
    /// Column names for tabular uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
}

impl DocumentMetadata {
    /// Metadata for a tabular document.
    pub fn tabular(file_size: u64, row_count: u32, headers: Vec<String>) -> Self {
        Self {
            file_size,
            page_count: None,
            row_count: Some(row_count),
            headers: Some(headers),
        }
    }

    pub fn headers(&self) -> &[String] {
        self.headers.as_deref().unwrap_or_default()
    }
}

/// Upload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Csv,
    Xlsx,
}

impl FileType {
    /// Guess the format from the file extension. Unknown extensions are treated as CSV.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Self::Pdf,
            "xlsx" | "xls" => Self::Xlsx,
            _ => Self::Csv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
