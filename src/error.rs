//! Structured error types for RNC document generation.
//!
//! Image decode failures are recovered where they happen (a placeholder is
//! drawn instead), so only parse, config, overflow and render failures ever
//! reach the caller of [`crate::render`].

use thiserror::Error;

/// The unified error type returned by all public functions of this crate.
#[derive(Debug, Error)]
pub enum RncError {
    /// JSON input failed to parse as a valid form record.
    #[error("Failed to parse form record: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// A layout config file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
    /// An embedded image payload could not be decoded.
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    /// An atomic block is taller than an empty page body.
    #[error("Block of {required:.1}mm does not fit in {available:.1}mm of page body")]
    LayoutOverflow { required: f64, available: f64 },
    /// Layout or PDF generation failed.
    #[error("Render error: {0}")]
    Render(String),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for RncError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the form record schema. Check field names and option values.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        RncError::Parse { source: e, hint }
    }
}
