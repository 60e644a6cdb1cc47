//! Structured error types for the report layout engine.
//!
//! Three variants cover the real error sources: JSON parsing, template
//! configuration that cannot be laid out, and element props rejected by a
//! measurer. Text-flow degeneracies and oversized bands are not errors.

use thiserror::Error;

/// The unified error type returned by all public reportflow API functions.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Template or data JSON failed to parse.
    #[error("failed to parse {what}: {source}{}", hint_suffix(.hint))]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// The template asks for something the engine cannot lay out. Aborts the
    /// whole layout call; no partial result is produced.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An element measurer rejected the element's resolved props.
    #[error("invalid properties on element '{element_id}': {message}")]
    Validation { element_id: String, message: String },
}

/// Raised by an [`ElementMeasurer`](crate::measure::ElementMeasurer) when the
/// props it was handed cannot be measured. The engine attributes it to the
/// element id before propagating.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ReportError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ReportError::Configuration(message.into())
    }

    pub(crate) fn validation(element_id: &str, err: ValidationError) -> Self {
        ReportError::Validation {
            element_id: element_id.to_string(),
            message: err.message,
        }
    }

    /// Wrap a serde error, attaching a hint that depends on what went wrong.
    pub fn parse(what: &'static str, source: serde_json::Error) -> Self {
        let hint = match source.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the template schema. Check band types and field names.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ReportError::Parse { what, source, hint }
    }
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_syntax_hint() {
        let err = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}").unwrap_err();
        let err = ReportError::parse("template", err);
        let msg = err.to_string();
        assert!(msg.starts_with("failed to parse template"));
        assert!(msg.contains("trailing commas"));
    }

    #[test]
    fn validation_error_names_element() {
        let err = ReportError::validation("total", ValidationError::new("fontSize must be positive"));
        assert_eq!(
            err.to_string(),
            "invalid properties on element 'total': fontSize must be positive"
        );
    }
}
