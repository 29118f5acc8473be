use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Blank or whitespace-only ticker. No request is sent.
    EmptyInput,
    /// Transport failure, timeout, non-success status or an unreadable response envelope.
    NetworkError,
    /// The response text contained no brace-delimited span.
    NoJsonFound,
    /// The extracted span was not a valid analysis object.
    ParseError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::NetworkError => "network_error",
            Self::NoJsonFound => "no_json_found",
            Self::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisError {
    pub kind: ErrorKind,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl AnalysisError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw_output: impl Into<String>) -> Self {
        self.raw_output = Some(raw_output.into());
        self
    }

    /// Text suitable for showing to the person who asked for the analysis.
    pub fn message(&self) -> String {
        match self.kind {
            ErrorKind::EmptyInput => "Please enter a stock ticker".to_string(),
            ErrorKind::NetworkError => format!("Error analyzing stock: {}", self.detail),
            ErrorKind::NoJsonFound => "Unable to parse analysis results".to_string(),
            ErrorKind::ParseError => {
                format!("Error analyzing stock: invalid analysis JSON ({})", self.detail)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "analysis failed (kind={}): {}", self.kind, self.detail)
    }
}

impl std::error::Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let err = AnalysisError::new(ErrorKind::NetworkError, "status=529");
        assert_eq!(
            err.to_string(),
            "analysis failed (kind=network_error): status=529"
        );
    }

    #[test]
    fn user_messages_per_kind() {
        assert_eq!(
            AnalysisError::new(ErrorKind::EmptyInput, "").message(),
            "Please enter a stock ticker"
        );
        assert_eq!(
            AnalysisError::new(ErrorKind::NoJsonFound, "no braces").message(),
            "Unable to parse analysis results"
        );
        assert!(AnalysisError::new(ErrorKind::NetworkError, "timed out")
            .message()
            .contains("timed out"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NoJsonFound).unwrap(),
            "\"no_json_found\""
        );
    }
}
