use crate::llm::error::{AnalysisError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated analysis request. The ticker is trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub ticker: String,
}

impl AnalysisRequest {
    pub fn try_new(raw_ticker: &str) -> Result<Self, AnalysisError> {
        let ticker = raw_ticker.trim();
        if ticker.is_empty() {
            return Err(AnalysisError::new(
                ErrorKind::EmptyInput,
                "ticker is blank",
            ));
        }
        Ok(Self {
            ticker: ticker.to_uppercase(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
    Unknown,
}

impl Trend {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("up") => Self::Up,
            Some("down") => Self::Down,
            Some("stable") => Self::Stable,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Unknown,
}

impl Sentiment {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("positive") => Self::Positive,
            Some("negative") => Self::Negative,
            Some("neutral") => Self::Neutral,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub trend: Trend,
    pub current_price: Option<String>,
    pub price_change: Option<String>,
    pub sentiment: Sentiment,
    pub headlines: Vec<String>,
    pub reasons: Vec<String>,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_and_uppercases() {
        let req = AnalysisRequest::try_new("  aapl \n").unwrap();
        assert_eq!(req.ticker, "AAPL");

        let req = AnalysisRequest::try_new("brk.b").unwrap();
        assert_eq!(req.ticker, "BRK.B");
    }

    #[test]
    fn request_rejects_blank_input() {
        for raw in ["", "   ", "\t\n"] {
            let err = AnalysisRequest::try_new(raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::EmptyInput);
        }
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(Trend::from_label(Some("UP")), Trend::Up);
        assert_eq!(Trend::from_label(Some(" Stable ")), Trend::Stable);
        assert_eq!(Trend::from_label(Some("sideways")), Trend::Unknown);
        assert_eq!(Trend::from_label(None), Trend::Unknown);

        assert_eq!(Sentiment::from_label(Some("Negative")), Sentiment::Negative);
        assert_eq!(Sentiment::from_label(Some("mixed")), Sentiment::Unknown);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Down).unwrap(), "\"down\"");
        assert_eq!(
            serde_json::to_string(&Sentiment::Neutral).unwrap(),
            "\"neutral\""
        );
    }
}
