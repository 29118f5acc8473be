use crate::domain::analysis::{AnalysisResult, Sentiment, Trend};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON object the model is asked to produce. Every key is optional; a missing key
/// becomes an empty field on the result, never a guessed value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmAnalysisPayload {
    pub ticker: Option<String>,
    pub trend: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub current_price: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub price_change: Option<String>,
    pub sentiment: Option<String>,
    pub headlines: Option<Vec<String>>,
    pub reasons: Option<Vec<String>>,
    pub summary: Option<String>,
}

impl LlmAnalysisPayload {
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            ticker: self
                .ticker
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            trend: Trend::from_label(self.trend.as_deref()),
            current_price: clean(self.current_price),
            price_change: clean(self.price_change),
            sentiment: Sentiment::from_label(self.sentiment.as_deref()),
            headlines: clean_lines(self.headlines),
            reasons: clean_lines(self.reasons),
            summary: clean(self.summary),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn clean_lines(lines: Option<Vec<String>>) -> Vec<String> {
    lines
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Models report prices both as "189.50" and as 189.5.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
