use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysisPayload;
use crate::llm::error::{AnalysisError, ErrorKind};

/// First `{` through the last `}` of `text`, inclusive.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Drops every Markdown fence marker (```json and ```) from `span`, scanning left to
/// right and preferring ```json where both match.
pub fn strip_code_fences(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut rest = span;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        if let Some(after_lang) = rest.strip_prefix("json") {
            rest = after_lang;
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let span = extract_json_span(text).ok_or_else(|| {
        AnalysisError::new(
            ErrorKind::NoJsonFound,
            "response text contains no JSON object",
        )
        .with_raw_output(text)
    })?;

    let json_str = strip_code_fences(span);
    let payload = serde_json::from_str::<LlmAnalysisPayload>(&json_str).map_err(|e| {
        AnalysisError::new(ErrorKind::ParseError, e.to_string()).with_raw_output(json_str.clone())
    })?;
    Ok(payload.into_result())
}

pub fn parse_structured(value: serde_json::Value) -> Result<AnalysisResult, AnalysisError> {
    if !value.is_object() {
        return Err(AnalysisError::new(
            ErrorKind::ParseError,
            "structured output is not a JSON object",
        )
        .with_raw_output(value.to_string()));
    }
    let raw = value.to_string();
    let payload = serde_json::from_value::<LlmAnalysisPayload>(value).map_err(|e| {
        AnalysisError::new(ErrorKind::ParseError, e.to_string()).with_raw_output(raw)
    })?;
    Ok(payload.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Sentiment, Trend};
    use serde_json::json;

    #[test]
    fn extract_span_takes_first_open_to_last_close() {
        let s = "Here you go: {\"a\":{\"b\":1}} hope that helps }";
        assert_eq!(
            extract_json_span(s),
            Some("{\"a\":{\"b\":1}} hope that helps }")
        );
        assert_eq!(extract_json_span("prefix {\"a\":1} suffix"), Some("{\"a\":1}"));
    }

    #[test]
    fn extract_span_requires_close_after_open() {
        assert_eq!(extract_json_span("no json here"), None);
        assert_eq!(extract_json_span("} backwards {"), None);
        assert_eq!(extract_json_span("{ never closed"), None);
    }

    #[test]
    fn strip_fences_removes_markers_anywhere() {
        assert_eq!(strip_code_fences("{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences(" ```json\n{}\n``` "), "{}");
    }

    #[test]
    fn strip_fences_matches_leftmost_marker_first() {
        // The leading backtick belongs to no marker.
        assert_eq!(strip_code_fences("````json{}"), "`json{}");
        assert_eq!(strip_code_fences("{\"a\":\"```json```\"}"), "{\"a\":\"\"}");
        assert_eq!(strip_code_fences("{}``````"), "{}");
    }

    #[test]
    fn parses_fenced_response() {
        let text = "```json\n{\"ticker\":\"AAPL\",\"trend\":\"up\",\"sentiment\":\"positive\",\"headlines\":[\"H1\"],\"reasons\":[\"R1\"],\"summary\":\"S\"}\n```";
        let result = parse_analysis(text).unwrap();
        assert_eq!(result.ticker, "AAPL");
        assert_eq!(result.trend, Trend::Up);
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.headlines, vec!["H1"]);
        assert_eq!(result.reasons, vec!["R1"]);
        assert_eq!(result.summary.as_deref(), Some("S"));
        assert!(result.current_price.is_none());
        assert!(result.price_change.is_none());
    }

    #[test]
    fn parses_object_surrounded_by_prose() {
        let text = "I searched the news.\n{\"ticker\":\"MSFT\",\"trend\":\"stable\"}\nLet me know if you need more.";
        let result = parse_analysis(text).unwrap();
        assert_eq!(result.ticker, "MSFT");
        assert_eq!(result.trend, Trend::Stable);
    }

    #[test]
    fn missing_braces_is_no_json_found() {
        let err = parse_analysis("I could not find any news for that ticker.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoJsonFound);
        assert!(err.raw_output.is_some());
    }

    #[test]
    fn invalid_span_is_parse_error() {
        let err = parse_analysis("{\"ticker\": \"AAPL\", \"trend\": }").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);

        // Two objects make the greedy span invalid.
        let err = parse_analysis("{\"a\":1} and {\"b\":2}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
    }

    #[test]
    fn structured_value_is_decoded() {
        let result = parse_structured(json!({
            "ticker": "AMD",
            "trend": "down",
            "sentiment": "negative",
            "headlines": ["Export limits"],
        }))
        .unwrap();
        assert_eq!(result.ticker, "AMD");
        assert_eq!(result.trend, Trend::Down);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn structured_non_object_is_parse_error() {
        let err = parse_structured(json!(["AMD"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
    }
}
