pub const EMIT_ANALYSIS_TOOL: &str = "emit_analysis";

fn output_shape(ticker: &str) -> String {
    [
        "{".to_string(),
        format!("  \"ticker\": \"{ticker}\","),
        "  \"trend\": \"up/down/stable\",".to_string(),
        "  \"currentPrice\": \"approximate price if available\",".to_string(),
        "  \"priceChange\": \"percentage change if available\",".to_string(),
        "  \"sentiment\": \"positive/negative/neutral\",".to_string(),
        "  \"headlines\": [\"headline 1\", \"headline 2\", \"headline 3\"],".to_string(),
        "  \"reasons\": [\"reason 1\", \"reason 2\", \"reason 3\"],".to_string(),
        "  \"summary\": \"brief overall summary\"".to_string(),
        "}".to_string(),
    ]
    .join("\n")
}

fn task(ticker: &str) -> String {
    format!(
        "Search for the latest news about {ticker} stock and analyze:\n\
1. Current stock price trend (up/down/stable)\n\
2. Recent news headlines affecting the stock\n\
3. Sentiment analysis (positive/negative/neutral)\n\
4. Key bullet points explaining why the stock is moving based on the news"
    )
}

/// Instruction for the text path: the answer must contain one JSON object.
pub fn analysis_prompt(ticker: &str) -> String {
    format!(
        "{}\n\nFormat your response as JSON with this structure:\n{}\n\nOnly return the JSON object, no other text.",
        task(ticker),
        output_shape(ticker)
    )
}

/// Instruction for structured mode: the answer is reported through the emit tool.
pub fn structured_prompt(ticker: &str) -> String {
    format!(
        "{}\n\nWhen you are done searching, call the `{EMIT_ANALYSIS_TOOL}` tool exactly once with \
the analysis. Use ticker \"{ticker}\". If you cannot call the tool, reply with only a JSON object \
of this structure:\n{}",
        task(ticker),
        output_shape(ticker)
    )
}

pub fn emit_analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["ticker", "trend", "sentiment", "headlines", "reasons", "summary"],
        "properties": {
            "ticker": {"type": "string"},
            "trend": {"type": "string", "enum": ["up", "down", "stable"]},
            "currentPrice": {"type": ["string", "null"]},
            "priceChange": {"type": ["string", "null"]},
            "sentiment": {"type": "string", "enum": ["positive", "negative", "neutral"]},
            "headlines": {"type": "array", "items": {"type": "string"}},
            "reasons": {"type": "array", "items": {"type": "string"}},
            "summary": {"type": "string"}
        }
    })
}
