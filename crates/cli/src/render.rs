use stonk_core::domain::analysis::{AnalysisResult, Trend};
use stonk_core::requestor::{RequestState, StateSnapshot};

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Stable | Trend::Unknown => "→",
    }
}

fn price_line(result: &AnalysisResult) -> Option<String> {
    let price = result.current_price.as_deref()?;
    let price = if price.starts_with('$') {
        price.to_string()
    } else {
        format!("${price}")
    };
    Some(match result.price_change.as_deref() {
        Some(change) => format!("{price} ({change})"),
        None => price,
    })
}

pub fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&result.ticker);
    if let Some(price) = price_line(result) {
        out.push_str("  ");
        out.push_str(&price);
    }
    out.push('\n');
    out.push_str(&format!(
        "Trend: {} {}    Sentiment: {}\n",
        trend_arrow(result.trend),
        result.trend,
        result.sentiment.as_str().to_uppercase()
    ));

    if let Some(summary) = &result.summary {
        out.push_str("\nSummary\n");
        out.push_str(&format!("  {summary}\n"));
    }

    if !result.headlines.is_empty() {
        out.push_str("\nRecent Headlines\n");
        for headline in &result.headlines {
            out.push_str(&format!("  • {headline}\n"));
        }
    }

    if !result.reasons.is_empty() {
        out.push_str("\nKey Factors Driving Stock Movement\n");
        for (idx, reason) in result.reasons.iter().enumerate() {
            out.push_str(&format!("  {}. {reason}\n", idx + 1));
        }
    }

    out
}

pub fn render_error(message: &str) -> String {
    format!("Error: {message}")
}

/// Text for a state transition in interactive mode. `Idle` prints nothing.
pub fn render_state(snapshot: &StateSnapshot, json: bool) -> Option<String> {
    if json {
        return serde_json::to_string(snapshot).ok();
    }
    let at = snapshot.updated_at.format("%H:%M:%S");
    match &snapshot.state {
        RequestState::Idle => None,
        RequestState::Loading { ticker } => Some(format!("[{at}] Analyzing {ticker}...")),
        RequestState::Succeeded(result) => Some(format!("[{at}]\n{}", render_result(result))),
        RequestState::Failed { message, .. } => Some(format!("[{at}] {}", render_error(message))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stonk_core::domain::analysis::Sentiment;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            ticker: "AAPL".to_string(),
            trend: Trend::Up,
            current_price: Some("189.50".to_string()),
            price_change: Some("+1.2%".to_string()),
            sentiment: Sentiment::Positive,
            headlines: vec!["Apple beats estimates".to_string()],
            reasons: vec!["Services growth".to_string(), "Buybacks".to_string()],
            summary: Some("Momentum after earnings.".to_string()),
        }
    }

    #[test]
    fn renders_all_sections() {
        let text = render_result(&sample());
        assert!(text.starts_with("AAPL  $189.50 (+1.2%)\n"));
        assert!(text.contains("Trend: ↑ up    Sentiment: POSITIVE"));
        assert!(text.contains("Summary\n  Momentum after earnings."));
        assert!(text.contains("  • Apple beats estimates"));
        assert!(text.contains("  1. Services growth\n  2. Buybacks"));
    }

    #[test]
    fn skips_empty_sections() {
        let result = AnalysisResult {
            ticker: "XYZ".to_string(),
            trend: Trend::Unknown,
            current_price: None,
            price_change: None,
            sentiment: Sentiment::Unknown,
            headlines: vec![],
            reasons: vec![],
            summary: None,
        };
        let text = render_result(&result);
        assert_eq!(text, "XYZ\nTrend: → unknown    Sentiment: UNKNOWN\n");
    }

    #[test]
    fn does_not_double_dollar_sign() {
        let mut result = sample();
        result.current_price = Some("$190".to_string());
        result.price_change = None;
        assert_eq!(price_line(&result).as_deref(), Some("$190"));
    }
}
