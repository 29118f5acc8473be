use crate::config::Settings;
use crate::domain::analysis::AnalysisRequest;
use crate::llm::error::{AnalysisError, ErrorKind};
use crate::llm::prompt::{self, EMIT_ANALYSIS_TOOL};
use crate::llm::{LlmClient, LlmOutput, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
const WEB_SEARCH_TOOL_NAME: &str = "web_search";

#[derive(Debug, Clone)]
pub struct AnthropicOptions {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub web_search_max_uses: Option<u32>,
    /// Also offer the `emit_analysis` tool and prefer its input over free text.
    pub structured_output: bool,
}

impl Default for AnthropicOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            web_search_max_uses: None,
            structured_output: false,
        }
    }
}

impl AnthropicOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.base_url),
            model: std::env::var("ANTHROPIC_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model),
            max_tokens: std::env::var("ANTHROPIC_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(defaults.max_tokens),
            timeout_secs: std::env::var("ANTHROPIC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.timeout_secs),
            web_search_max_uses: std::env::var("ANTHROPIC_WEB_SEARCH_MAX_USES")
                .ok()
                .and_then(|s| s.parse::<u32>().ok()),
            structured_output: std::env::var("ANTHROPIC_STRUCTURED_OUTPUT")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.structured_output),
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    headers: HeaderMap,
    options: AnthropicOptions,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?;
        Self::new(api_key, AnthropicOptions::from_env())
    }

    pub fn new(api_key: &str, options: AnthropicOptions) -> anyhow::Result<Self> {
        let mut key = HeaderValue::from_str(api_key)
            .context("ANTHROPIC_API_KEY is not a valid header value")?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            headers,
            options,
        })
    }

    fn url(&self) -> String {
        format!("{}/v1/messages", self.options.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &AnalysisRequest) -> CreateMessageRequest {
        let mut tools = vec![Tool::WebSearch(WebSearchTool {
            kind: WEB_SEARCH_TOOL_TYPE,
            name: WEB_SEARCH_TOOL_NAME,
            max_uses: self.options.web_search_max_uses,
        })];

        let (content, tool_choice) = if self.options.structured_output {
            tools.push(Tool::Custom(CustomTool {
                name: EMIT_ANALYSIS_TOOL,
                description: "Report the finished stock news analysis as structured JSON",
                input_schema: prompt::emit_analysis_schema(),
            }));
            (
                prompt::structured_prompt(&request.ticker),
                Some(ToolChoice::Auto),
            )
        } else {
            (prompt::analysis_prompt(&request.ticker), None)
        };

        CreateMessageRequest {
            model: self.options.model.clone(),
            max_tokens: self.options.max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
            tools,
            tool_choice,
        }
    }

    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> Result<CreateMessageResponse, AnalysisError> {
        let res = self
            .http
            .post(self.url())
            .headers(self.headers.clone())
            .json(req)
            .send()
            .await
            .map_err(|e| network_error(format!("Anthropic request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| network_error(format!("failed to read Anthropic response body: {e}")))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ApiErrorEnvelope>(&text) {
                Ok(envelope) => format!(
                    "status={status} ({}: {})",
                    envelope.error.kind, envelope.error.message
                ),
                Err(_) => format!("status={status}"),
            };
            return Err(network_error(detail).with_raw_output(text));
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            network_error(format!("failed to decode Anthropic response: {e}")).with_raw_output(text)
        })
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            // Text next to search citations arrives split across blocks, so no separator.
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_input(res: &CreateMessageResponse) -> Option<serde_json::Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == EMIT_ANALYSIS_TOOL => {
                Some(input.clone())
            }
            _ => None,
        })
    }

    fn into_output(res: CreateMessageResponse) -> LlmOutput {
        LlmOutput {
            text: Self::response_text(&res),
            structured: Self::response_tool_input(&res),
        }
    }
}

fn network_error(detail: impl Into<String>) -> AnalysisError {
    AnalysisError::new(ErrorKind::NetworkError, detail)
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<LlmOutput, AnalysisError> {
        let req = self.build_request(request);
        tracing::debug!(
            ticker = %request.ticker,
            model = %req.model,
            structured = self.options.structured_output,
            "sending Anthropic messages request"
        );

        let res = self.create_message(&req).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                ticker = %request.ticker,
                max_tokens = self.options.max_tokens,
                "Anthropic stop_reason=max_tokens; analysis JSON is likely truncated"
            );
        }
        if let Some(usage) = &res.usage {
            tracing::info!(
                ticker = %request.ticker,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic request completed"
            );
        }

        Ok(Self::into_output(res))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Tool {
    WebSearch(WebSearchTool),
    Custom(CustomTool),
}

#[derive(Debug, Clone, Serialize)]
struct WebSearchTool {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_uses: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct CustomTool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "auto")]
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,

    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    // server_tool_use, web_search_tool_result, thinking, ...
    #[serde(other)]
    Unknown,
}
