//! OpenAI-backed dataset agent.
//!
//! Each question starts a conversation on `POST {endpoint}/v1/chat/completions`
//! with the dataset profile as system message and the question, exactly as
//! received, as user message. The model computes over the full dataset by
//! calling the `query_dataset` tool; tool results are appended and the
//! conversation continues until the model replies with text.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use manifest_core::config::AgentConfig;
use manifest_core::Dataset;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::agent::DatasetAgent;
use crate::error::{make_snippet, AgentError};
use crate::prompt::system_prompt;
use crate::tools::{call_tool, tool_definition};

/// Chat-completions client pre-bound to one dataset.
#[derive(Debug)]
pub struct OpenAiAgent {
    client: reqwest::Client,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_tool_rounds: usize,
    url_chat: String,
    system: String,
    tools: Vec<Value>,
    dataset: Arc<Dataset>,
}

impl OpenAiAgent {
    /// Create an agent from config, the resolved API key and the dataset.
    ///
    /// # Errors
    /// - [`AgentError::InvalidConfig`] if the endpoint is not http(s), the
    ///   model is empty or the key cannot be used as a header value
    /// - [`AgentError::Transport`] if the HTTP client cannot be built
    pub fn new(
        cfg: &AgentConfig,
        api_key: &str,
        dataset: Arc<Dataset>,
    ) -> Result<Self, AgentError> {
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AgentError::InvalidConfig(format!(
                "endpoint must start with http:// or https://, got '{}'",
                cfg.endpoint
            )));
        }
        if cfg.model.trim().is_empty() {
            return Err(AgentError::InvalidConfig("model is empty".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AgentError::InvalidConfig(format!("invalid API key header: {e}")))?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()?;

        let url_chat = format!(
            "{}/v1/chat/completions",
            endpoint.trim_end_matches('/')
        );
        let system = system_prompt(&dataset, cfg.sample_rows);

        info!(
            model = %cfg.model,
            endpoint = %endpoint,
            timeout_secs = cfg.timeout_secs,
            max_tool_rounds = cfg.max_tool_rounds,
            rows = dataset.row_count(),
            prompt_len = system.len(),
            "OpenAiAgent initialized"
        );

        Ok(Self {
            client,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            max_tool_rounds: cfg.max_tool_rounds,
            url_chat,
            system,
            tools: vec![tool_definition()],
            dataset,
        })
    }

    /// The system message sent with every question.
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// One chat-completions round trip; returns the first choice's message.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, AgentError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: &self.tools,
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.model,
                latency_ms = started.elapsed().as_millis(),
                "chat completion returned non-success status"
            );

            return Err(AgentError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            error!(
                error = %e,
                model = %self.model,
                latency_ms = started.elapsed().as_millis(),
                "failed to decode chat completion response"
            );
            AgentError::Decode(format!("{e}; expected `choices[0].message`"))
        })?;

        debug!(
            model = %self.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion round completed"
        );

        out.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(AgentError::EmptyChoices)
    }

    /// Run one tool call and render its outcome for the model.
    fn run_tool(&self, call: &ToolCall) -> String {
        match call_tool(&self.dataset, &call.function.name, &call.function.arguments) {
            Ok(result) => {
                debug!(tool = %call.function.name, args = %call.function.arguments, "tool call succeeded");
                result.to_string()
            }
            Err(e) => {
                warn!(tool = %call.function.name, error = %e, "tool call failed");
                json!({ "error": e.to_string() }).to_string()
            }
        }
    }
}

#[async_trait]
impl DatasetAgent for OpenAiAgent {
    async fn answer(&self, question: &str) -> Result<String, AgentError> {
        let started = Instant::now();
        let mut messages = vec![
            ChatMessage::text("system", &self.system),
            ChatMessage::text("user", question),
        ];

        for round in 0..=self.max_tool_rounds {
            let message = self.complete(&messages).await?;

            if message.tool_calls.is_empty() {
                let content = message.content.ok_or(AgentError::EmptyChoices)?;
                info!(
                    model = %self.model,
                    tool_rounds = round,
                    answer_len = content.len(),
                    latency_ms = started.elapsed().as_millis(),
                    "chat completion completed"
                );
                return Ok(content);
            }

            if round == self.max_tool_rounds {
                break;
            }

            let results: Vec<ChatMessage> = message
                .tool_calls
                .iter()
                .map(|call| ChatMessage::tool_result(&call.id, self.run_tool(call)))
                .collect();
            messages.push(message);
            messages.extend(results);
        }

        error!(
            model = %self.model,
            max_tool_rounds = self.max_tool_rounds,
            "agent kept calling tools without answering"
        );
        Err(AgentError::ToolRounds(self.max_tool_rounds))
    }
}

// =============================================================================
// Wire payloads
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    tools: &'a [Value],
}

/// A chat message in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
