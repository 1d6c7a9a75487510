//! Anthropic Messages API backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Role, ToolCall, ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<AnthropicBackend, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(AnthropicBackend {
            client,
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
        })
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    /// System messages become the top-level `system` field.
    fn system_prompt(messages: &[Message]) -> Option<String> {
        let parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }

    /// Convert the conversation to API messages.
    ///
    /// Tool results travel in user turns, so consecutive tool-role messages
    /// are folded into a single user message of `tool_result` blocks.
    /// Assistant turns with no text and no tool calls are dropped; the API
    /// rejects empty content anywhere but the final turn.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiMessage> {
        let mut out: Vec<ApiMessage> = Vec::new();
        let mut pending_results: Vec<ApiContentBlock> = Vec::new();

        for msg in messages.iter().filter(|m| m.role != Role::System) {
            if msg.role == Role::Assistant
                && !msg.has_tool_calls()
                && msg.content.trim().is_empty()
            {
                continue;
            }
            if msg.role == Role::Tool {
                pending_results.push(ApiContentBlock::ToolResult {
                    tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                    content: msg.content.clone(),
                });
                continue;
            }
            if !pending_results.is_empty() {
                out.push(ApiMessage {
                    role: "user",
                    content: ApiContent::Blocks(std::mem::take(&mut pending_results)),
                });
            }
            out.push(Self::message_to_api(msg));
        }

        if !pending_results.is_empty() {
            out.push(ApiMessage {
                role: "user",
                content: ApiContent::Blocks(pending_results),
            });
        }
        out
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let role = match msg.role {
            Role::Assistant => "assistant",
            Role::User | Role::System | Role::Tool => "user",
        };

        if !msg.has_tool_calls() {
            return ApiMessage {
                role,
                content: ApiContent::Text(msg.content.clone()),
            };
        }

        let mut blocks = Vec::with_capacity(msg.tool_calls.len() + 1);
        if !msg.content.is_empty() {
            blocks.push(ApiContentBlock::Text {
                text: msg.content.clone(),
            });
        }
        blocks.extend(msg.tool_calls.iter().map(|call| ApiContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        }));

        ApiMessage {
            role,
            content: ApiContent::Blocks(blocks),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        ApiTool {
            name: &spec.name,
            description: &spec.description,
            input_schema: &spec.schema,
        }
    }

    fn response_to_message(blocks: Vec<ApiResponseBlock>) -> Message {
        let mut text = String::new();
        let mut calls = Vec::new();
        for block in blocks {
            match block {
                ApiResponseBlock::Text { text: t } => text.push_str(&t),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    calls.push(ToolCall { id, name, input })
                }
                ApiResponseBlock::Unknown => {}
            }
        }
        Message::tool_request(text, calls)
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: Self::messages_to_api(request.messages),
            system: Self::system_prompt(request.messages),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let message = Self::response_to_message(api_response.content);
        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };

        Ok(ModelResponse { message, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transcript() -> Vec<Message> {
        vec![
            Message::system("Be Ada."),
            Message::user("Email me at a@b.com, and what's your shoe size?"),
            Message::tool_request(
                "",
                vec![
                    ToolCall {
                        id: "t1".into(),
                        name: "record_user_details".into(),
                        input: json!({"email": "a@b.com"}),
                    },
                    ToolCall {
                        id: "t2".into(),
                        name: "record_unknown_question".into(),
                        input: json!({"question": "shoe size"}),
                    },
                ],
            ),
            Message::tool_result("t1", r#"{"recorded":"ok"}"#),
            Message::tool_result("t2", r#"{"recorded":"ok"}"#),
        ]
    }

    #[test]
    fn system_lifted_out() {
        assert_eq!(
            AnthropicBackend::system_prompt(&transcript()).as_deref(),
            Some("Be Ada.")
        );
        assert_eq!(AnthropicBackend::system_prompt(&[Message::user("hi")]), None);
    }

    #[test]
    fn tool_results_folded_into_one_user_turn() {
        let api = AnthropicBackend::messages_to_api(&transcript());
        let value = serde_json::to_value(&api).unwrap();

        assert_eq!(api.len(), 3);
        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[1]["role"], "assistant");
        assert_eq!(value[1]["content"][0]["type"], "tool_use");
        assert_eq!(value[1]["content"][1]["id"], "t2");
        assert_eq!(value[2]["role"], "user");
        assert_eq!(
            value[2]["content"],
            json!([
                {"type": "tool_result", "tool_use_id": "t1", "content": "{\"recorded\":\"ok\"}"},
                {"type": "tool_result", "tool_use_id": "t2", "content": "{\"recorded\":\"ok\"}"},
            ])
        );
    }

    #[test]
    fn empty_assistant_turn_skipped() {
        let api = AnthropicBackend::messages_to_api(&[
            Message::system("Be Ada."),
            Message::user("hi"),
            Message::assistant(""),
            Message::user("again"),
        ]);
        let value = serde_json::to_value(&api).unwrap();
        assert_eq!(
            value,
            json!([
                {"role": "user", "content": "hi"},
                {"role": "user", "content": "again"},
            ])
        );
    }

    #[test]
    fn response_blocks_to_message() {
        let response: ApiResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me note that."},
                {"type": "tool_use", "id": "toolu_1", "name": "record_unknown_question", "input": {"question": "?"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 4}
        }))
        .unwrap();

        let message = AnthropicBackend::response_to_message(response.content);

        assert_eq!(message.content, "Let me note that.");
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "toolu_1");
    }

    #[test]
    fn display_names_model() {
        let backend = AnthropicBackend::builder("key", "claude-sonnet-4-20250514")
            .build()
            .unwrap();
        assert_eq!(backend.to_string(), "anthropic(claude-sonnet-4-20250514)");
    }
}
