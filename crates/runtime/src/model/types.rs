//! Core LLM types (provider-agnostic).
//!
//! These types represent the concepts shared across LLM providers.
//! Provider-specific details belong in the adapters under `providers`.

use super::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque identifier assigned by the provider; echoed back with the result.
    pub id: String,
    pub name: String,
    /// Arguments as a JSON object.
    pub input: Value,
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Set on tool-role messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on assistant messages that request tool calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Create a message with a role and text content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An assistant message requesting tool calls, with optional text.
    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::assistant(content)
        }
    }

    /// The result of one tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub schema: Value,
    /// Names of the parameters that must be present.
    pub required: Vec<String>,
}

impl ToolSpec {
    /// A tool taking no parameters yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": false,
            }),
            required: Vec::new(),
        }
    }

    /// Declare a string parameter.
    pub fn string_param(mut self, name: &str, description: &str, required: bool) -> Self {
        self.schema["properties"][name] = json!({
            "type": "string",
            "description": description,
        });
        if required {
            self.required.push(name.to_string());
            self.schema["required"] = json!(self.required);
        }
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Everything needed for a model request.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// The response from a model.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: Message,
    pub usage: Usage,
}

impl ModelResponse {
    /// A final answer carries no tool calls.
    pub fn is_final(&self) -> bool {
        !self.message.has_tool_calls()
    }
}

/// Trait for LLM provider backends.
pub trait Backend: Send + Sync {
    fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelResponse, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_message_carries_call_id() {
        let msg = Message::tool_result("call_1", r#"{"recorded":"ok"}"#);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn message_serializes_without_empty_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_request_is_not_final() {
        let response = ModelResponse {
            message: Message::tool_request(
                "",
                vec![ToolCall {
                    id: "1".into(),
                    name: "record_unknown_question".into(),
                    input: json!({"question": "?"}),
                }],
            ),
            usage: Usage::default(),
        };
        assert!(!response.is_final());
    }

    #[test]
    fn spec_schema_tracks_required() {
        let spec = ToolSpec::new("record_user_details", "Record a lead")
            .string_param("email", "The email address of this user", true)
            .string_param("name", "The user's name, if they provided it", false);

        assert_eq!(spec.required, vec!["email".to_string()]);
        assert_eq!(spec.schema["required"], json!(["email"]));
        assert_eq!(spec.schema["properties"]["name"]["type"], "string");
        assert_eq!(spec.schema["additionalProperties"], false);
    }
}
