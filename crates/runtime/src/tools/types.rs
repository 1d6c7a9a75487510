//! Tool-related types.

use super::ToolError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// What a tool reports back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// `{"recorded":"ok"}`
    Recorded,
    /// `{"recorded":"error","reason":...}`
    Rejected { reason: String },
    /// `{}`: nothing was done, e.g. the tool does not exist.
    Empty,
}

impl ToolResult {
    pub fn rejected(error: ToolError) -> Self {
        Self::Rejected {
            reason: error.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Recorded => json!({"recorded": "ok"}),
            Self::Rejected { reason } => json!({"recorded": "error", "reason": reason}),
            Self::Empty => json!({}),
        }
    }

    /// Compact JSON text for a tool-role message.
    pub fn to_content(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Arguments of a tool call, as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    /// Anything that is not an object is treated as no arguments.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// Fail on the first name in `required` that is absent, null or blank.
    pub fn check_required(&self, required: &[String]) -> Result<(), ToolError> {
        for name in required {
            self.require(name)?;
        }
        Ok(())
    }

    /// A required string argument.
    pub fn require(&self, name: &str) -> Result<&str, ToolError> {
        self.optional(name)?
            .ok_or_else(|| ToolError::MissingRequired(name.to_string()))
    }

    /// An optional string argument. Null and blank strings count as absent.
    pub fn optional(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ToolError::InvalidArgument(name.to_string())),
        }
    }
}
