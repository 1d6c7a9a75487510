//! Tool trait.

use crate::model::ToolSpec;
use crate::tools::{ToolArguments, ToolError, ToolResult};
use async_trait::async_trait;

/// A locally executable capability offered to the model.
///
/// This is the boundary between the model loop and side effects. A tool
/// reports argument problems as [`ToolError`]; everything else it handles
/// itself and reports through its [`ToolResult`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema offered to the model. Its `name` is the registry key.
    fn spec(&self) -> &ToolSpec;

    /// Run the tool. Required parameters have already been checked.
    async fn call(&self, args: &ToolArguments) -> Result<ToolResult, ToolError>;
}
