//! Closed registry mapping tool names to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use notify::Notifier;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::ToolSpec;
use crate::tools::record::{RecordUnknownQuestion, RecordUserDetails};
use crate::tools::{Tool, ToolArguments, ToolResult};

/// The fixed set of tools offered to the model.
///
/// Built once at startup and shared read-only between conversations. The
/// spec list handed to the backend is derived from the registered tools, so
/// it always matches what can actually be executed.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recording tools, notifying through `notifier`.
    pub fn standard(notifier: Arc<dyn Notifier>, subject_tag: &str) -> Self {
        Self::new()
            .register(RecordUserDetails::new(notifier.clone(), subject_tag))
            .register(RecordUnknownQuestion::new(notifier, subject_tag))
    }

    /// Add a tool. A tool with the same name replaces the earlier one.
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        let spec = tool.spec().clone();
        match self.index.get(&spec.name) {
            Some(&i) => {
                self.tools[i] = Box::new(tool);
                self.specs[i] = spec;
            }
            None => {
                self.index.insert(spec.name.clone(), self.tools.len());
                self.tools.push(Box::new(tool));
                self.specs.push(spec);
            }
        }
        self
    }

    /// Specs in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Execute a tool by name. Never fails.
    ///
    /// Unknown tools yield [`ToolResult::Empty`]; missing or malformed
    /// arguments yield [`ToolResult::Rejected`].
    pub async fn execute(&self, name: &str, arguments: &Value) -> ToolResult {
        let Some(&i) = self.index.get(name) else {
            warn!(tool = name, "model requested unknown tool");
            return ToolResult::Empty;
        };
        let tool = &self.tools[i];

        let args = ToolArguments::from_value(arguments);
        if let Err(e) = args.check_required(&tool.spec().required) {
            warn!(tool = name, error = %e, "tool call rejected");
            return ToolResult::rejected(e);
        }

        let result = match tool.call(&args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool call rejected");
                ToolResult::rejected(e)
            }
        };
        debug!(tool = name, result = %result.to_content(), "tool finished");
        result
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
