use thiserror::Error;

/// Argument problems detected before or during tool execution.
///
/// The `Display` form is the `reason` reported back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("missing_required:{0}")]
    MissingRequired(String),
    #[error("invalid_argument:{0}")]
    InvalidArgument(String),
}
