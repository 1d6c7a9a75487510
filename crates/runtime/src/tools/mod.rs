//! Tools the model can call.

pub mod errors;
mod record;
mod registry;
#[path = "trait.rs"]
mod tool;
mod types;

pub use errors::ToolError;
pub use record::{
    RECORD_UNKNOWN_QUESTION, RECORD_USER_DETAILS, RecordUnknownQuestion, RecordUserDetails,
    unknown_question_body, user_details_body,
};
pub use registry::ToolRegistry;
pub use tool::Tool;
pub use types::{ToolArguments, ToolResult};
