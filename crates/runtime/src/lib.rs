//! Persona agent runtime: the tool-calling conversation loop.
//!
//! # Overview
//!
//! - **ConversationEngine**: drives one user turn to a final answer, looping
//!   between the model and the tools it asks for.
//! - **Backend**: a trait abstracting LLM providers (OpenAI-compatible,
//!   Anthropic).
//! - **ToolRegistry**: the closed set of tools offered to the model.
//! - **PersonaContext**: who the agent speaks for, and the system instruction
//!   rendered from that.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use notify::NotificationSink;
//! use runtime::{ConversationEngine, OpenAiBackend, PersonaContext, ToolRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = OpenAiBackend::builder("sk-...", "gpt-4o-mini").build()?;
//! let persona = Arc::new(PersonaContext::new("Ada Lovelace", "...", "..."));
//! let tools = Arc::new(ToolRegistry::standard(
//!     Arc::new(NotificationSink::unconfigured()),
//!     "[Ada Agent]",
//! ));
//!
//! let engine = ConversationEngine::new(backend, persona, tools);
//! let reply = engine.chat("What did you work on?", &[]).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
pub mod model;
mod persona;
pub mod providers;
pub mod tools;

pub use engine::{
    ConversationEngine, DEFAULT_MAX_RETRIES, DEFAULT_MAX_ROUNDS, DEFAULT_RETRY_BACKOFF,
    EngineOptions, TurnReport,
};
pub use error::{Error, Result};
pub use model::{Backend, Message, ModelError, Role, ToolCall, ToolSpec};
pub use persona::{PersonaContext, render_instruction};
pub use providers::{AnthropicBackend, AnyBackend, OpenAiBackend};
pub use tools::{Tool, ToolRegistry, ToolResult};
