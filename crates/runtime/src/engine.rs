//! The tool-calling conversation loop.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::model::{Backend, Message, ModelRequest, ModelResponse, ToolCall};
use crate::persona::PersonaContext;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

pub const DEFAULT_MAX_ROUNDS: usize = 8;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Limits applied to every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Model calls allowed per turn before giving up.
    pub max_rounds: usize,
    /// Extra attempts for a model call that failed transiently.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further one.
    pub retry_backoff: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// A completed turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// The final answer.
    pub reply: String,
    /// The full working list: system instruction, history, the user message,
    /// every tool exchange and the final answer.
    pub messages: Vec<Message>,
    /// Model calls made (retries not counted).
    pub rounds: usize,
}

enum TurnState {
    AwaitingModel,
    ExecutingTools(Message),
    Done(String),
    Failed(Error),
}

/// Drives one user turn to a final answer, calling tools on the model's
/// behalf along the way.
///
/// Holds nothing mutable: one engine can serve any number of concurrent
/// conversations, and a failed or abandoned turn leaves it untouched.
pub struct ConversationEngine<B> {
    backend: B,
    persona: Arc<PersonaContext>,
    tools: Arc<ToolRegistry>,
    options: EngineOptions,
}

impl<B: Backend> ConversationEngine<B> {
    pub fn new(backend: B, persona: Arc<PersonaContext>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            persona,
            tools,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn persona(&self) -> &PersonaContext {
        &self.persona
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `user_message` given the prior `history` (without the system
    /// instruction, which is added here).
    pub async fn chat(&self, user_message: &str, history: &[Message]) -> Result<String> {
        self.run_turn(user_message, history)
            .await
            .map(|turn| turn.reply)
    }

    /// Like [`chat`](Self::chat), but also returns the transcript.
    pub async fn run_turn(&self, user_message: &str, history: &[Message]) -> Result<TurnReport> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.persona.instruction()));
        messages.extend_from_slice(history);
        messages.push(Message::user(user_message));

        let mut rounds = 0;
        let mut state = TurnState::AwaitingModel;
        loop {
            state = match state {
                TurnState::AwaitingModel if rounds >= self.options.max_rounds => {
                    TurnState::Failed(Error::ToolLoopExceeded { rounds })
                }
                TurnState::AwaitingModel => {
                    rounds += 1;
                    debug!(round = rounds, messages = messages.len(), "awaiting model");
                    match self.call_backend(&messages).await {
                        Ok(response) if response.is_final() => {
                            TurnState::Done(response.message.content)
                        }
                        Ok(response) => TurnState::ExecutingTools(response.message),
                        Err(e) => TurnState::Failed(e),
                    }
                }
                TurnState::ExecutingTools(request) => {
                    let calls = request.tool_calls.clone();
                    info!(round = rounds, count = calls.len(), "model requested tool calls");
                    messages.push(request);
                    messages.extend(self.execute_calls(&calls).await);
                    TurnState::AwaitingModel
                }
                TurnState::Done(reply) => {
                    debug!(rounds, "turn complete");
                    messages.push(Message::assistant(reply.clone()));
                    return Ok(TurnReport {
                        reply,
                        messages,
                        rounds,
                    });
                }
                TurnState::Failed(e) => {
                    error!(error = %e, rounds, "turn failed");
                    return Err(e);
                }
            };
        }
    }

    /// Run one round's calls concurrently; results come back in request order.
    async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<Message> {
        let pending = calls.iter().map(|call| async move {
            debug!(id = %call.id, tool = %call.name, "executing tool call");
            let result = self.tools.execute(&call.name, &call.input).await;
            Message::tool_result(call.id.clone(), result.to_content())
        });
        join_all(pending).await
    }

    async fn call_backend(&self, messages: &[Message]) -> Result<ModelResponse> {
        let request = ModelRequest {
            messages,
            tools: self.tools.specs(),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.backend.call(request).await {
                Ok(response) => {
                    debug!(
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "model responded"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempts <= self.options.max_retries => {
                    let delay = self.options.retry_backoff * 2u32.pow(attempts - 1);
                    warn!(error = %e, attempt = attempts, ?delay, "model call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(Error::BackendUnavailable { attempts, source }),
            }
        }
    }
}
