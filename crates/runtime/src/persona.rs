//! The identity the agent speaks for.

use crate::tools::{RECORD_UNKNOWN_QUESTION, RECORD_USER_DETAILS};

/// Persona name, knowledge context and the system instruction rendered from
/// them. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaContext {
    name: String,
    biography: String,
    profile: String,
    instruction: String,
}

impl PersonaContext {
    pub fn new(
        name: impl Into<String>,
        biography: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let biography = biography.into();
        let profile = profile.into();
        let instruction = render_instruction(&name, &biography, &profile);
        Self {
            name,
            biography,
            profile,
            instruction,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn biography(&self) -> &str {
        &self.biography
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// The system instruction sent at the start of every turn.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// Render the system instruction for a persona.
pub fn render_instruction(name: &str, biography: &str, profile: &str) -> String {
    format!(
        "You are acting as {name}. You are answering questions on {name}'s website, \
particularly questions related to {name}'s career, background, skills and experience. \
Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
You are given a summary of {name}'s background and profile which you can use to answer questions. \
Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
If you don't know the answer to any question, use your {RECORD_UNKNOWN_QUESTION} tool to record the question that you couldn't answer, \
even if it's about something trivial or unrelated to career. \
If the user is engaging in discussion, try to steer them towards getting in touch via email; \
ask for their email and record it using your {RECORD_USER_DETAILS} tool.\
\n\n## Biography:\n{biography}\n\n## Profile:\n{profile}\n\n\
With this context, please chat with the user, always staying in character as {name}."
    )
}
