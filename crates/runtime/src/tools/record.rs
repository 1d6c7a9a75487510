//! The two recording tools: captured leads and unanswered questions.
//!
//! Both are best-effort: they report `{"recorded":"ok"}` once the
//! notification has been attempted, whatever the delivery outcome.

use std::sync::Arc;

use async_trait::async_trait;
use notify::Notifier;
use tracing::{info, warn};

use crate::model::ToolSpec;
use crate::tools::{Tool, ToolArguments, ToolError, ToolResult};

pub const RECORD_USER_DETAILS: &str = "record_user_details";
pub const RECORD_UNKNOWN_QUESTION: &str = "record_unknown_question";

const NAME_NOT_PROVIDED: &str = "Name not provided";
const NOTES_NOT_PROVIDED: &str = "not provided";

pub fn user_details_body(email: &str, name: &str, notes: &str) -> String {
    format!("The following user info was collected...\n\nName: {name}\nEmail: {email}\nNotes: {notes}")
}

pub fn unknown_question_body(question: &str) -> String {
    format!("The following question was asked:\n\n{question}")
}

/// Records that a user wants to get in touch.
pub struct RecordUserDetails {
    spec: ToolSpec,
    notifier: Arc<dyn Notifier>,
    subject: String,
}

impl RecordUserDetails {
    pub fn new(notifier: Arc<dyn Notifier>, subject_tag: &str) -> Self {
        let spec = ToolSpec::new(
            RECORD_USER_DETAILS,
            "Use this tool to record that a user is interested in being in touch and provided an email address",
        )
        .string_param("email", "The email address of this user", true)
        .string_param("name", "The user's name, if they provided it", false)
        .string_param(
            "notes",
            "Any additional information about the conversation that's worth recording to give context",
            false,
        );

        Self {
            spec,
            notifier,
            subject: format!("{subject_tag} New user details"),
        }
    }
}

#[async_trait]
impl Tool for RecordUserDetails {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArguments) -> Result<ToolResult, ToolError> {
        let email = args.require("email")?;
        let name = args.optional("name")?.unwrap_or(NAME_NOT_PROVIDED);
        let notes = args.optional("notes")?.unwrap_or(NOTES_NOT_PROVIDED);
        info!(%email, %name, %notes, "recording user details");

        let outcome = self
            .notifier
            .send(&user_details_body(email, name, notes), &self.subject)
            .await;
        if !outcome.is_sent() {
            warn!(status = ?outcome.status, reason = ?outcome.reason, "user details not delivered");
        }
        Ok(ToolResult::Recorded)
    }
}

/// Records a question the persona could not answer.
pub struct RecordUnknownQuestion {
    spec: ToolSpec,
    notifier: Arc<dyn Notifier>,
    subject: String,
}

impl RecordUnknownQuestion {
    pub fn new(notifier: Arc<dyn Notifier>, subject_tag: &str) -> Self {
        let spec = ToolSpec::new(
            RECORD_UNKNOWN_QUESTION,
            "Always use this tool to record any question that couldn't be answered as you didn't know the answer",
        )
        .string_param("question", "The question that couldn't be answered", true);

        Self {
            spec,
            notifier,
            subject: format!("{subject_tag} Unknown question"),
        }
    }
}

#[async_trait]
impl Tool for RecordUnknownQuestion {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArguments) -> Result<ToolResult, ToolError> {
        let question = args.require("question")?;
        info!(%question, "recording unknown question");

        let outcome = self
            .notifier
            .send(&unknown_question_body(question), &self.subject)
            .await;
        if !outcome.is_sent() {
            warn!(status = ?outcome.status, reason = ?outcome.reason, "unknown question not delivered");
        }
        Ok(ToolResult::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::NotificationOutcome;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        outcome: Option<NotificationOutcome>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send(&self, body: &str, subject: &str) -> NotificationOutcome {
            self.sent
                .lock()
                .unwrap()
                .push((body.to_string(), subject.to_string()));
            self.outcome.clone().unwrap_or_else(NotificationOutcome::sent)
        }
    }

    #[tokio::test]
    async fn user_details_defaults() {
        let recorder = Arc::new(Recorder::default());
        let tool = RecordUserDetails::new(recorder.clone(), "[Site]");
        let args = ToolArguments::from_value(&json!({"email": "a@b.com"}));

        let result = tool.call(&args).await.unwrap();

        assert_eq!(result, ToolResult::Recorded);
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].0,
            "The following user info was collected...\n\nName: Name not provided\nEmail: a@b.com\nNotes: not provided"
        );
        assert_eq!(sent[0].1, "[Site] New user details");
    }

    #[tokio::test]
    async fn failed_delivery_still_recorded() {
        let recorder = Arc::new(Recorder {
            outcome: Some(NotificationOutcome::failed("connection refused")),
            ..Default::default()
        });
        let tool = RecordUnknownQuestion::new(recorder.clone(), "[Site]");
        let args = ToolArguments::from_value(&json!({"question": "Favourite colour?"}));

        let result = tool.call(&args).await.unwrap();

        assert_eq!(result, ToolResult::Recorded);
        let sent = recorder.sent.lock().unwrap();
        assert!(sent[0].0.ends_with("Favourite colour?"));
        assert_eq!(sent[0].1, "[Site] Unknown question");
    }

    #[tokio::test]
    async fn wrong_type_is_invalid() {
        let recorder = Arc::new(Recorder::default());
        let tool = RecordUserDetails::new(recorder.clone(), "[Site]");
        let args = ToolArguments::from_value(&json!({"email": "a@b.com", "notes": ["x"]}));

        let err = tool.call(&args).await.unwrap_err();

        assert_eq!(err, ToolError::InvalidArgument("notes".into()));
        assert!(recorder.sent.lock().unwrap().is_empty());
    }
}
