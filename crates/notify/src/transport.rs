//! Mail transport abstraction.

use async_trait::async_trait;

use crate::Result;

/// A single outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends one message over some concrete protocol.
///
/// Implementations make exactly one attempt per call. Timeouts and retries
/// are the caller's concern.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver the envelope.
    async fn deliver(&self, envelope: &Envelope) -> Result<()>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
