//! Best-effort operator notifications.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{MailConfig, TransportKind};
use crate::mailtrap::MailtrapMailer;
use crate::smtp::SmtpMailer;
use crate::transport::{Envelope, MailTransport};
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Skipped,
    Failed,
}

/// Result of a [`Notifier::send`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl NotificationOutcome {
    pub fn sent() -> Self {
        Self {
            status: DeliveryStatus::Sent,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Skipped,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            reason: Some(reason.into()),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

/// Anything that can deliver a short text notification to the operator.
///
/// Implementations must not fail: every problem is reported through the
/// returned outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, body: &str, subject: &str) -> NotificationOutcome;
}

struct Route {
    transport: Box<dyn MailTransport>,
    from: String,
    to: String,
}

/// Sends notifications over a mail transport, or skips them when none is
/// configured.
pub struct NotificationSink {
    route: Option<Route>,
    skip_reason: &'static str,
    timeout: Duration,
}

impl NotificationSink {
    /// A sink with no transport. Every send is skipped.
    pub fn unconfigured() -> Self {
        Self {
            route: None,
            skip_reason: "missing_config",
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A sink delivering through `transport` from `from` to `to`.
    pub fn with_transport(
        transport: Box<dyn MailTransport>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            route: Some(Route {
                transport,
                from: from.into(),
                to: to.into(),
            }),
            skip_reason: "missing_config",
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a sink from the `[mail]` settings.
    ///
    /// Incomplete settings produce an unconfigured sink; a transport that
    /// cannot be constructed produces a sink that skips with `invalid_config`.
    pub fn from_config(config: &MailConfig) -> Self {
        if let Err(e) = config.check() {
            warn!(error = %e, "mail notifications disabled");
            return Self::unconfigured();
        }
        let (Some(from), Some(to)) = (config.sender(), config.recipient()) else {
            return Self::unconfigured();
        };

        match build_transport(config) {
            Ok(transport) => {
                info!(transport = transport.name(), %to, "mail notifications enabled");
                Self::with_transport(transport, from, to).timeout(config.timeout())
            }
            Err(e) => {
                warn!(error = %e, "mail transport unavailable, notifications disabled");
                Self {
                    skip_reason: "invalid_config",
                    ..Self::unconfigured()
                }
            }
        }
    }

    /// Bound each delivery attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.route.is_some()
    }
}

fn build_transport(config: &MailConfig) -> Result<Box<dyn MailTransport>> {
    Ok(match config.kind() {
        TransportKind::Smtp => Box::new(SmtpMailer::from_config(config)?),
        TransportKind::Mailtrap => Box::new(MailtrapMailer::from_config(config)?),
    })
}

#[async_trait]
impl Notifier for NotificationSink {
    async fn send(&self, body: &str, subject: &str) -> NotificationOutcome {
        let Some(route) = &self.route else {
            warn!(subject, reason = self.skip_reason, "notification skipped");
            debug!(body, "undelivered notification");
            return NotificationOutcome::skipped(self.skip_reason);
        };

        let envelope = Envelope {
            from: route.from.clone(),
            to: route.to.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        debug!(transport = route.transport.name(), to = %route.to, subject, "sending notification");
        let attempt = tokio::time::timeout(self.timeout, route.transport.deliver(&envelope)).await;
        let result = match attempt {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => {
                info!(to = %route.to, subject, "notification sent");
                NotificationOutcome::sent()
            }
            Err(e) => {
                warn!(error = %e, subject, "notification delivery failed");
                NotificationOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Outbox(Arc<Mutex<Vec<Envelope>>>);

    #[async_trait]
    impl MailTransport for Outbox {
        async fn deliver(&self, envelope: &Envelope) -> Result<()> {
            self.0.lock().unwrap().push(envelope.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "outbox"
        }
    }

    struct Refusing;

    #[async_trait]
    impl MailTransport for Refusing {
        async fn deliver(&self, _envelope: &Envelope) -> Result<()> {
            Err(Error::Delivery("550 mailbox unavailable".into()))
        }

        fn name(&self) -> &str {
            "refusing"
        }
    }

    struct Stalled;

    #[async_trait]
    impl MailTransport for Stalled {
        async fn deliver(&self, _envelope: &Envelope) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn unconfigured_sink_skips() {
        let sink = NotificationSink::unconfigured();
        let outcome = sink.send("hello", "subject").await;
        assert_eq!(outcome, NotificationOutcome::skipped("missing_config"));
        assert!(!sink.is_configured());
    }

    #[tokio::test]
    async fn default_config_skips() {
        let sink = NotificationSink::from_config(&MailConfig::default());
        let outcome = sink.send("hello", "subject").await;
        assert_eq!(outcome.status, DeliveryStatus::Skipped);
        assert_eq!(outcome.reason.as_deref(), Some("missing_config"));
    }

    #[test]
    fn smtp_sink_builds_outside_runtime() {
        let config = MailConfig {
            smtp_host: Some("localhost".into()),
            use_tls: Some(false),
            from: Some("bot@example.com".into()),
            ..Default::default()
        };
        let sink = NotificationSink::from_config(&config);
        assert!(sink.is_configured());
        assert_eq!(sink.timeout, config.timeout());
    }

    #[tokio::test]
    async fn delivers_once_through_transport() {
        let outbox = Outbox::default();
        let sink = NotificationSink::with_transport(
            Box::new(outbox.clone()),
            "bot@example.com",
            "owner@example.com",
        );

        let outcome = sink.send("body text", "[Site] Unknown question").await;

        assert!(outcome.is_sent());
        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
        assert_eq!(sent[0].subject, "[Site] Unknown question");
        assert_eq!(sent[0].body, "body text");
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_outcome() {
        let sink = NotificationSink::with_transport(Box::new(Refusing), "a@b.com", "c@d.com");
        let outcome = sink.send("body", "subject").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.reason.unwrap().contains("550"));
    }

    #[tokio::test]
    async fn slow_transport_times_out() {
        let sink = NotificationSink::with_transport(Box::new(Stalled), "a@b.com", "c@d.com")
            .timeout(Duration::from_millis(20));
        let outcome = sink.send("body", "subject").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.reason.unwrap().contains("timed out"));
    }

    #[test]
    fn outcome_serializes_compactly() {
        let json = serde_json::to_string(&NotificationOutcome::sent()).unwrap();
        assert_eq!(json, r#"{"status":"sent"}"#);
        let json = serde_json::to_string(&NotificationOutcome::skipped("missing_config")).unwrap();
        assert_eq!(json, r#"{"status":"skipped","reason":"missing_config"}"#);
    }
}
