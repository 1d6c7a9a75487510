//! SMTP transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Mailbox, Message, header::ContentType},
    transport::smtp::{AsyncSmtpTransportBuilder, authentication::Credentials},
};
use tokio::sync::OnceCell;

use crate::config::MailConfig;
use crate::transport::{Envelope, MailTransport};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Security {
    /// TLS from the first byte.
    Implicit,
    StartTls,
    Plaintext,
}

/// Delivers notifications through an SMTP relay.
///
/// The pooled lettre transport spawns onto the Tokio runtime when built, so
/// it is created on first delivery rather than in [`from_config`](Self::from_config).
pub struct SmtpMailer {
    host: String,
    port: u16,
    security: Security,
    credentials: Option<Credentials>,
    timeout: Duration,
    transport: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Build a mailer from the `[mail]` settings. Needs no runtime.
    ///
    /// `use_ssl` selects implicit TLS, otherwise `use_tls` selects STARTTLS,
    /// otherwise the connection is plaintext. Credentials are only sent when
    /// both username and password are set.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or(Error::MissingConfig("smtp_host"))?;

        let security = if config.use_ssl() {
            Security::Implicit
        } else if config.use_tls() {
            Security::StartTls
        } else {
            Security::Plaintext
        };
        // Surface bad TLS parameters now rather than on the first send.
        relay_builder(host, security)?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        };

        Ok(Self {
            host: host.to_string(),
            port: config.port(),
            security,
            credentials,
            timeout: config.timeout(),
            transport: OnceCell::new(),
        })
    }

    async fn transport(&self) -> Result<&AsyncSmtpTransport<Tokio1Executor>> {
        self.transport
            .get_or_try_init(|| async {
                let mut builder = relay_builder(&self.host, self.security)?
                    .port(self.port)
                    .timeout(Some(self.timeout));
                if let Some(credentials) = &self.credentials {
                    builder = builder.credentials(credentials.clone());
                }
                Ok::<_, Error>(builder.build())
            })
            .await
    }
}

fn relay_builder(host: &str, security: Security) -> Result<AsyncSmtpTransportBuilder> {
    match security {
        Security::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        Security::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        Security::Plaintext => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
    }
    .map_err(|e| Error::InvalidConfig(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, envelope: &Envelope) -> Result<()> {
        let message = build_message(envelope)?;
        self.transport()
            .await?
            .send(message)
            .await
            .map_err(|e| Error::Delivery(format!("smtp {}: {e}", self.host)))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

fn build_message(envelope: &Envelope) -> Result<Message> {
    Message::builder()
        .from(parse_mailbox(&envelope.from)?)
        .to(parse_mailbox(&envelope.to)?)
        .subject(&envelope.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(envelope.body.clone())
        .map_err(|e| Error::Delivery(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|e: lettre::address::AddressError| Error::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}
