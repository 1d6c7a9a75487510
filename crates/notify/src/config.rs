//! Mail transport configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SUBJECT_TAG: &str = "[Persona Agent]";
pub(crate) const MAILTRAP_SEND_URL: &str = "https://send.api.mailtrap.io/api/send";

/// Which mail transport delivers notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Smtp,
    Mailtrap,
}

impl std::str::FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "mailtrap" => Ok(Self::Mailtrap),
            other => Err(Error::InvalidConfig(format!("unknown transport '{other}'"))),
        }
    }
}

/// The `[mail]` section of the configuration.
///
/// Every field is optional so that a partially written file can be completed
/// from the environment with [`MailConfig::with_env`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Transport to use. Inferred when unset (see [`MailConfig::kind`]).
    pub transport: Option<TransportKind>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Implicit TLS on connect.
    pub use_ssl: Option<bool>,
    /// STARTTLS upgrade after connect. Ignored when `use_ssl` is set.
    pub use_tls: Option<bool>,
    pub mailtrap_token: Option<String>,
    pub mailtrap_endpoint: Option<String>,
    /// Sender address. Falls back to `username`.
    pub from: Option<String>,
    /// Operator address. Falls back to the sender.
    pub to: Option<String>,
    /// Prefix for notification subjects.
    pub subject_tag: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl MailConfig {
    /// Fill unset fields from the process environment.
    pub fn with_env(self) -> Self {
        self.fill_from(|key| std::env::var(key).ok())
    }

    /// Fill unset fields from `lookup`. Empty values count as unset.
    pub fn fill_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        if self.transport.is_none() {
            self.transport = get(&["MAIL_TRANSPORT"]).and_then(|v| v.parse().ok());
        }
        self.smtp_host = self.smtp_host.or_else(|| get(&["SMTP_HOST"]));
        if self.smtp_port.is_none() {
            self.smtp_port = get(&["SMTP_PORT"]).and_then(|v| v.trim().parse().ok());
        }
        self.username = self.username.or_else(|| get(&["SMTP_USERNAME", "SMTP_USER"]));
        self.password = self.password.or_else(|| get(&["SMTP_PASSWORD", "SMTP_PASS"]));
        if self.use_ssl.is_none() {
            self.use_ssl = get(&["SMTP_USE_SSL"]).map(|v| parse_flag(&v));
        }
        if self.use_tls.is_none() {
            self.use_tls = get(&["SMTP_USE_TLS"]).map(|v| parse_flag(&v));
        }
        self.mailtrap_token = self.mailtrap_token.or_else(|| get(&["MAILTRAP_API_KEY"]));
        self.from = self.from.or_else(|| get(&["EMAIL_FROM"]));
        self.to = self.to.or_else(|| get(&["EMAIL_TO", "OWNER_EMAIL"]));
        self
    }

    /// The configured transport, or the one implied by the settings present.
    ///
    /// A Mailtrap token without an SMTP host selects Mailtrap; anything else
    /// selects SMTP.
    pub fn kind(&self) -> TransportKind {
        match self.transport {
            Some(kind) => kind,
            None if self.smtp_host.is_none() && self.mailtrap_token.is_some() => {
                TransportKind::Mailtrap
            }
            None => TransportKind::Smtp,
        }
    }

    pub fn port(&self) -> u16 {
        self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl.unwrap_or(false)
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls.unwrap_or(true)
    }

    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }

    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().or_else(|| self.sender())
    }

    pub fn mailtrap_endpoint(&self) -> &str {
        self.mailtrap_endpoint.as_deref().unwrap_or(MAILTRAP_SEND_URL)
    }

    pub fn subject_tag(&self) -> &str {
        self.subject_tag.as_deref().unwrap_or(DEFAULT_SUBJECT_TAG)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Check that host/endpoint, sender and recipient are all present.
    pub fn check(&self) -> Result<()> {
        match self.kind() {
            TransportKind::Smtp if self.smtp_host.is_none() => {
                return Err(Error::MissingConfig("smtp_host"));
            }
            TransportKind::Mailtrap if self.mailtrap_token.is_none() => {
                return Err(Error::MissingConfig("mailtrap_token"));
            }
            _ => {}
        }
        if self.sender().is_none() {
            return Err(Error::MissingConfig("from"));
        }
        if self.recipient().is_none() {
            return Err(Error::MissingConfig("to"));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
