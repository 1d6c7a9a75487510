//! Operator notifications for the persona agent.
//!
//! A [`NotificationSink`] delivers short text messages to a single operator
//! address through a [`MailTransport`] (SMTP or the Mailtrap send API). It
//! never fails: missing configuration turns every send into a logged no-op,
//! and delivery errors or timeouts come back as a [`NotificationOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use notify::{MailConfig, NotificationSink, Notifier};
//!
//! # async fn example() {
//! let config = MailConfig::default().with_env();
//! let sink = NotificationSink::from_config(&config);
//! let outcome = sink.send("The following question was asked:\n\n...", "[Site] Unknown question").await;
//! println!("{:?}", outcome.status);
//! # }
//! ```

mod config;
mod error;
mod mailtrap;
mod sink;
mod smtp;
mod transport;

pub use config::{MailConfig, TransportKind};
pub use error::{Error, Result};
pub use mailtrap::MailtrapMailer;
pub use sink::{DeliveryStatus, NotificationOutcome, NotificationSink, Notifier};
pub use smtp::SmtpMailer;
pub use transport::{Envelope, MailTransport};
