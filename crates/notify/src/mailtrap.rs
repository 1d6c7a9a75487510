//! Mailtrap HTTP send API transport.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::MailConfig;
use crate::transport::{Envelope, MailTransport};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct ApiAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiSendRequest<'a> {
    from: ApiAddress<'a>,
    to: Vec<ApiAddress<'a>>,
    subject: &'a str,
    text: &'a str,
}

/// Delivers notifications through the Mailtrap send API.
pub struct MailtrapMailer {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl MailtrapMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let token = config
            .mailtrap_token
            .clone()
            .ok_or(Error::MissingConfig("mailtrap_token"))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.mailtrap_endpoint().to_string(),
            token,
        })
    }
}

fn request_body(envelope: &Envelope) -> ApiSendRequest<'_> {
    ApiSendRequest {
        from: ApiAddress {
            email: &envelope.from,
        },
        to: vec![ApiAddress {
            email: &envelope.to,
        }],
        subject: &envelope.subject,
        text: &envelope.body,
    }
}

#[async_trait]
impl MailTransport for MailtrapMailer {
    async fn deliver(&self, envelope: &Envelope) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request_body(envelope))
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("mailtrap: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Delivery(format!("mailtrap {status}: {body}")));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mailtrap"
    }
}
