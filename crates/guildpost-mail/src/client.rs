use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A single outbound message. Multiple recipients means one API call
/// addressed to all of them, not one call per address.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    /// Connection refused, DNS failure, or the request timeout elapsing.
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail API rejected the send: HTTP {0}")]
    Rejected(u16),
}

/// Outbound mail transport. The domain layer only ever sees this trait;
/// tests substitute recording or failing implementations.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// JSON client for an HTTP mail delivery API.
///
/// The request timeout is set on the underlying client so a stalled
/// transport surfaces as a `Transport` error instead of blocking the
/// request that triggered the send.
pub struct HttpMailClient {
    http: reqwest::Client,
    base_url: String,
    from: String,
    api_token: String,
}

#[derive(Serialize)]
struct SendPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text_body: &'a str,
}

impl HttpMailClient {
    pub fn new(
        base_url: String,
        from: String,
        api_token: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            from,
            api_token,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .http
            .post(format!("{}/email", self.base_url))
            .header("X-Server-Token", &self.api_token)
            .json(&SendPayload {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                text_body: &email.body,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}
