//! Outbound email. Delivery is fire-and-forget from the server's point of
//! view: callers log failures and never propagate them.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message: {0}")]
    Rejected(String),
}

/// Backend that delivers transactional mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the address-confirmation message for a fresh signup.
    /// `confirm_url` already embeds the confirmation token.
    async fn send_confirmation(
        &self,
        email: &str,
        username: &str,
        confirm_url: &str,
    ) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub from: String,
}

/// Mailgun HTTP API backend.
pub struct MailgunMailer {
    config: MailConfig,
    client: reqwest::Client,
}

impl MailgunMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!("https://api.mailgun.net/v3/{}/messages", self.config.domain)
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send_confirmation(
        &self,
        email: &str,
        username: &str,
        confirm_url: &str,
    ) -> Result<(), MailError> {
        let body = format!(
            "Hi {username},\n\nConfirm your email address by opening the link below:\n\n{confirm_url}\n"
        );

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.config.api_key))
            .form(&[
                ("from", self.config.from.as_str()),
                ("to", email),
                ("subject", "Confirm your email"),
                ("text", body.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{status}: {text}")));
        }

        Ok(())
    }
}

/// Mailer that only logs. Used when no mail credentials are configured and
/// in tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(
        &self,
        email: &str,
        username: &str,
        confirm_url: &str,
    ) -> Result<(), MailError> {
        tracing::info!(email, username, confirm_url, "confirmation mail (log only)");
        Ok(())
    }
}
