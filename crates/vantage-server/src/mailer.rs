use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::Config;

/// Outbound transactional email. Callers treat dispatch as fire-and-forget:
/// failures are logged, never propagated into the user-facing result, because
/// the user can always self-heal through `resend`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(
        &self,
        to_email: &str,
        to_name: &str,
        verify_url: &str,
    ) -> anyhow::Result<()>;

    async fn send_welcome_email(
        &self,
        to_email: &str,
        to_name: &str,
        squad_url: &str,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    html_content: String,
}

pub struct BrevoMailer {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl BrevoMailer {
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            client: reqwest::Client::new(),
            api_key: config.brevo_api_key.clone()?,
            sender_email: config.brevo_sender_email.clone()?,
            sender_name: config.brevo_sender_name.clone(),
        })
    }

    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html: String,
    ) -> anyhow::Result<()> {
        let body = BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: to_email.to_string(),
                name: Some(to_name.to_string()),
            }],
            subject: subject.to_string(),
            html_content: html,
        };

        let resp = self
            .client
            .post("https://api.brevo.com/v3/smtp/email")
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Brevo request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Brevo send failed (status={status}): {text}");
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send_verification_email(
        &self,
        to_email: &str,
        to_name: &str,
        verify_url: &str,
    ) -> anyhow::Result<()> {
        let html = format!(
            "<p>Hey {to_name},</p>\
             <p>Confirm your email to lock in your spot on the Vantage waitlist:</p>\
             <p><a href=\"{verify_url}\">Verify my email</a></p>\
             <p>The link expires in 24 hours.</p>"
        );
        self.send(to_email, to_name, "Verify your email for Vantage", html)
            .await
    }

    async fn send_welcome_email(
        &self,
        to_email: &str,
        to_name: &str,
        squad_url: &str,
    ) -> anyhow::Result<()> {
        let html = format!(
            "<p>Hey {to_name},</p>\
             <p>You're on the Vantage waitlist. Invite friends to your squad room \
             to unlock rewards:</p>\
             <p><a href=\"{squad_url}\">{squad_url}</a></p>"
        );
        self.send(to_email, to_name, "Welcome to the Vantage waitlist", html)
            .await
    }
}

/// Stand-in when Brevo credentials are absent (local dev, CI).
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send_verification_email(
        &self,
        to_email: &str,
        _to_name: &str,
        verify_url: &str,
    ) -> anyhow::Result<()> {
        info!("Mail not configured; verification link for {to_email}: {verify_url}");
        Ok(())
    }

    async fn send_welcome_email(
        &self,
        to_email: &str,
        _to_name: &str,
        squad_url: &str,
    ) -> anyhow::Result<()> {
        info!("Mail not configured; welcome mail for {to_email}: {squad_url}");
        Ok(())
    }
}
