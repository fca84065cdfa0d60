//! Operator email messaging.
//!
//! The backend delivers mail; this module only wraps it with per-recipient
//! bulk sending and a simulated fallback for deployments where the email
//! endpoint is not configured.

use std::time::Duration;

use reqwest::Method;
use shared::{
    error::FieldError,
    protocol::{EmailAck, EmailRequest},
};
use tracing::{info, warn};

use crate::{config::Settings, error::ClientError, ApiClient};

const SIMULATION_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOutcome {
    pub attempted: usize,
    pub delivered: usize,
    pub failed_recipients: Vec<String>,
    pub simulated: bool,
    pub message: String,
}

impl EmailOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_recipients.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_recipients.is_empty() && self.delivered > 0
    }
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    api: ApiClient,
    pause: Duration,
    simulation_fallback: bool,
    sender: String,
}

impl EmailClient {
    pub fn new(api: ApiClient, settings: &Settings) -> Self {
        Self {
            api,
            pause: settings.email_send_pause(),
            simulation_fallback: settings.email_simulation_fallback,
            sender: settings.email_sender.clone(),
        }
    }

    /// One backend call for all recipients.
    pub async fn send(&self, request: &EmailRequest) -> Result<EmailOutcome, ClientError> {
        validate_request(request)?;
        let body = self
            .api
            .execute(
                self.api
                    .authorized(Method::POST, &["api", "emails", "send"])?
                    .json(request),
            )
            .await?;
        let ack = parse_ack(&body);

        let attempted = request.to.len();
        let failed = ack.failed_recipients;
        let delivered = attempted.saturating_sub(failed.len());
        Ok(EmailOutcome {
            attempted,
            delivered,
            message: ack
                .message
                .unwrap_or_else(|| format!("{delivered}/{attempted} emails sent")),
            failed_recipients: failed,
            simulated: false,
        })
    }

    /// Sends one message per recipient, pausing between sends.
    ///
    /// Individual failures are collected; an authentication failure aborts the
    /// run because every remaining send would be rejected the same way.
    pub async fn send_bulk(&self, request: &EmailRequest) -> Result<EmailOutcome, ClientError> {
        validate_request(request)?;
        let attempted = request.to.len();
        let mut delivered = 0;
        let mut failed_recipients = Vec::new();

        for (index, recipient) in request.to.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            let single = EmailRequest {
                to: vec![recipient.clone()],
                subject: request.subject.clone(),
                content: request.content.clone(),
            };
            match self.send(&single).await {
                Ok(outcome) if outcome.is_success() => delivered += 1,
                Ok(_) => failed_recipients.push(recipient.clone()),
                Err(err) if err.requires_reauth() => return Err(err),
                Err(err) => {
                    warn!(recipient = %recipient, %err, "email delivery failed");
                    failed_recipients.push(recipient.clone());
                }
            }
        }

        let message = if failed_recipients.is_empty() {
            format!("all emails sent ({delivered}/{attempted})")
        } else {
            format!(
                "{delivered}/{attempted} emails sent, {} failed",
                failed_recipients.len()
            )
        };
        info!(attempted, delivered, failed = failed_recipients.len(), "bulk email finished");
        Ok(EmailOutcome {
            attempted,
            delivered,
            failed_recipients,
            simulated: false,
            message,
        })
    }

    /// Falls back to [`EmailClient::simulate`] when the endpoint is missing or
    /// unreachable and the fallback is enabled.
    pub async fn send_with_fallback(
        &self,
        request: &EmailRequest,
    ) -> Result<EmailOutcome, ClientError> {
        match self.send(request).await {
            Ok(outcome) => Ok(outcome),
            Err(err @ (ClientError::NotFound(_) | ClientError::Fetch(_)))
                if self.simulation_fallback =>
            {
                warn!(%err, "email endpoint unavailable, simulating delivery");
                Ok(self.simulate(request))
            }
            Err(err) => Err(err),
        }
    }

    pub fn simulate(&self, request: &EmailRequest) -> EmailOutcome {
        let preview: String = request
            .content
            .chars()
            .take(SIMULATION_PREVIEW_CHARS)
            .collect();
        info!(
            from = %self.sender,
            recipients = ?request.to,
            subject = %request.subject,
            preview = %preview,
            "simulated email send"
        );
        let attempted = request.to.len();
        EmailOutcome {
            attempted,
            delivered: attempted,
            failed_recipients: Vec::new(),
            simulated: true,
            message: format!(
                "simulated {attempted} email(s); configure the backend email endpoint for real delivery"
            ),
        }
    }

    pub async fn test_configuration(&self) -> Result<String, ClientError> {
        let body = self
            .api
            .execute(
                self.api
                    .authorized(Method::POST, &["api", "emails", "test"])?,
            )
            .await?;
        let ack = parse_ack(&body);
        Ok(ack
            .message
            .unwrap_or_else(|| "email configuration verified".to_string()))
    }
}

/// Acks are informational; a body that is not an [`EmailAck`] counts as an
/// empty one.
fn parse_ack(body: &str) -> EmailAck {
    if body.trim().is_empty() {
        return EmailAck::default();
    }
    serde_json::from_str(body).unwrap_or_else(|err| {
        warn!(%err, body_len = body.len(), "email acknowledgement not understood");
        EmailAck::default()
    })
}

fn validate_request(request: &EmailRequest) -> Result<(), FieldError> {
    if request.to.is_empty() {
        return Err(FieldError::new("to", "at least one recipient is required"));
    }
    if let Some(bad) = request.to.iter().find(|to| !to.contains('@')) {
        return Err(FieldError::new("to", format!("'{bad}' is not an email address")));
    }
    if request.subject.trim().is_empty() {
        return Err(FieldError::new("subject", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/email_tests.rs"]
mod tests;
