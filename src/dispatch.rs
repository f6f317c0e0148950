// src/dispatch.rs
//
// Outbound delivery: a transport seam (`MessageTransport`), the Twilio
// WhatsApp implementation, a mock for unconfigured deployments, and the
// batched `send_all` loop that tolerates per-recipient failure.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use crate::roster::Recipient;

/// Sends one message to one recipient. Implementations must not block
/// indefinitely; the Twilio client carries its own request timeout.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Returns a provider message id on success.
    async fn send_one(&self, to: &Recipient, body: &str) -> Result<String>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SendOutcome {
    pub recipient: Recipient,
    pub success: bool,
    /// Provider message id on success, error message on failure.
    pub detail: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DispatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub per_recipient: Vec<SendOutcome>,
}

/// Send `body` to every recipient in fixed-size batches. Within a batch all
/// sends run concurrently; between batches a fixed delay respects the
/// provider rate limit (skipped after the final batch). A failed send is
/// tallied with its error message, never re-thrown; an empty roster yields
/// a zero outcome with no delay.
pub async fn send_all(
    transport: &dyn MessageTransport,
    recipients: &[Recipient],
    body: &str,
    batch_size: usize,
    batch_delay: Duration,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome {
        total: recipients.len(),
        ..Default::default()
    };
    if recipients.is_empty() {
        return outcome;
    }

    let batches: Vec<&[Recipient]> = recipients.chunks(batch_size.max(1)).collect();
    let batch_count = batches.len();

    for (i, batch) in batches.into_iter().enumerate() {
        let results = join_all(batch.iter().map(|r| transport.send_one(r, body))).await;

        for (recipient, result) in batch.iter().zip(results) {
            match result {
                Ok(sid) => {
                    outcome.succeeded += 1;
                    outcome.per_recipient.push(SendOutcome {
                        recipient: recipient.clone(),
                        success: true,
                        detail: sid,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = ?e, recipient = %recipient, "send failed");
                    outcome.failed += 1;
                    outcome.per_recipient.push(SendOutcome {
                        recipient: recipient.clone(),
                        success: false,
                        detail: e.to_string(),
                    });
                }
            }
        }

        if i + 1 < batch_count {
            tokio::time::sleep(batch_delay).await;
        }
    }

    counter!("push_sent_total").increment(outcome.succeeded as u64);
    counter!("push_send_failures_total").increment(outcome.failed as u64);
    tracing::info!(
        total = outcome.total,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "dispatch complete"
    );
    outcome
}

/// Twilio WhatsApp transport (Messages API, form POST with basic auth).
pub struct TwilioWhatsApp {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioWhatsApp {
    /// Requires TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, and
    /// TWILIO_WHATSAPP_NUMBER; returns None when any is missing.
    pub fn from_env() -> Result<Option<Self>> {
        let (Ok(account_sid), Ok(auth_token), Ok(from_number)) = (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_WHATSAPP_NUMBER"),
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            account_sid,
            auth_token,
            from_number,
            client: crate::fetch::http_client()?,
        }))
    }
}

#[derive(serde::Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[async_trait]
impl MessageTransport for TwilioWhatsApp {
    async fn send_one(&self, to: &Recipient, body: &str) -> Result<String> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let form = [
            ("From", format!("whatsapp:{}", self.from_number)),
            ("To", format!("whatsapp:{to}")),
            ("Body", body.to_string()),
        ];

        let message: TwilioMessage = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .context("twilio post")?
            .error_for_status()
            .context("twilio non-2xx")?
            .json()
            .await
            .context("twilio response json")?;

        tracing::debug!(recipient = %to, sid = %message.sid, "message sent");
        Ok(message.sid)
    }
}

/// Degraded mode for deployments without Twilio credentials: logs the send
/// and deterministically reports success so the pipeline stays exercisable.
pub struct MockTransport;

#[async_trait]
impl MessageTransport for MockTransport {
    async fn send_one(&self, to: &Recipient, body: &str) -> Result<String> {
        let preview: String = body.chars().take(50).collect();
        tracing::info!(recipient = %to, preview = %preview, "[mock] would send message");
        Ok(format!("mock-{}", chrono::Utc::now().timestamp_millis()))
    }
}

/// Twilio when configured, mock otherwise.
pub fn transport_from_env() -> Result<Arc<dyn MessageTransport>> {
    match TwilioWhatsApp::from_env()? {
        Some(twilio) => {
            tracing::info!("WhatsApp transport configured (Twilio)");
            Ok(Arc::new(twilio))
        }
        None => {
            tracing::warn!(
                "Twilio not configured (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / \
                 TWILIO_WHATSAPP_NUMBER); sends will be mocked"
            );
            Ok(Arc::new(MockTransport))
        }
    }
}
