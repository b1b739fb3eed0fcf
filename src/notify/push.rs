use crate::agreement::Agreement;
use crate::config::PushConfig;
use crate::directory::TokenDirectory;
use crate::notify::payload::{build_company_payload, build_customer_payload, PushMessage};
use crate::notify::DispatchError;
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends notifications to the push backend over HTTPS.
///
/// One outbound POST per call. Each request carries the configured per-call
/// timeout; `Unreachable` failures are retried a bounded number of times with
/// jittered exponential backoff, while rejections and timeouts are terminal.
pub struct PushDispatcher {
    client: reqwest::Client,
    backend_url: String,
    server_key: String,
    company_topic: String,
    max_retries: u32,
    retry_base_delay: Duration,
    directory: Arc<dyn TokenDirectory>,
}

impl PushDispatcher {
    pub fn new(
        config: &PushConfig,
        server_key: String,
        directory: Arc<dyn TokenDirectory>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build push backend HTTP client")?;

        Ok(Self {
            client,
            backend_url: config.backend_url.clone(),
            server_key,
            company_topic: config.company_topic.clone(),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            directory,
        })
    }

    /// Broadcast an alert to the operating company topic.
    pub async fn notify_company(
        &self,
        agreement: &Agreement,
        message: &str,
    ) -> Result<(), DispatchError> {
        let payload = build_company_payload(&self.company_topic, agreement, message);
        debug!(
            agreement_id = %agreement.id,
            topic = %self.company_topic,
            "Dispatching company notification"
        );
        self.post_with_retry(&payload).await
    }

    /// Send an alert to the customer's registered device.
    ///
    /// Fails with `UnresolvedRecipient` when the customer has no device token
    /// in the directory; no request is made in that case.
    pub async fn notify_customer(
        &self,
        agreement: &Agreement,
        message: &str,
    ) -> Result<(), DispatchError> {
        let device_token = self
            .directory
            .device_token(&agreement.customer_id)
            .ok_or_else(|| DispatchError::UnresolvedRecipient(agreement.customer_id.clone()))?;

        let payload = build_customer_payload(&device_token, agreement, message);
        debug!(
            agreement_id = %agreement.id,
            customer_id = %agreement.customer_id,
            "Dispatching customer notification"
        );
        self.post_with_retry(&payload).await
    }

    async fn post_with_retry(&self, payload: &PushMessage) -> Result<(), DispatchError> {
        let mut attempt = 0u32;
        loop {
            match self.post(payload).await {
                Err(DispatchError::Unreachable(detail)) if attempt < self.max_retries => {
                    let delay = Self::backoff_delay(self.retry_base_delay, attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        detail = %detail,
                        "Push backend unreachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn post(&self, payload: &PushMessage) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.backend_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("key={}", self.server_key),
            )
            .json(payload)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DispatchError::TransportRejected(status.as_u16()))
        }
    }

    /// Exponential backoff with jitter: base * 2^attempt plus up to base/2.
    fn backoff_delay(base: Duration, attempt: u32) -> Duration {
        let exponential = base.saturating_mul(1u32 << attempt.min(6));
        let jitter_ms = rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 2).max(1));
        exponential + Duration::from_millis(jitter_ms)
    }
}

fn classify_send_error(error: reqwest::Error) -> DispatchError {
    if error.is_timeout() {
        DispatchError::TimedOut
    } else {
        DispatchError::Unreachable(error.to_string())
    }
}
