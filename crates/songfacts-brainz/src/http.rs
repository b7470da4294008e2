//! Rate-limited, retrying JSON GET shared by both clients.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::BrainzError;

/// Spaces request starts at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait until the next request may start.
    pub async fn acquire(&self) {
        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last_start = Some(Instant::now());
    }
}

pub(crate) struct HttpCore {
    http: Client,
    config: ClientConfig,
    limiter: RateLimiter,
}

impl HttpCore {
    pub(crate) fn new(config: ClientConfig) -> Result<Self, BrainzError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(BrainzError::ClientBuild)?;

        Ok(Self {
            http,
            limiter: RateLimiter::new(config.min_request_interval),
            config,
        })
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `endpoint` and parse the body as JSON.
    ///
    /// Returns `Ok(None)` on 404. Transient failures are retried with
    /// exponential backoff up to `max_attempts` total attempts.
    pub(crate) async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, BrainzError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_secs(300))
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 1;
        loop {
            match self.get_once(&url, endpoint, query).await {
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.config.retry_backoff);
                    warn!(
                        endpoint,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn get_once(
        &self,
        url: &str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, BrainzError> {
        self.limiter.acquire().await;
        debug!(endpoint, "sending request");

        let response = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrainzError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}
