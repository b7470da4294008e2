//! Per-client connection, rate-limit and retry settings.

use std::time::Duration;

pub const MUSICBRAINZ_URL: &str = "https://musicbrainz.org";
pub const ACOUSTICBRAINZ_URL: &str = "https://acousticbrainz.org";

/// MusicBrainz requires every client to identify itself.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "songfacts/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/songfacts/songfacts )"
);

/// Settings for one API client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Minimum spacing between the starts of two requests.
    pub min_request_interval: Duration,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    fn with_defaults(base_url: &str, min_request_interval: Duration) -> Self {
        Self {
            base_url: base_url.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_request_interval,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// MusicBrainz allows one request per second.
    pub fn musicbrainz() -> Self {
        Self::with_defaults(MUSICBRAINZ_URL, Duration::from_secs(1))
    }

    pub fn acousticbrainz() -> Self {
        Self::with_defaults(ACOUSTICBRAINZ_URL, Duration::from_millis(500))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
