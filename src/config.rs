use std::time::Duration;

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Environment variable that overrides the backend base URL.
pub const BACKEND_URL_ENV: &str = "SITEGEN_BACKEND_URL";

/// Connection settings for [`GeneratorClient`](crate::GeneratorClient).
///
/// Use [`ClientConfig::builder()`] for ergonomic construction, or
/// [`ClientConfig::from_env()`] to honor `SITEGEN_BACKEND_URL`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the generation backend, without trailing slash.
    pub base_url: String,

    /// Timeout for `POST /api/generate`.
    pub submit_timeout: Duration,

    /// Timeout for status checks and single-file reads/writes.
    pub request_timeout: Duration,

    /// Timeout for project archive downloads.
    pub download_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            submit_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults, with the base URL taken from `SITEGEN_BACKEND_URL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.base_url = normalize(url.trim());
        }
        config
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the backend base URL. Trailing slashes are dropped.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.base_url = normalize(url.as_ref());
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.config.submit_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = timeout;
        self
    }

    /// Build the final [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

pub(crate) fn normalize(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Cadence and budget of a status poll loop.
///
/// The interval is constant; there is no backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between the end of one status check and the start of the next.
    pub interval: Duration,

    /// Status requests allowed before the loop gives up with a timeout.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    /// Dashboard cadence: every 5 seconds, 120 attempts (10 minutes).
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

impl PollPolicy {
    /// Static-page cadence: every 2 seconds, same 10 minute budget.
    pub fn rapid() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 300,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the attempt cap. Zero is bumped to one so at least one check runs.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Worst-case wall time before a timeout is declared.
    pub fn budget(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}
