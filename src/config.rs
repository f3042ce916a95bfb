use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://engine.prod.bria-api.com/v1";

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
    /// 1.0 keeps the interval fixed between attempts.
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub max_concurrent_probes: usize,
    pub poll: PollConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            max_attempts: 3,
            interval: Duration::from_secs(2),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    /// Delay to wait after `current`, clamped to `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return current.min(self.max_interval);
        }
        let next_ms = (current.as_millis() as f64 * self.backoff_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_interval)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            max_concurrent_probes: 4,
            poll: PollConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = StudioConfig::default();
        let secs = |key: &str| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let poll = PollConfig {
            max_attempts: env::var("BRIA_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll.max_attempts),
            interval: env::var("BRIA_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll.interval),
            ..defaults.poll
        };

        StudioConfig {
            api_key: env::var("BRIA_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("BRIA_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout: secs("BRIA_REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
            probe_timeout: secs("BRIA_PROBE_TIMEOUT_SECS").unwrap_or(defaults.probe_timeout),
            max_concurrent_probes: env::var("BRIA_MAX_CONCURRENT_PROBES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_probes),
            poll,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeouts(mut self, request: Duration, probe: Duration) -> Self {
        self.request_timeout = request;
        self.probe_timeout = probe;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_max_concurrent_probes(mut self, limit: usize) -> Self {
        self.max_concurrent_probes = limit;
        self
    }

    /// Joins `path` onto the base URL with exactly one separating slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.poll.max_attempts, 3);
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_endpoint_join() {
        let config = StudioConfig::new().with_base_url("http://localhost:1234/v1/");
        assert_eq!(
            config.endpoint("/product/packshot"),
            "http://localhost:1234/v1/product/packshot"
        );
    }

    #[test]
    fn test_next_interval() {
        let fixed = PollConfig::default();
        assert_eq!(fixed.next_interval(Duration::from_secs(2)), Duration::from_secs(2));

        let backoff = PollConfig::new().with_backoff(2.0, Duration::from_secs(5));
        assert_eq!(backoff.next_interval(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(backoff.next_interval(Duration::from_secs(4)), Duration::from_secs(5));
    }
}
