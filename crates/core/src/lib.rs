pub mod advisor;
pub mod cache;
pub mod domain;
pub mod projection;

pub mod config {
    use crate::advisor::poller::{PollConfig, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
    use std::path::PathBuf;
    use std::time::Duration;

    pub const DEFAULT_ADVISOR_BASE_URL: &str = "https://moneyfi.onrender.com";
    pub const DEFAULT_CACHE_DIR: &str = ".moneyfi";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub advisor_base_url: String,
        pub api_token: Option<String>,
        pub cache_dir: PathBuf,
        pub poll_max_attempts: u32,
        pub poll_interval_secs: u64,
        pub request_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                advisor_base_url: DEFAULT_ADVISOR_BASE_URL.to_string(),
                api_token: None,
                cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
                poll_max_attempts: DEFAULT_MAX_ATTEMPTS,
                poll_interval_secs: DEFAULT_INTERVAL.as_secs(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self::from_lookup(|key| std::env::var(key).ok()))
        }

        /// Unparseable numbers and blank strings fall back to the defaults.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let default = Self::default();
            let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

            Self {
                advisor_base_url: non_empty("ADVISOR_BASE_URL").unwrap_or(default.advisor_base_url),
                api_token: non_empty("MONEYFI_API_TOKEN"),
                cache_dir: non_empty("MONEYFI_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(default.cache_dir),
                poll_max_attempts: non_empty("POLL_MAX_ATTEMPTS")
                    .and_then(|s| s.parse::<u32>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(default.poll_max_attempts),
                poll_interval_secs: non_empty("POLL_INTERVAL_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(default.poll_interval_secs),
                request_timeout_secs: non_empty("ADVISOR_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(default.request_timeout_secs),
                sentry_dsn: non_empty("SENTRY_DSN"),
            }
        }

        pub fn poll_config(&self) -> anyhow::Result<PollConfig> {
            PollConfig::new(
                self.poll_max_attempts,
                Duration::from_secs(self.poll_interval_secs),
            )
        }
    }

}
