use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Connection URL, credentials and database index included.
    #[serde(default = "RedisConfig::default_url")]
    pub url: String,
    /// Prepended to every benchmark key.
    #[serde(default)]
    pub key_prefix: String,
    #[serde(
        with = "humantime_serde",
        default = "RedisConfig::default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    /// Upper bound on a single reply; unbounded when unset.
    #[serde(with = "humantime_serde", default)]
    pub response_timeout: Option<Duration>,
}

impl RedisConfig {
    fn default_url() -> String {
        String::from("redis://127.0.0.1:6379")
    }

    fn default_connect_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            key_prefix: String::new(),
            connect_timeout: Self::default_connect_timeout(),
            response_timeout: None,
        }
    }
}
