use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AerospikeConfig {
    /// Seed hosts, `host:port[,host:port...]`.
    #[serde(default = "AerospikeConfig::default_hosts")]
    pub hosts: String,
    #[serde(default = "AerospikeConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "AerospikeConfig::default_set")]
    pub set: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Applied to cluster login and to every read, write and batch request.
    #[serde(with = "humantime_serde", default = "AerospikeConfig::default_timeout")]
    pub timeout: Duration,
    #[serde(default = "AerospikeConfig::default_max_retries")]
    pub max_retries: usize,
    /// Store the user key next to its digest.
    #[serde(default)]
    pub send_key: bool,
}

impl AerospikeConfig {
    fn default_hosts() -> String {
        String::from("127.0.0.1:3000")
    }

    fn default_namespace() -> String {
        String::from("test")
    }

    fn default_set() -> String {
        String::from("demo")
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(1)
    }

    fn default_max_retries() -> usize {
        2
    }
}

impl Default for AerospikeConfig {
    fn default() -> Self {
        Self {
            hosts: Self::default_hosts(),
            namespace: Self::default_namespace(),
            set: Self::default_set(),
            user: None,
            password: None,
            timeout: Self::default_timeout(),
            max_retries: Self::default_max_retries(),
            send_key: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aerospike_default() {
        let aerospike = AerospikeConfig::default();
        assert_eq!(aerospike.hosts, "127.0.0.1:3000");
        assert_eq!(aerospike.namespace, "test");
        assert_eq!(aerospike.set, "demo");
        assert_eq!(aerospike.max_retries, 2);
        assert!(!aerospike.send_key);
    }
}
