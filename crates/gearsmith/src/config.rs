//! Gearsmith configuration

use anyhow::Result;
use beacon_lib::EmptyCyclePolicy;
use serde::Deserialize;
use std::time::Duration;

/// Gearsmith configuration, loaded from `GEARSMITH_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct GearsmithConfig {
    /// Poll period for the discover/scrape/aggregate cycle in seconds
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Port the beacons expose their gauges on
    #[serde(default = "default_scrape_port")]
    pub scrape_port: u16,

    /// Per-pod scrape timeout in seconds
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,

    /// What a beacon's sample becomes when a cycle yields no readings
    #[serde(default)]
    pub empty_cycle_policy: EmptyCyclePolicy,

    /// Custom-metrics bind address and port
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// TLS credentials for the custom-metrics port
    #[serde(default = "default_tls_cert")]
    pub tls_cert: String,
    #[serde(default = "default_tls_key")]
    pub tls_key: String,

    /// Mounted service-account namespace file
    #[serde(default = "default_namespace_file")]
    pub namespace_file: String,
}

fn default_poll_secs() -> u64 {
    5
}

fn default_scrape_port() -> u16 {
    1333
}

fn default_scrape_timeout_secs() -> u64 {
    3
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    6443
}

fn default_tls_cert() -> String {
    "/cert/tls.crt".to_string()
}

fn default_tls_key() -> String {
    "/cert/tls.key".to_string()
}

fn default_namespace_file() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace".to_string()
}

impl Default for GearsmithConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            scrape_port: default_scrape_port(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            empty_cycle_policy: EmptyCyclePolicy::default(),
            bind_addr: default_bind_addr(),
            bind_port: default_bind_port(),
            tls_cert: default_tls_cert(),
            tls_key: default_tls_key(),
            namespace_file: default_namespace_file(),
        }
    }
}

impl GearsmithConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GEARSMITH"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GearsmithConfig::default();
        assert_eq!(config.poll_secs, 5);
        assert_eq!(config.scrape_port, 1333);
        assert_eq!(config.scrape_timeout_secs, 3);
        assert_eq!(config.bind_port, 6443);
        assert_eq!(config.empty_cycle_policy, EmptyCyclePolicy::Zero);
        assert_eq!(config.tls_cert, "/cert/tls.crt");
        assert_eq!(config.tls_key, "/cert/tls.key");
    }

    #[test]
    fn test_empty_cycle_policy_parses() {
        let policy: EmptyCyclePolicy = serde_json::from_str("\"holdlast\"").unwrap();
        assert_eq!(policy, EmptyCyclePolicy::HoldLast);
    }
}
