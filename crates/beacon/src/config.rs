//! Beacon configuration

use anyhow::Result;
use serde::Deserialize;

/// What a beacon instance serves; endpoints outside the role answer 400
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Serves `/timestamp`
    Clock,
    /// Serves `/telegram`
    Telegraphist,
    /// Serves `/emission` and `/calamity`
    Lightkeeper,
    /// Serves everything
    Schildwaechter,
    /// Chaos role: random liveness, hard exit on `/calamity`
    Agitator,
    /// Serves nothing but the root and internal endpoints
    #[serde(other)]
    Default,
}

impl Role {
    pub fn serves_clock(&self) -> bool {
        matches!(self, Role::Clock | Role::Schildwaechter)
    }

    pub fn serves_telegram(&self) -> bool {
        matches!(self, Role::Telegraphist | Role::Schildwaechter)
    }

    pub fn serves_lightkeeper(&self) -> bool {
        matches!(self, Role::Lightkeeper | Role::Schildwaechter)
    }
}

/// Beacon configuration, loaded from `GENTEEL_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct BeaconConfig {
    /// Display name of this beacon
    #[serde(default = "default_name")]
    pub name: String,

    /// Role served by this instance
    #[serde(default = "default_role")]
    pub role: Role,

    /// Public address and port (the gauge scrape target)
    #[serde(default = "default_app_addr")]
    pub app_addr: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,

    /// Internal address and port (health and metrics)
    #[serde(default = "default_int_addr")]
    pub int_addr: String,
    #[serde(default = "default_int_port")]
    pub int_port: u16,

    /// Remote clock base URL consulted by `/telegram`; local date otherwise
    #[serde(default)]
    pub clock: Option<String>,

    /// Remote chaos-chance flag source; hardcoded defaults otherwise
    #[serde(default)]
    pub chaos_flags_url: Option<String>,

    /// Poll period for the flag source in seconds
    #[serde(default = "default_chaos_poll_secs")]
    pub chaos_poll_secs: u64,

    /// Probability that a grease increment registers
    #[serde(default = "default_grease_register_chance")]
    pub grease_register_chance: f64,

    /// Replenish tick period in seconds
    #[serde(default = "default_replenish_secs")]
    pub replenish_secs: u64,

    /// Agitator role: percent chance the liveness probe answers healthy
    #[serde(default)]
    pub agitation: u32,

    /// Node name from the pod hostname
    #[serde(default = "default_node_name")]
    pub node_name: String,
}

fn default_name() -> String {
    "Genteel Beacon".to_string()
}

fn default_role() -> Role {
    Role::Default
}

fn default_app_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    1333
}

fn default_int_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_int_port() -> u16 {
    1337
}

fn default_chaos_poll_secs() -> u64 {
    30
}

fn default_grease_register_chance() -> f64 {
    0.5
}

fn default_replenish_secs() -> u64 {
    1
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown_host".to_string())
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            role: default_role(),
            app_addr: default_app_addr(),
            app_port: default_app_port(),
            int_addr: default_int_addr(),
            int_port: default_int_port(),
            clock: None,
            chaos_flags_url: None,
            chaos_poll_secs: default_chaos_poll_secs(),
            grease_register_chance: default_grease_register_chance(),
            replenish_secs: default_replenish_secs(),
            agitation: 0,
            node_name: default_node_name(),
        }
    }
}

impl BeaconConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GENTEEL"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
