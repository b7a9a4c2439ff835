//! Pod gauge scraping
//!
//! Fetches a beacon pod's plain-text metrics exposition over HTTP and picks
//! out the genteelbeacon gauges with the shared prefix scanner.

use anyhow::Result;
use async_trait::async_trait;
use beacon_lib::{scan_gauges, GaugeValue};
use std::time::Duration;
use tracing::debug;

/// Where the poll cycle gets one pod's gauge readings from
#[async_trait]
pub trait GaugeSource: Send + Sync {
    async fn fetch_gauges(&self, address: &str) -> Result<Vec<GaugeValue>>;
}

/// `GaugeSource` that scrapes `http://<address>:<port>/metrics`
pub struct HttpScraper {
    client: reqwest::Client,
    port: u16,
}

impl HttpScraper {
    pub fn new(port: u16, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, port })
    }
}

#[async_trait]
impl GaugeSource for HttpScraper {
    async fn fetch_gauges(&self, address: &str) -> Result<Vec<GaugeValue>> {
        let url = format!("http://{address}:{}/metrics", self.port);
        debug!(url = %url, "Scraping pod gauges");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;

        Ok(scan_gauges(&body))
    }
}
