use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::models::{Bar, BarSeries, DpLevel, DpLevelSet};
use crate::providers::{BarProvider, LevelProvider};

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct LevelsResponse {
    prints: Vec<RawLevel>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    price: f64,
    volume: u64,
    #[serde(default)]
    trade_count: u32,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    bars: Vec<RawBar>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    // Epoch seconds
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Live dark-pool print client. Paced between requests so session-wide
/// backfills stay under the provider's rate limit.
pub struct DarkPoolClient {
    client: Client,
    base_url: String,
    last_request: Option<Instant>,
}

impl DarkPoolClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            last_request: None,
        }
    }

    async fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[async_trait]
impl LevelProvider for DarkPoolClient {
    async fn fetch_levels(&mut self, symbol: &str, date: NaiveDate) -> Result<DpLevelSet> {
        self.pace().await;

        let url = format!("{}/darkpool/levels", self.base_url);
        let date_str = date.format("%Y-%m-%d").to_string();
        let resp: LevelsResponse = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("date", date_str.as_str())])
            .send()
            .await
            .with_context(|| format!("requesting dark-pool levels for {symbol}"))?
            .error_for_status()?
            .json()
            .await
            .context("decoding dark-pool levels response")?;

        let levels = resp
            .prints
            .into_iter()
            .map(|r| DpLevel::new(r.price, r.volume, r.trade_count))
            .collect();

        Ok(DpLevelSet::new(symbol, levels).with_date(date))
    }
}

/// Live intraday bar client for the replay input side.
pub struct ChartBarClient {
    client: Client,
    base_url: String,
    last_request: Option<Instant>,
}

impl ChartBarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            last_request: None,
        }
    }

    async fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[async_trait]
impl BarProvider for ChartBarClient {
    async fn fetch_bars(&mut self, symbol: &str, date: NaiveDate) -> Result<BarSeries> {
        self.pace().await;

        let url = format!("{}/chart/intraday", self.base_url);
        let date_str = date.format("%Y-%m-%d").to_string();
        let resp: BarsResponse = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("date", date_str.as_str()),
                ("interval", "1m"),
            ])
            .send()
            .await
            .with_context(|| format!("requesting intraday bars for {symbol}"))?
            .error_for_status()?
            .json()
            .await
            .context("decoding intraday bars response")?;

        let mut bars: Vec<Bar> = resp
            .bars
            .into_iter()
            .filter_map(|r| {
                DateTime::<Utc>::from_timestamp(r.timestamp, 0).map(|ts| Bar {
                    timestamp: ts,
                    open: r.open,
                    high: r.high,
                    low: r.low,
                    close: r.close,
                    volume: r.volume,
                })
            })
            .collect();

        // Providers occasionally return duplicates at session boundaries.
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        Ok(BarSeries::new(bars))
    }
}
