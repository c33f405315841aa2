pub mod cache;
pub mod http;

pub use cache::{load_bars_json, load_levels_json, CachedLevelProvider};
pub use http::{ChartBarClient, DarkPoolClient};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{BarSeries, DpLevelSet};

/// Source of dark-pool levels for one symbol+date. The core never sees the
/// fallback logic behind an implementation; it always receives a fully
/// materialized set.
#[async_trait]
pub trait LevelProvider: Send + Sync {
    async fn fetch_levels(&mut self, symbol: &str, date: NaiveDate) -> Result<DpLevelSet>;
}

/// Source of intraday bars for one symbol+session, strictly increasing in
/// timestamp.
#[async_trait]
pub trait BarProvider: Send + Sync {
    async fn fetch_bars(&mut self, symbol: &str, date: NaiveDate) -> Result<BarSeries>;
}
