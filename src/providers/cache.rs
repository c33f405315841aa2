use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use crate::models::{Bar, BarSeries, DpLevel, DpLevelSet};
use crate::providers::LevelProvider;

/// Load a level set from a local JSON file (an array of level records).
pub fn load_levels_json(path: &str, symbol: &str) -> Result<DpLevelSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading dark-pool levels from {path}"))?;
    let levels: Vec<DpLevel> =
        serde_json::from_str(&content).with_context(|| format!("parsing levels in {path}"))?;
    Ok(DpLevelSet::new(symbol, levels))
}

/// Load a bar sequence from a local JSON file (an array of OHLCV bars).
pub fn load_bars_json(path: &str) -> Result<BarSeries> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading bars from {path}"))?;
    let bars: Vec<Bar> =
        serde_json::from_str(&content).with_context(|| format!("parsing bars in {path}"))?;
    Ok(BarSeries::new(bars))
}

/// Wraps a live provider with a JSON file cache keyed by symbol+date, so
/// repeated replays of the same session never refetch.
pub struct CachedLevelProvider<P> {
    inner: P,
    cache_dir: String,
}

impl<P: LevelProvider> CachedLevelProvider<P> {
    pub fn new(inner: P, cache_dir: impl Into<String>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
        }
    }

    fn cache_path(&self, symbol: &str, date: NaiveDate) -> String {
        format!("{}/{}_{}_levels.json", self.cache_dir, symbol, date.format("%Y%m%d"))
    }
}

#[async_trait]
impl<P: LevelProvider> LevelProvider for CachedLevelProvider<P> {
    async fn fetch_levels(&mut self, symbol: &str, date: NaiveDate) -> Result<DpLevelSet> {
        let path = self.cache_path(symbol, date);
        if Path::new(&path).exists() {
            info!("loading cached levels from {path}");
            let set = load_levels_json(&path, symbol)?;
            return Ok(set.with_date(date));
        }

        let set = self.inner.fetch_levels(symbol, date).await?;

        std::fs::create_dir_all(&self.cache_dir)?;
        let json = serde_json::to_string(set.as_slice())?;
        std::fs::write(&path, json).with_context(|| format!("caching levels to {path}"))?;
        info!("cached {} levels to {path}", set.len());

        Ok(set)
    }
}
