use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::SideBias;

/// One aggregated dark-pool price level for a session. Immutable once
/// loaded; levels are EOD-derived and do not change intraday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpLevel {
    pub price: f64,
    pub volume: u64,
    pub trade_count: u32,
    #[serde(default)]
    pub side_bias: Option<SideBias>,
}

impl DpLevel {
    pub fn new(price: f64, volume: u64, trade_count: u32) -> Self {
        Self {
            price,
            volume,
            trade_count,
            side_bias: None,
        }
    }
}

/// The full set of dark-pool levels for one symbol on one session date.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DpLevelSet {
    pub symbol: String,
    pub date: Option<NaiveDate>,
    levels: Vec<DpLevel>,
}

impl DpLevelSet {
    pub fn new(symbol: impl Into<String>, levels: Vec<DpLevel>) -> Self {
        Self {
            symbol: symbol.into(),
            date: None,
            levels,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DpLevel> {
        self.levels.iter()
    }

    pub fn as_slice(&self) -> &[DpLevel] {
        &self.levels
    }

    pub fn total_volume(&self) -> u64 {
        self.levels.iter().map(|l| l.volume).sum()
    }
}

impl<'a> IntoIterator for &'a DpLevelSet {
    type Item = &'a DpLevel;
    type IntoIter = std::slice::Iter<'a, DpLevel>;
    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}
