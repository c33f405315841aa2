use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// A bar is usable when every price field is finite and volume is a
    /// finite non-negative number. Invalid bars are skipped during replay,
    /// never propagated.
    pub fn is_valid(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}

/// Wraps Vec<Bar> with the window helpers the replay loop needs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    /// Mean volume over the last `n` bars, or None when the series is empty.
    pub fn trailing_avg_volume(&self, n: usize) -> Option<f64> {
        if self.bars.is_empty() || n == 0 {
            return None;
        }
        let start = self.bars.len().saturating_sub(n);
        let window = &self.bars[start..];
        Some(window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64)
    }

    /// Signed percent drift of close over the last `n` bars
    /// (close[last] vs close[last - n]). None with fewer than n+1 bars.
    pub fn drift_pct(&self, n: usize) -> Option<f64> {
        if n == 0 || self.bars.len() <= n {
            return None;
        }
        let last = self.bars[self.bars.len() - 1].close;
        let base = self.bars[self.bars.len() - 1 - n].close;
        if base == 0.0 {
            return None;
        }
        Some((last - base) / base * 100.0)
    }

    /// True when timestamps are strictly increasing. Index of the first
    /// offender is returned through the Err side of the caller's check.
    pub fn first_unordered_index(&self) -> Option<usize> {
        self.bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
            .map(|i| i + 1)
    }
}

impl std::ops::Index<usize> for BarSeries {
    type Output = Bar;
    fn index(&self, index: usize) -> &Self::Output {
        &self.bars[index]
    }
}

impl IntoIterator for BarSeries {
    type Item = Bar;
    type IntoIter = std::vec::IntoIter<Bar>;
    fn into_iter(self) -> Self::IntoIter {
        self.bars.into_iter()
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;
    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
