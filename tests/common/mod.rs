use chrono::{DateTime, Duration, Utc};
use darkpool_signals::models::{Bar, BarSeries, DpLevel, DpLevelSet};

/// Create 1-minute bars from (close, volume) pairs starting at the cash open.
pub fn make_bars(data: &[(f64, f64)]) -> BarSeries {
    let base = DateTime::parse_from_rfc3339("2025-03-10T14:30:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let bars: Vec<Bar> = data
        .iter()
        .enumerate()
        .map(|(i, &(close, volume))| Bar {
            timestamp: base + Duration::minutes(i as i64),
            open: close - 0.05,
            high: close + 0.10,
            low: close - 0.10,
            close,
            volume,
        })
        .collect();

    BarSeries::new(bars)
}

pub fn make_levels(data: &[(f64, u64)]) -> DpLevelSet {
    let levels = data
        .iter()
        .map(|&(price, volume)| DpLevel::new(price, volume, 10))
        .collect();
    DpLevelSet::new("SPY", levels)
}

/// A full synthetic session: a slow drift up toward a heavy dark-pool level
/// at 100.00, a volume-confirmed approach, then a fade away from the level.
pub fn make_session() -> BarSeries {
    let mut data: Vec<(f64, f64)> = Vec::new();
    // Quiet drift up toward the level
    for i in 0..25 {
        data.push((99.0 + i as f64 * 0.03, 1000.0));
    }
    // Confirmed approach into the magnet window
    for i in 0..5 {
        data.push((99.80 + i as f64 * 0.08, 3000.0));
    }
    // Fade back off the level on normal volume
    for i in 0..10 {
        data.push((100.10 - i as f64 * 0.05, 1100.0));
    }
    make_bars(&data)
}
