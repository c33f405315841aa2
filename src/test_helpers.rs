use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::{RegimeThresholds, SignalConfig};
use crate::models::{Bar, BarSeries, DpLevel, DpLevelSet, Regime};

/// Create 1-minute bars from (close, volume) pairs with auto-incrementing
/// timestamps from a fixed session open.
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

/// Create a level set from (price, volume) pairs.
pub fn make_levels(data: &[(f64, u64)]) -> DpLevelSet {
    let levels = data
        .iter()
        .map(|&(price, volume)| DpLevel::new(price, volume, 10))
        .collect();
    DpLevelSet::new("SPY", levels)
}

/// A 30-bar session that drifts up into the 100.00 level on a volume spike:
/// the last five bars sit inside the magnet window with confirmed volume
/// and momentum.
pub fn make_breakout_session() -> BarSeries {
    let mut data: Vec<(f64, f64)> = (0..25)
        .map(|i| (99.0 + i as f64 * 0.03, 1000.0))
        .collect();
    for i in 0..5 {
        data.push((99.80 + i as f64 * 0.08, 3000.0));
    }
    make_bars(&data)
}

/// A deterministic config for tests, same shape as the `from_env` defaults
/// but built explicitly so ambient env vars never leak in.
pub fn test_config() -> SignalConfig {
    let mut regime_thresholds = HashMap::new();
    regime_thresholds.insert(
        Regime::Uptrend,
        RegimeThresholds {
            breakout_threshold_pct: 0.2,
            volume_multiplier: 1.2,
            dp_confirmation_required: false,
            flow_cluster_weight: 1.0,
            min_confidence: 60.0,
            min_alerts: 2,
        },
    );
    regime_thresholds.insert(
        Regime::Downtrend,
        RegimeThresholds {
            breakout_threshold_pct: 0.2,
            volume_multiplier: 1.2,
            dp_confirmation_required: false,
            flow_cluster_weight: 1.0,
            min_confidence: 60.0,
            min_alerts: 2,
        },
    );
    regime_thresholds.insert(
        Regime::Chop,
        RegimeThresholds {
            breakout_threshold_pct: 0.3,
            volume_multiplier: 1.5,
            dp_confirmation_required: true,
            flow_cluster_weight: 0.5,
            min_confidence: 70.0,
            min_alerts: 3,
        },
    );

    SignalConfig {
        symbol: "SPY".to_string(),
        battleground_volume_min: 1_000_000,
        near_level_pct: 3.0,
        magnet_pct: 0.3,
        dp_strength_min: 0.3,
        short_window: 5,
        long_window: 20,
        regime_epsilon: 0.0005,
        volume_lookback: 20,
        momentum_lookback: 5,
        flow_window_bars: 5,
        regime_thresholds,
        master_threshold: 75.0,
        high_confidence_threshold: 60.0,
        signal_window_secs: 120,
        min_signal_spacing_secs: 120,
        max_window_signals: 5,
        stop_loss_pct: 0.5,
        take_profit_pct: 1.0,
        levels_path: "data/levels.json".to_string(),
        bars_path: "data/bars.json".to_string(),
        log_level: "ERROR".to_string(),
    }
}
