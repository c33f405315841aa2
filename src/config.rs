use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SignalError;
use crate::models::Regime;

/// Per-regime admission thresholds. Confidence values are on the raw 0-100
/// confluence scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeThresholds {
    /// Minimum absolute price move (percent) counted as a breakout.
    pub breakout_threshold_pct: f64,
    /// Bar volume must exceed trailing average by this multiple.
    pub volume_multiplier: f64,
    /// Chop requires an explicit dark-pool confirmation on top of the score.
    pub dp_confirmation_required: bool,
    /// Weight applied to flow-cluster strength when boosting confidence.
    pub flow_cluster_weight: f64,
    /// Minimum confluence score for admission in this regime.
    pub min_confidence: f64,
    /// Minimum buffered alerts for the reduced-confidence admission clause.
    pub min_alerts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub symbol: String,

    // Structure
    pub battleground_volume_min: u64,
    pub near_level_pct: f64,
    pub magnet_pct: f64,
    pub dp_strength_min: f64,

    // Regime detection
    pub short_window: usize,
    pub long_window: usize,
    pub regime_epsilon: f64,

    // Replay lookbacks (bars)
    pub volume_lookback: usize,
    pub momentum_lookback: usize,
    pub flow_window_bars: usize,

    // Regime-adaptive admission table
    pub regime_thresholds: HashMap<Regime, RegimeThresholds>,

    // Master signal policy
    pub master_threshold: f64,
    pub high_confidence_threshold: f64,
    pub signal_window_secs: i64,
    pub min_signal_spacing_secs: i64,
    pub max_window_signals: usize,

    // Risk parameters (percent offsets from entry)
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,

    // Data / logging
    pub levels_path: String,
    pub bars_path: String,
    pub log_level: String,
}

impl SignalConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

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
            symbol: env("DP_SYMBOL", "SPY"),
            battleground_volume_min: env("DP_BATTLEGROUND_MIN", "1000000")
                .parse()
                .unwrap_or(1_000_000),
            near_level_pct: env("DP_NEAR_LEVEL_PCT", "3.0").parse().unwrap_or(3.0),
            magnet_pct: env("DP_MAGNET_PCT", "0.3").parse().unwrap_or(0.3),
            dp_strength_min: env("DP_STRENGTH_MIN", "0.3").parse().unwrap_or(0.3),
            short_window: 5,
            long_window: 20,
            regime_epsilon: 0.0005,
            volume_lookback: 20,
            momentum_lookback: 5,
            flow_window_bars: 5,
            regime_thresholds,
            master_threshold: env("DP_MASTER_THRESHOLD", "75").parse().unwrap_or(75.0),
            high_confidence_threshold: env("DP_HIGH_CONF_THRESHOLD", "60")
                .parse()
                .unwrap_or(60.0),
            signal_window_secs: 120,
            min_signal_spacing_secs: env("DP_SIGNAL_SPACING_SECS", "120")
                .parse()
                .unwrap_or(120),
            max_window_signals: 5,
            stop_loss_pct: env("DP_STOP_LOSS_PCT", "0.5").parse().unwrap_or(0.5),
            take_profit_pct: env("DP_TAKE_PROFIT_PCT", "1.0").parse().unwrap_or(1.0),
            levels_path: env("DP_LEVELS_PATH", "data/levels.json"),
            bars_path: env("DP_BARS_PATH", "data/bars.json"),
            log_level: env("DP_LOG_LEVEL", "INFO"),
        }
    }

    /// A malformed thresholds table must refuse to run: silently defaulting
    /// a missing regime would change admission decisions.
    pub fn validate(&self) -> Result<(), SignalError> {
        for regime in [Regime::Uptrend, Regime::Downtrend, Regime::Chop] {
            let t = self
                .regime_thresholds
                .get(&regime)
                .ok_or(SignalError::MissingRegime(regime))?;
            if t.breakout_threshold_pct <= 0.0 || t.volume_multiplier <= 0.0 {
                return Err(SignalError::Config(format!(
                    "non-positive thresholds for {regime}"
                )));
            }
            if !(0.0..=100.0).contains(&t.min_confidence) {
                return Err(SignalError::Config(format!(
                    "min_confidence out of range for {regime}"
                )));
            }
        }
        if self.short_window == 0 || self.long_window <= self.short_window {
            return Err(SignalError::Config(
                "long_window must exceed short_window".to_string(),
            ));
        }
        if self.stop_loss_pct <= 0.0 || self.take_profit_pct <= 0.0 {
            return Err(SignalError::Config(
                "stop/take-profit percentages must be positive".to_string(),
            ));
        }
        if self.signal_window_secs <= 0 || self.min_signal_spacing_secs < 0 {
            return Err(SignalError::Config(
                "signal window and spacing must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self, regime: Regime) -> Result<&RegimeThresholds, SignalError> {
        self.regime_thresholds
            .get(&regime)
            .ok_or(SignalError::MissingRegime(regime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = SignalConfig::from_env();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_regime_is_fatal() {
        let mut cfg = SignalConfig::from_env();
        cfg.regime_thresholds.remove(&Regime::Chop);
        match cfg.validate() {
            Err(SignalError::MissingRegime(Regime::Chop)) => {}
            other => panic!("expected MissingRegime, got {other:?}"),
        }
    }

    #[test]
    fn bad_windows_rejected() {
        let mut cfg = SignalConfig::from_env();
        cfg.long_window = cfg.short_window;
        assert!(cfg.validate().is_err());
    }
}
