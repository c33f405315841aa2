use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{RegimeThresholds, SignalConfig};
use crate::error::SignalError;
use crate::models::{Action, RejectionReason};
use crate::replay::engine::BarState;

/// A deduplicated, actionable output selected from a window of raw
/// per-bar signals. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterSignal {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub price: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: f64,
    /// Final confidence on the 0.0-1.0 scale; converted exactly once from
    /// the raw 0-100 confluence score at this boundary.
    pub confidence: f64,
    pub primary_reason: String,
    pub supporting_factors: Vec<String>,
    pub is_master_signal: bool,
}

/// Counts of raw signals dropped, keyed by reason. Session-scoped;
/// a fresh tally is produced per generator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectionTally {
    pub low_dp_strength: usize,
    pub no_volume: usize,
    pub weak_momentum: usize,
    pub poor_regime: usize,
    pub no_magnet_interaction: usize,
}

impl RejectionTally {
    pub fn record(&mut self, reason: RejectionReason) {
        match reason {
            RejectionReason::LowDpStrength => self.low_dp_strength += 1,
            RejectionReason::NoVolume => self.no_volume += 1,
            RejectionReason::WeakMomentum => self.weak_momentum += 1,
            RejectionReason::PoorRegime => self.poor_regime += 1,
            RejectionReason::NoMagnetInteraction => self.no_magnet_interaction += 1,
        }
    }

    pub fn get(&self, reason: RejectionReason) -> usize {
        match reason {
            RejectionReason::LowDpStrength => self.low_dp_strength,
            RejectionReason::NoVolume => self.no_volume,
            RejectionReason::WeakMomentum => self.weak_momentum,
            RejectionReason::PoorRegime => self.poor_regime,
            RejectionReason::NoMagnetInteraction => self.no_magnet_interaction,
        }
    }

    pub fn total(&self) -> usize {
        RejectionReason::ALL.iter().map(|&r| self.get(r)).sum()
    }
}

/// Filters a raw per-bar signal stream into a small set of master signals
/// with full rejection accounting. Stateless between runs: each call to
/// `generate` starts with fresh buffers and a fresh tally.
pub struct MasterSignalGenerator {
    cfg: SignalConfig,
}

impl MasterSignalGenerator {
    pub fn new(cfg: &SignalConfig) -> Result<Self, SignalError> {
        cfg.validate()?;
        Ok(Self { cfg: cfg.clone() })
    }

    /// Consume an ordered decision stream and emit master signals plus the
    /// rejection histogram. Every raw signal is accounted exactly once:
    /// promoted, or one tally bucket.
    pub fn generate(
        &self,
        states: &[BarState],
    ) -> Result<(Vec<MasterSignal>, RejectionTally), SignalError> {
        let raw: Vec<&BarState> = states.iter().filter(|s| s.decision.is_signal()).collect();

        // Fixed wall-clock windows via floor division on epoch seconds.
        let mut windows: BTreeMap<i64, Vec<&BarState>> = BTreeMap::new();
        for state in raw {
            let key = state.timestamp.timestamp().div_euclid(self.cfg.signal_window_secs);
            windows.entry(key).or_default().push(state);
        }

        let mut masters = Vec::new();
        let mut tally = RejectionTally::default();
        let mut last_emitted: Option<DateTime<Utc>> = None;

        for buffer in windows.values() {
            let avg = buffer
                .iter()
                .map(|s| s.signal_confidence as f64)
                .sum::<f64>()
                / buffer.len() as f64;

            // Best of window, earliest wins ties.
            let mut best_idx = 0;
            for (i, state) in buffer.iter().enumerate() {
                if state.signal_confidence > buffer[best_idx].signal_confidence {
                    best_idx = i;
                }
            }
            let best = buffer[best_idx];

            let th = self.cfg.thresholds(best.regime)?;
            let admitted = Self::admit(avg, buffer.len(), th, self.cfg.max_window_signals);

            let spaced_out = admitted
                && last_emitted.is_some_and(|last| {
                    (best.timestamp - last).num_seconds() < self.cfg.min_signal_spacing_secs
                });

            if admitted && !spaced_out {
                masters.push(self.build_master(best, buffer.len()));
                last_emitted = Some(best.timestamp);
                for (i, state) in buffer.iter().enumerate() {
                    if i != best_idx {
                        tally.record(Self::classify(state));
                    }
                }
            } else {
                if spaced_out {
                    debug!(
                        "window at {} suppressed: within {}s of previous master",
                        best.timestamp, self.cfg.min_signal_spacing_secs
                    );
                }
                for state in buffer.iter() {
                    tally.record(Self::classify(state));
                }
            }
        }

        Ok((masters, tally))
    }

    /// Regime-adaptive admission: full confidence, reduced confidence with
    /// enough corroborating alerts, or sheer persistence at the hard cap so
    /// sustained low-grade interest is never silently dropped forever.
    fn admit(avg: f64, buffered: usize, th: &RegimeThresholds, hard_cap: usize) -> bool {
        if avg >= th.min_confidence {
            return true;
        }
        if avg >= th.min_confidence - 10.0 && buffered >= th.min_alerts {
            return true;
        }
        buffered >= hard_cap
    }

    /// Fixed precedence so the same input always lands in the same bucket:
    /// dp strength, volume, momentum, regime fit, magnet dedup.
    fn classify(state: &BarState) -> RejectionReason {
        if !state.flags.dp_confirmed {
            RejectionReason::LowDpStrength
        } else if !state.flags.volume_confirmed {
            RejectionReason::NoVolume
        } else if !state.flags.momentum_confirmed {
            RejectionReason::WeakMomentum
        } else if !state.regime.is_trending() {
            RejectionReason::PoorRegime
        } else {
            RejectionReason::NoMagnetInteraction
        }
    }

    fn build_master(&self, best: &BarState, buffered: usize) -> MasterSignal {
        let action = match best.decision.to_action() {
            Some(a) => a,
            // Only signal decisions reach this point.
            None => Action::Buy,
        };
        let entry = best.price;
        let sl_frac = self.cfg.stop_loss_pct / 100.0;
        let tp_frac = self.cfg.take_profit_pct / 100.0;
        let (stop_loss, take_profit) = match action {
            Action::Buy => (entry * (1.0 - sl_frac), entry * (1.0 + tp_frac)),
            Action::Sell => (entry * (1.0 + sl_frac), entry * (1.0 - tp_frac)),
        };
        let risk_reward_ratio = (take_profit - entry).abs() / (entry - stop_loss).abs();

        let confidence = best.signal_confidence as f64 / 100.0;
        let is_master = best.signal_confidence as f64 >= self.cfg.master_threshold;
        let tier = if is_master {
            "master"
        } else if best.signal_confidence as f64 >= self.cfg.high_confidence_threshold {
            "high-confidence"
        } else {
            "persistence"
        };

        let mut supporting_factors = vec![
            format!("volume {:.2}x trailing average", best.volume_vs_avg),
            format!("momentum {:+.2}%", best.momentum),
            format!("regime {}", best.regime),
        ];
        if best.flags.dp_confirmed {
            supporting_factors.push("dark-pool strength confirmed".to_string());
        }
        if let Some(level) = match action {
            Action::Buy => best.nearest_support,
            Action::Sell => best.nearest_resistance,
        } {
            supporting_factors.push(format!(
                "magnet level {:.2} ({} shares)",
                level.price, level.volume
            ));
        }
        if buffered > 1 {
            supporting_factors.push(format!("{buffered} alerts buffered in window"));
        }

        MasterSignal {
            timestamp: best.timestamp,
            action,
            price: best.price,
            entry_price: entry,
            stop_loss,
            take_profit,
            risk_reward_ratio,
            confidence,
            primary_reason: format!(
                "{tier} {action} at {:.2}, confluence {}",
                entry, best.signal_confidence
            ),
            supporting_factors,
            is_master_signal: is_master,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, Regime};
    use crate::replay::engine::{ConfirmationFlags, NearLevel};
    use crate::test_helpers::test_config;
    use chrono::{Duration, TimeZone, Utc};

    fn raw_signal(offset_secs: i64, confidence: u8, regime: Regime) -> BarState {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap();
        BarState {
            timestamp: base + Duration::seconds(offset_secs),
            price: 100.0,
            decision: Decision::SignalBuy,
            nearest_support: Some(NearLevel {
                price: 99.9,
                volume: 2_000_000,
            }),
            nearest_resistance: None,
            volume_vs_avg: 1.8,
            momentum: 0.3,
            flags: ConfirmationFlags {
                volume_confirmed: true,
                momentum_confirmed: true,
                dp_confirmed: true,
            },
            regime,
            magnet_alerts: Vec::new(),
            signal_confidence: confidence,
            reasoning: String::new(),
        }
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let gen = MasterSignalGenerator::new(&test_config()).unwrap();
        let (masters, tally) = gen.generate(&[]).unwrap();
        assert!(masters.is_empty());
        assert_eq!(tally, RejectionTally::default());
    }

    #[test]
    fn high_confidence_window_promotes_best() {
        let gen = MasterSignalGenerator::new(&test_config()).unwrap();
        let states = vec![
            raw_signal(0, 70, Regime::Uptrend),
            raw_signal(30, 85, Regime::Uptrend),
            raw_signal(60, 72, Regime::Uptrend),
        ];
        let (masters, tally) = gen.generate(&states).unwrap();
        assert_eq!(masters.len(), 1);
        assert_eq!(masters[0].confidence, 0.85);
        assert!(masters[0].is_master_signal);
        // losers are tallied, conservation holds
        assert_eq!(tally.total() + masters.len(), 3);
    }

    #[test]
    fn chop_scenario_from_admission_rule() {
        // Pin a chop table with min_confidence=60, min_alerts=3: avg 55
        // misses the full bar, the reduced bar needs 3 alerts, and two
        // buffered signals stay under the hard cap.
        let mut cfg = test_config();
        cfg.regime_thresholds
            .get_mut(&Regime::Chop)
            .unwrap()
            .min_confidence = 60.0;
        cfg.regime_thresholds.get_mut(&Regime::Chop).unwrap().min_alerts = 3;
        let gen = MasterSignalGenerator::new(&cfg).unwrap();
        let states = vec![
            raw_signal(0, 55, Regime::Chop),
            raw_signal(30, 55, Regime::Chop),
        ];
        let (masters, tally) = gen.generate(&states).unwrap();
        // avg 55 < 60; 55 >= 50 but buffer 2 < 3; buffer 2 < hard cap 5
        assert!(masters.is_empty());
        assert_eq!(tally.poor_regime, 2);
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn persistence_hard_cap_admits_low_grade_interest() {
        let gen = MasterSignalGenerator::new(&test_config()).unwrap();
        let states: Vec<BarState> = (0..5)
            .map(|i| raw_signal(i * 20, 45, Regime::Uptrend))
            .collect();
        let (masters, tally) = gen.generate(&states).unwrap();
        assert_eq!(masters.len(), 1);
        assert!(!masters[0].is_master_signal);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn minimum_spacing_enforced() {
        let gen = MasterSignalGenerator::new(&test_config()).unwrap();
        // Two adjacent 2-minute windows, both admissible; the second falls
        // inside the 120s spacing of the first emission.
        let states = vec![
            raw_signal(110, 80, Regime::Uptrend),
            raw_signal(130, 82, Regime::Uptrend),
        ];
        let (masters, tally) = gen.generate(&states).unwrap();
        assert_eq!(masters.len(), 1);
        assert_eq!(tally.total(), 1);
        for pair in masters.windows(2) {
            assert!((pair[1].timestamp - pair[0].timestamp).num_seconds() >= 120);
        }
    }

    #[test]
    fn spacing_allows_later_windows() {
        let gen = MasterSignalGenerator::new(&test_config()).unwrap();
        let states = vec![
            raw_signal(0, 80, Regime::Uptrend),
            raw_signal(300, 82, Regime::Uptrend),
        ];
        let (masters, _) = gen.generate(&states).unwrap();
        assert_eq!(masters.len(), 2);
    }

    #[test]
    fn rejection_precedence_is_fixed() {
        let mut weak = raw_signal(0, 55, Regime::Uptrend);
        weak.flags.dp_confirmed = false;
        weak.flags.volume_confirmed = false;
        // dp strength outranks volume in the precedence order
        assert_eq!(
            MasterSignalGenerator::classify(&weak),
            RejectionReason::LowDpStrength
        );
        weak.flags.dp_confirmed = true;
        assert_eq!(
            MasterSignalGenerator::classify(&weak),
            RejectionReason::NoVolume
        );
        weak.flags.volume_confirmed = true;
        weak.flags.momentum_confirmed = false;
        assert_eq!(
            MasterSignalGenerator::classify(&weak),
            RejectionReason::WeakMomentum
        );
    }

    #[test]
    fn risk_parameters_from_config_offsets() {
        let cfg = test_config();
        let gen = MasterSignalGenerator::new(&cfg).unwrap();
        let states = vec![raw_signal(0, 90, Regime::Uptrend)];
        let (masters, _) = gen.generate(&states).unwrap();
        let m = &masters[0];
        assert!((m.stop_loss - 100.0 * (1.0 - cfg.stop_loss_pct / 100.0)).abs() < 1e-9);
        assert!((m.take_profit - 100.0 * (1.0 + cfg.take_profit_pct / 100.0)).abs() < 1e-9);
        let expected_rr = cfg.take_profit_pct / cfg.stop_loss_pct;
        assert!((m.risk_reward_ratio - expected_rr).abs() < 1e-9);
    }

    #[test]
    fn sell_signal_mirrors_risk_offsets() {
        let cfg = test_config();
        let gen = MasterSignalGenerator::new(&cfg).unwrap();
        let mut s = raw_signal(0, 90, Regime::Downtrend);
        s.decision = Decision::SignalSell;
        s.nearest_resistance = s.nearest_support.take();
        let (masters, _) = gen.generate(&[s]).unwrap();
        let m = &masters[0];
        assert_eq!(m.action, Action::Sell);
        assert!(m.stop_loss > m.entry_price);
        assert!(m.take_profit < m.entry_price);
    }
}
