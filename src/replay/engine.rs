use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::{RegimeThresholds, SignalConfig};
use crate::core::confluence::{ConfluenceFactors, ConfluenceScorer};
use crate::core::flow::FlowClusterDetector;
use crate::core::regime::RegimeDetector;
use crate::core::structure::DpStructureAnalyzer;
use crate::error::SignalError;
use crate::models::{Bar, BarSeries, Decision, DpLevel, DpLevelSet, Regime};

const FLOW_BONUS_CAP: i32 = 10;

/// Closed set of per-bar confirmation outcomes the admission policy
/// pattern-matches over.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConfirmationFlags {
    pub volume_confirmed: bool,
    pub momentum_confirmed: bool,
    pub dp_confirmed: bool,
}

/// A level close enough to current price to act as a near-term attractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnetAlert {
    pub price: f64,
    pub volume: u64,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearLevel {
    pub price: f64,
    pub volume: u64,
}

impl From<&DpLevel> for NearLevel {
    fn from(l: &DpLevel) -> Self {
        NearLevel {
            price: l.price,
            volume: l.volume,
        }
    }
}

/// One replay tick. Produced exactly once per valid bar, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarState {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub decision: Decision,
    pub nearest_support: Option<NearLevel>,
    pub nearest_resistance: Option<NearLevel>,
    pub volume_vs_avg: f64,
    pub momentum: f64,
    pub flags: ConfirmationFlags,
    pub regime: Regime,
    pub magnet_alerts: Vec<MagnetAlert>,
    pub signal_confidence: u8,
    pub reasoning: String,
}

/// Ordered per-bar decision records for one session, plus the count of
/// bars dropped for bad data so silent loss is visible downstream.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplayTrace {
    pub bars: Vec<BarState>,
    pub skipped_bars: usize,
}

impl ReplayTrace {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn signals(&self) -> impl Iterator<Item = &BarState> {
        self.bars.iter().filter(|b| b.decision.is_signal())
    }
}

struct ResolvedThresholds {
    uptrend: RegimeThresholds,
    downtrend: RegimeThresholds,
    chop: RegimeThresholds,
}

impl ResolvedThresholds {
    fn from_config(cfg: &SignalConfig) -> Result<Self, SignalError> {
        Ok(Self {
            uptrend: cfg.thresholds(Regime::Uptrend)?.clone(),
            downtrend: cfg.thresholds(Regime::Downtrend)?.clone(),
            chop: cfg.thresholds(Regime::Chop)?.clone(),
        })
    }

    fn get(&self, regime: Regime) -> &RegimeThresholds {
        match regime {
            Regime::Uptrend => &self.uptrend,
            Regime::Downtrend => &self.downtrend,
            Regime::Chop => &self.chop,
        }
    }
}

enum Candidate {
    Buy(NearLevel, f64),
    Sell(NearLevel, f64),
    None,
}

/// Drives a deterministic bar-by-bar walk over one session. Session-scoped:
/// instances must not be reused across sessions without `reset()`, since the
/// trailing windows and touch counts belong to a single session.
pub struct ReplayEngine {
    cfg: SignalConfig,
    thresholds: ResolvedThresholds,
    structure_analyzer: DpStructureAnalyzer,
    regime_detector: RegimeDetector,
    flow_detector: FlowClusterDetector,

    seen: BarSeries,
    // Touch counts keyed by level price in integer cents so float keys
    // never enter a hash map.
    touches: HashMap<i64, u32>,
    skipped_bars: usize,
}

impl ReplayEngine {
    /// Fails fast on a malformed configuration; the engine never guesses
    /// admission thresholds.
    pub fn new(cfg: &SignalConfig) -> Result<Self, SignalError> {
        cfg.validate()?;
        Ok(Self {
            thresholds: ResolvedThresholds::from_config(cfg)?,
            structure_analyzer: DpStructureAnalyzer::new(
                cfg.battleground_volume_min,
                cfg.near_level_pct,
            ),
            regime_detector: RegimeDetector::new(
                cfg.short_window,
                cfg.long_window,
                cfg.regime_epsilon,
            ),
            flow_detector: FlowClusterDetector::new(cfg.flow_window_bars),
            cfg: cfg.clone(),
            seen: BarSeries::default(),
            touches: HashMap::new(),
            skipped_bars: 0,
        })
    }

    /// Clear all session-scoped state. Required before replaying another
    /// session with the same instance.
    pub fn reset(&mut self) {
        self.seen = BarSeries::default();
        self.touches.clear();
        self.skipped_bars = 0;
    }

    /// Replay a full session. The bar sequence must be strictly increasing
    /// in timestamp; that is a schema violation, not a per-bar data gap,
    /// so it propagates as a hard failure.
    pub fn replay(
        &mut self,
        levels: &DpLevelSet,
        bars: &BarSeries,
    ) -> Result<ReplayTrace, SignalError> {
        if let Some(idx) = bars.first_unordered_index() {
            return Err(SignalError::UnorderedBars(idx));
        }
        self.reset();

        let mut trace = ReplayTrace::default();
        for bar in bars.iter() {
            if let Some(state) = self.step(levels, bar) {
                trace.bars.push(state);
            }
        }
        trace.skipped_bars = self.skipped_bars;
        Ok(trace)
    }

    /// Evaluate one bar. Returns None for an invalid bar (skipped and
    /// counted, never aborting the session). Public so a caller can abort
    /// between bars and still keep the states produced so far.
    pub fn step(&mut self, levels: &DpLevelSet, bar: &Bar) -> Option<BarState> {
        if !bar.is_valid() {
            self.skipped_bars += 1;
            debug!(
                "skipping invalid bar at {} (NaN or negative field)",
                bar.timestamp
            );
            return None;
        }

        let price = bar.close;

        // Volume ratio uses only prior bars; the first bar of a session has
        // no window and stays unconfirmed.
        let volume_vs_avg = match self.seen.trailing_avg_volume(self.cfg.volume_lookback) {
            Some(avg) if avg > 0.0 => bar.volume / avg,
            _ => 0.0,
        };

        self.seen.push(bar.clone());
        let closes = self.seen.closes();
        let volumes = self.seen.volumes();

        let momentum = self
            .seen
            .drift_pct(self.cfg.momentum_lookback)
            .unwrap_or(0.0);
        let regime = self.regime_detector.detect(&closes);
        let th = self.thresholds.get(regime).clone();

        let structure = self.structure_analyzer.analyze(levels, price);
        let nearest_support = structure.nearest_support().map(NearLevel::from);
        let nearest_resistance = structure.nearest_resistance().map(NearLevel::from);

        let magnet_alerts: Vec<MagnetAlert> = self
            .structure_analyzer
            .near_levels(levels, price)
            .iter()
            .map(|l| MagnetAlert {
                price: l.price,
                volume: l.volume,
                distance_pct: distance_pct(price, l.price),
            })
            .collect();

        let candidate = self.find_candidate(price, &nearest_support, &nearest_resistance);

        let flags = ConfirmationFlags {
            volume_confirmed: volume_vs_avg >= th.volume_multiplier,
            momentum_confirmed: momentum.abs() >= th.breakout_threshold_pct,
            dp_confirmed: structure.dp_strength_score >= self.cfg.dp_strength_min,
        };

        let (level_volume, touch_count) = match &candidate {
            Candidate::Buy(level, _) | Candidate::Sell(level, _) => {
                let key = (level.price * 100.0).round() as i64;
                let count = self.touches.entry(key).or_insert(0);
                *count += 1;
                (level.volume, *count)
            }
            Candidate::None => (0, 1),
        };

        let factors = ConfluenceFactors {
            volume_vs_avg,
            touch_count,
            momentum_pct: momentum,
            level_volume,
        };
        let base_score = ConfluenceScorer::score(&factors);

        let flow_bonus = self
            .flow_detector
            .detect(
                &closes,
                &volumes,
                th.breakout_threshold_pct,
                th.volume_multiplier,
            )
            .map(|c| ((c.strength * th.flow_cluster_weight).round() as i32).clamp(0, FLOW_BONUS_CAP))
            .unwrap_or(0);

        let confidence = (base_score as i32 + flow_bonus).clamp(0, 100) as u8;

        let confirmed = flags.volume_confirmed
            && flags.momentum_confirmed
            && ConfluenceScorer::confirms(confidence, regime, flags.dp_confirmed, &th);

        let decision = match &candidate {
            Candidate::Buy(_, _) if confirmed => Decision::SignalBuy,
            Candidate::Sell(_, _) if confirmed => Decision::SignalSell,
            _ => Decision::Hold,
        };

        let reasoning = self.build_reasoning(
            &candidate, &flags, volume_vs_avg, momentum, regime, &th,
            structure.dp_strength_score, flow_bonus, confidence, decision,
        );

        Some(BarState {
            timestamp: bar.timestamp,
            price,
            decision,
            nearest_support,
            nearest_resistance,
            volume_vs_avg,
            momentum,
            flags,
            regime,
            magnet_alerts,
            signal_confidence: confidence,
            reasoning,
        })
    }

    fn find_candidate(
        &self,
        price: f64,
        support: &Option<NearLevel>,
        resistance: &Option<NearLevel>,
    ) -> Candidate {
        let sup = support
            .filter(|l| distance_pct(price, l.price) <= self.cfg.magnet_pct)
            .map(|l| (l, distance_pct(price, l.price)));
        let res = resistance
            .filter(|l| distance_pct(price, l.price) <= self.cfg.magnet_pct)
            .map(|l| (l, distance_pct(price, l.price)));

        match (sup, res) {
            (Some((l, d)), None) => Candidate::Buy(l, d),
            (None, Some((l, d))) => Candidate::Sell(l, d),
            // Both within the magnet window: take the nearer side.
            (Some((ls, ds)), Some((lr, dr))) => {
                if ds <= dr {
                    Candidate::Buy(ls, ds)
                } else {
                    Candidate::Sell(lr, dr)
                }
            }
            (None, None) => Candidate::None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_reasoning(
        &self,
        candidate: &Candidate,
        flags: &ConfirmationFlags,
        volume_vs_avg: f64,
        momentum: f64,
        regime: Regime,
        th: &RegimeThresholds,
        dp_strength: f64,
        flow_bonus: i32,
        confidence: u8,
        decision: Decision,
    ) -> String {
        let magnet = match candidate {
            Candidate::Buy(l, d) => format!("magnet support {:.2} ({:.2}% away)", l.price, d),
            Candidate::Sell(l, d) => {
                format!("magnet resistance {:.2} ({:.2}% away)", l.price, d)
            }
            Candidate::None => format!("no magnet within {:.2}%", self.cfg.magnet_pct),
        };
        format!(
            "volume {:.2}x vs {:.2}x min {}; momentum {:+.2}% vs {:.2}% min {}; \
             regime {}; dp strength {:.2} {}; {}; flow +{}; confidence {} -> {}",
            volume_vs_avg,
            th.volume_multiplier,
            pass_fail(flags.volume_confirmed),
            momentum,
            th.breakout_threshold_pct,
            pass_fail(flags.momentum_confirmed),
            regime,
            dp_strength,
            pass_fail(flags.dp_confirmed),
            magnet,
            flow_bonus,
            confidence,
            decision,
        )
    }
}

fn pass_fail(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

fn distance_pct(price: f64, level: f64) -> f64 {
    if price <= 0.0 {
        return f64::INFINITY;
    }
    (price - level).abs() / price * 100.0
}
