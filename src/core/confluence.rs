use serde::{Deserialize, Serialize};

use crate::config::RegimeThresholds;
use crate::models::Regime;

const BASE_SCORE: i32 = 50;
const LEVEL_VOLUME_BONUS_MIN: u64 = 500_000;
const MAX_TOUCH_BONUS_TOUCHES: u32 = 3;

/// Raw inputs to the confluence model for one candidate level interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceFactors {
    /// Current bar volume over trailing average.
    pub volume_vs_avg: f64,
    /// Times price has interacted with the level this session (>= 1).
    pub touch_count: u32,
    /// Signed recent drift, percent.
    pub momentum_pct: f64,
    /// Dark-pool shares at the level.
    pub level_volume: u64,
}

/// Additive 0-100 confluence score plus the regime-aware admission check.
pub struct ConfluenceScorer;

impl ConfluenceScorer {
    /// Base 50, bonuses for volume ratio, repeat touches, momentum and
    /// level size, clamped to [0, 100]. Pure and monotone in every factor.
    pub fn score(factors: &ConfluenceFactors) -> u8 {
        let mut score = BASE_SCORE;

        if factors.volume_vs_avg >= 2.0 {
            score += 20;
        } else if factors.volume_vs_avg >= 1.5 {
            score += 10;
        }

        let extra_touches = factors
            .touch_count
            .saturating_sub(1)
            .min(MAX_TOUCH_BONUS_TOUCHES);
        score += 10 * extra_touches as i32;

        let momentum = factors.momentum_pct.abs();
        if momentum >= 0.5 {
            score += 15;
        } else if momentum >= 0.25 {
            score += 5;
        }

        if factors.level_volume >= LEVEL_VOLUME_BONUS_MIN {
            score += 10;
        }

        score.clamp(0, 100) as u8
    }

    /// Whether a score counts as confirmed for signal admission under the
    /// given regime. Trending regimes admit at their table minimum; chop
    /// additionally demands an explicit dark-pool confirmation, because the
    /// same breakout magnitude is more likely to revert there.
    pub fn confirms(
        score: u8,
        regime: Regime,
        dp_confirmed: bool,
        thresholds: &RegimeThresholds,
    ) -> bool {
        if (score as f64) < thresholds.min_confidence {
            return false;
        }
        if regime == Regime::Chop && thresholds.dp_confirmation_required && !dp_confirmed {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_config;

    fn factors(volume_vs_avg: f64, touch_count: u32, momentum_pct: f64, level_volume: u64) -> ConfluenceFactors {
        ConfluenceFactors {
            volume_vs_avg,
            touch_count,
            momentum_pct,
            level_volume,
        }
    }

    #[test]
    fn full_stack_clamps_to_100() {
        // 50 + 20 + 20 + 15 + 10 = 115 -> 100
        let f = factors(2.1, 3, 0.6, 600_000);
        assert_eq!(ConfluenceScorer::score(&f), 100);
    }

    #[test]
    fn base_case_scores_50() {
        let f = factors(1.0, 1, 0.0, 0);
        assert_eq!(ConfluenceScorer::score(&f), 50);
    }

    #[test]
    fn touch_bonus_caps_at_three_extra() {
        let f3 = factors(1.0, 4, 0.0, 0);
        let f9 = factors(1.0, 10, 0.0, 0);
        assert_eq!(ConfluenceScorer::score(&f3), 80);
        assert_eq!(ConfluenceScorer::score(&f9), 80);
    }

    #[test]
    fn momentum_bonus_uses_magnitude() {
        let up = factors(1.0, 1, 0.6, 0);
        let down = factors(1.0, 1, -0.6, 0);
        assert_eq!(ConfluenceScorer::score(&up), 65);
        assert_eq!(ConfluenceScorer::score(&down), 65);
        let mild = factors(1.0, 1, 0.3, 0);
        assert_eq!(ConfluenceScorer::score(&mild), 55);
    }

    #[test]
    fn monotone_in_each_factor() {
        let base = factors(1.2, 2, 0.2, 400_000);
        let s = ConfluenceScorer::score(&base);
        for f in [
            factors(2.5, 2, 0.2, 400_000),
            factors(1.2, 5, 0.2, 400_000),
            factors(1.2, 2, 0.7, 400_000),
            factors(1.2, 2, 0.2, 900_000),
        ] {
            assert!(ConfluenceScorer::score(&f) >= s);
        }
    }

    #[test]
    fn chop_requires_dp_confirmation() {
        let cfg = test_config();
        let chop = cfg.thresholds(Regime::Chop).unwrap();
        assert!(!ConfluenceScorer::confirms(80, Regime::Chop, false, chop));
        assert!(ConfluenceScorer::confirms(80, Regime::Chop, true, chop));
        // below chop minimum even with dp confirmation
        assert!(!ConfluenceScorer::confirms(65, Regime::Chop, true, chop));
    }

    #[test]
    fn trending_admits_at_lower_score() {
        let cfg = test_config();
        let up = cfg.thresholds(Regime::Uptrend).unwrap();
        assert!(ConfluenceScorer::confirms(60, Regime::Uptrend, false, up));
        assert!(!ConfluenceScorer::confirms(59, Regime::Uptrend, false, up));
    }
}
