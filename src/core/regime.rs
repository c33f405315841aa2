use crate::models::Regime;

/// Classifies the prevailing trend from a trailing closes window by
/// comparing short and long simple moving averages.
pub struct RegimeDetector {
    pub short_window: usize,
    pub long_window: usize,
    /// Relative band around the long average inside which the call is Chop.
    pub epsilon: f64,
}

impl RegimeDetector {
    pub fn new(short_window: usize, long_window: usize, epsilon: f64) -> Self {
        Self {
            short_window,
            long_window,
            epsilon,
        }
    }

    /// Chop is the conservative default: returned whenever history is
    /// shorter than the long window, so sparse data never produces a false
    /// trend call.
    pub fn detect(&self, closes: &[f64]) -> Regime {
        if closes.len() < self.long_window || self.short_window == 0 {
            return Regime::Chop;
        }

        let short_ma = Self::mean(&closes[closes.len() - self.short_window..]);
        let long_ma = Self::mean(&closes[closes.len() - self.long_window..]);

        if short_ma > long_ma * (1.0 + self.epsilon) {
            Regime::Uptrend
        } else if short_ma < long_ma * (1.0 - self.epsilon) {
            Regime::Downtrend
        } else {
            Regime::Chop
        }
    }

    fn mean(window: &[f64]) -> f64 {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RegimeDetector {
        RegimeDetector::new(5, 20, 0.0005)
    }

    #[test]
    fn insufficient_history_is_chop() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        assert_eq!(detector().detect(&closes), Regime::Chop);
        assert_eq!(detector().detect(&[]), Regime::Chop);
    }

    #[test]
    fn rising_closes_are_uptrend() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(detector().detect(&closes), Regime::Uptrend);
    }

    #[test]
    fn falling_closes_are_downtrend() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        assert_eq!(detector().detect(&closes), Regime::Downtrend);
    }

    #[test]
    fn flat_closes_are_chop() {
        let closes = vec![100.0; 30];
        assert_eq!(detector().detect(&closes), Regime::Chop);
    }

    #[test]
    fn epsilon_band_suppresses_marginal_drift() {
        // Tiny drift stays inside the band
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.0001).collect();
        assert_eq!(detector().detect(&closes), Regime::Chop);
    }
}
