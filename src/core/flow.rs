use serde::{Deserialize, Serialize};

/// A short-window, volume-confirmed price cluster used as an
/// institutional-flow proxy. Only produced when both the price leg and the
/// volume leg clear their thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowCluster {
    pub price_change_pct: f64,
    pub volume_ratio: f64,
    pub strength: f64,
}

pub struct FlowClusterDetector {
    /// Bounded look-back, in bars.
    pub window_bars: usize,
}

impl FlowClusterDetector {
    pub fn new(window_bars: usize) -> Self {
        Self { window_bars }
    }

    /// None is the expected "no cluster" outcome, not an error. Requires at
    /// least window_bars + 1 points so the trailing volume average excludes
    /// the current bar.
    pub fn detect(
        &self,
        prices: &[f64],
        volumes: &[f64],
        min_price_change_pct: f64,
        min_volume_ratio: f64,
    ) -> Option<FlowCluster> {
        let n = self.window_bars;
        if n == 0 || prices.len() <= n || volumes.len() <= n {
            return None;
        }

        let last_price = prices[prices.len() - 1];
        let base_price = prices[prices.len() - 1 - n];
        if base_price <= 0.0 {
            return None;
        }
        let price_change_pct = (last_price - base_price) / base_price * 100.0;

        let trailing = &volumes[volumes.len() - 1 - n..volumes.len() - 1];
        let avg_volume = trailing.iter().sum::<f64>() / trailing.len() as f64;
        if avg_volume <= 0.0 {
            return None;
        }
        let volume_ratio = volumes[volumes.len() - 1] / avg_volume;

        if price_change_pct.abs() < min_price_change_pct || volume_ratio < min_volume_ratio {
            return None;
        }

        Some(FlowCluster {
            price_change_pct,
            volume_ratio,
            strength: price_change_pct.abs() * volume_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_confirmed_cluster() {
        let prices = vec![100.0, 100.1, 100.2, 100.3, 100.4, 100.5];
        let volumes = vec![100.0, 100.0, 100.0, 100.0, 100.0, 200.0];
        let d = FlowClusterDetector::new(5);
        let cluster = d.detect(&prices, &volumes, 0.2, 1.5).unwrap();
        assert!((cluster.price_change_pct - 0.5).abs() < 1e-9);
        assert!((cluster.volume_ratio - 2.0).abs() < 1e-9);
        assert!((cluster.strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_cluster_when_volume_leg_fails() {
        let prices = vec![100.0, 100.1, 100.2, 100.3, 100.4, 100.5];
        let volumes = vec![100.0; 6];
        let d = FlowClusterDetector::new(5);
        assert!(d.detect(&prices, &volumes, 0.2, 1.5).is_none());
    }

    #[test]
    fn no_cluster_when_price_leg_fails() {
        let prices = vec![100.0; 6];
        let volumes = vec![100.0, 100.0, 100.0, 100.0, 100.0, 300.0];
        let d = FlowClusterDetector::new(5);
        assert!(d.detect(&prices, &volumes, 0.2, 1.5).is_none());
    }

    #[test]
    fn downward_move_counts_by_magnitude() {
        let prices = vec![100.5, 100.4, 100.3, 100.2, 100.1, 100.0];
        let volumes = vec![100.0, 100.0, 100.0, 100.0, 100.0, 200.0];
        let d = FlowClusterDetector::new(5);
        let cluster = d.detect(&prices, &volumes, 0.2, 1.5).unwrap();
        assert!(cluster.price_change_pct < 0.0);
        assert!(cluster.strength > 0.0);
    }

    #[test]
    fn insufficient_window_is_none() {
        let d = FlowClusterDetector::new(5);
        assert!(d.detect(&[100.0], &[100.0], 0.1, 1.1).is_none());
    }
}
