use serde::{Deserialize, Serialize};

use crate::models::{DpLevel, DpLevelSet};

const DP_STRENGTH_DENOM: f64 = 10_000_000.0;

/// Derived view of a level set against a reference price. Recomputed per
/// query, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DpStructure {
    /// Below reference price, nearest-first (descending price).
    pub support_levels: Vec<DpLevel>,
    /// At or above reference price, nearest-first (ascending price).
    pub resistance_levels: Vec<DpLevel>,
    /// High-volume contested levels, volume descending.
    pub battlegrounds: Vec<DpLevel>,
    /// min(total_volume / 1e7, 1.0)
    pub dp_strength_score: f64,
}

impl DpStructure {
    pub fn nearest_support(&self) -> Option<&DpLevel> {
        self.support_levels.first()
    }

    pub fn nearest_resistance(&self) -> Option<&DpLevel> {
        self.resistance_levels.first()
    }
}

/// Classifies dark-pool levels into support / resistance / battlegrounds
/// relative to a reference price.
pub struct DpStructureAnalyzer {
    pub battleground_volume_min: u64,
    pub near_level_pct: f64,
}

impl DpStructureAnalyzer {
    pub fn new(battleground_volume_min: u64, near_level_pct: f64) -> Self {
        Self {
            battleground_volume_min,
            near_level_pct,
        }
    }

    pub fn analyze(&self, levels: &DpLevelSet, reference_price: f64) -> DpStructure {
        // Ties at the reference price count as resistance so the partition
        // stays total.
        let mut support_levels: Vec<DpLevel> = levels
            .iter()
            .filter(|l| l.price < reference_price)
            .cloned()
            .collect();
        let mut resistance_levels: Vec<DpLevel> = levels
            .iter()
            .filter(|l| l.price >= reference_price)
            .cloned()
            .collect();

        support_levels.sort_by(|a, b| b.price.total_cmp(&a.price));
        resistance_levels.sort_by(|a, b| a.price.total_cmp(&b.price));

        let mut battlegrounds: Vec<DpLevel> = levels
            .iter()
            .filter(|l| l.volume >= self.battleground_volume_min)
            .cloned()
            .collect();
        battlegrounds.sort_by(|a, b| b.volume.cmp(&a.volume));

        let dp_strength_score = (levels.total_volume() as f64 / DP_STRENGTH_DENOM).min(1.0);

        DpStructure {
            support_levels,
            resistance_levels,
            battlegrounds,
            dp_strength_score,
        }
    }

    /// Magnet-zone query: levels within ±near_level_pct of the reference
    /// price, volume descending.
    pub fn near_levels(&self, levels: &DpLevelSet, reference_price: f64) -> Vec<DpLevel> {
        if reference_price <= 0.0 {
            return Vec::new();
        }
        let mut near: Vec<DpLevel> = levels
            .iter()
            .filter(|l| {
                (l.price - reference_price).abs() / reference_price * 100.0
                    <= self.near_level_pct
            })
            .cloned()
            .collect();
        near.sort_by(|a, b| b.volume.cmp(&a.volume));
        near
    }
}
