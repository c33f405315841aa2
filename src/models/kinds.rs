use serde::{Deserialize, Serialize};
use std::fmt;

/// Prevailing short-term trend classification, used to adapt admission
/// thresholds: trending regimes admit earlier, chop demands more proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Uptrend,
    Downtrend,
    Chop,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Uptrend => write!(f, "uptrend"),
            Regime::Downtrend => write!(f, "downtrend"),
            Regime::Chop => write!(f, "chop"),
        }
    }
}

impl Regime {
    pub fn is_trending(&self) -> bool {
        !matches!(self, Regime::Chop)
    }
}

/// Per-bar outcome of the replay evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    SignalBuy,
    SignalSell,
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::SignalBuy => write!(f, "signal_buy"),
            Decision::SignalSell => write!(f, "signal_sell"),
            Decision::Hold => write!(f, "hold"),
        }
    }
}

impl Decision {
    pub fn is_signal(&self) -> bool {
        !matches!(self, Decision::Hold)
    }

    pub fn to_action(self) -> Option<Action> {
        match self {
            Decision::SignalBuy => Some(Action::Buy),
            Decision::SignalSell => Some(Action::Sell),
            Decision::Hold => None,
        }
    }
}

/// Direction of an actionable master signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
        }
    }
}

/// Reported buy/sell lean of a dark-pool level, when the provider supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideBias {
    Buy,
    Sell,
}

impl fmt::Display for SideBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideBias::Buy => write!(f, "buy"),
            SideBias::Sell => write!(f, "sell"),
        }
    }
}

/// Why a raw signal was dropped instead of promoted. Classification always
/// follows the same precedence order so identical inputs land in the same
/// bucket: dp strength, volume, momentum, regime, magnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    LowDpStrength,
    NoVolume,
    WeakMomentum,
    PoorRegime,
    NoMagnetInteraction,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::LowDpStrength => write!(f, "low_dp_strength"),
            RejectionReason::NoVolume => write!(f, "no_volume"),
            RejectionReason::WeakMomentum => write!(f, "weak_momentum"),
            RejectionReason::PoorRegime => write!(f, "poor_regime"),
            RejectionReason::NoMagnetInteraction => write!(f, "no_magnet_interaction"),
        }
    }
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 5] = [
        RejectionReason::LowDpStrength,
        RejectionReason::NoVolume,
        RejectionReason::WeakMomentum,
        RejectionReason::PoorRegime,
        RejectionReason::NoMagnetInteraction,
    ];
}
