use thiserror::Error;

use crate::models::Regime;

/// Library error taxonomy. Configuration problems are fatal at startup;
/// per-bar data issues never surface here because the replay loop absorbs them
/// and annotates the trace instead.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("regime thresholds table is missing an entry for {0}")]
    MissingRegime(Regime),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("bar sequence is not strictly increasing in timestamp at index {0}")]
    UnorderedBars(usize),
}
