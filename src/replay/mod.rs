pub mod engine;
pub mod summary;

pub use engine::{BarState, ConfirmationFlags, MagnetAlert, NearLevel, ReplayEngine, ReplayTrace};
pub use summary::{write_trace_csv, SessionSummary};
