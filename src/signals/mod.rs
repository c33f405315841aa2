pub mod master;

pub use master::{MasterSignal, MasterSignalGenerator, RejectionTally};
