pub mod confluence;
pub mod flow;
pub mod regime;
pub mod structure;

pub use confluence::{ConfluenceFactors, ConfluenceScorer};
pub use flow::{FlowCluster, FlowClusterDetector};
pub use regime::RegimeDetector;
pub use structure::{DpStructure, DpStructureAnalyzer};
