pub mod bar;
pub mod kinds;
pub mod level;

pub use bar::{Bar, BarSeries};
pub use kinds::*;
pub use level::{DpLevel, DpLevelSet};
