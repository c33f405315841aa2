pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod providers;
pub mod replay;
pub mod signals;
#[cfg(test)]
pub mod test_helpers;
