//! Data persistence and file operations

pub mod alerts;
pub mod liquidations;

pub use alerts::*;
pub use liquidations::*;
