//! Error handling for the watcher

pub mod watch_error;

pub use watch_error::*;
