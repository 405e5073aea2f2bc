//! Configuration management for the liquidation watcher

pub mod settings;

pub use settings::*;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref CONFIG: Config = Config::load();
}
