//! Core data types and structures

pub mod addresses;
pub mod account;
pub mod events;
pub mod alerts;
pub mod status;

pub use addresses::*;
pub use account::*;
pub use events::*;
pub use alerts::*;
pub use status::*;
