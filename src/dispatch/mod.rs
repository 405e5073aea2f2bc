//! Alert queueing and delivery

pub mod queue;
pub mod telegram;

pub use queue::*;
pub use telegram::*;
