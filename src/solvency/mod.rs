//! Health metric sourcing

pub mod source;

pub use source::*;
