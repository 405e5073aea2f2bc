//! Debounced health check scheduling and periodic sweeps

pub mod engine;
pub mod registry;
pub mod sweep;

pub use engine::*;
pub use registry::*;
pub use sweep::*;
