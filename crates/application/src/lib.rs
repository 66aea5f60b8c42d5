//! Application layer: the ports the resolution engine talks through.
pub mod context;
pub mod ports;

pub use context::ResolveContext;
