//! Identity-provider metadata and token-endpoint error classification.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
