//! Content store backends.

pub mod http;
pub mod memory;
