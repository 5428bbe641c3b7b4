//! Core utilities for the Vro renderer.
//!
//! This crate provides foundational pieces used across the renderer:
//! - Error types and result aliases
//! - Logging initialization
//! - Binary blob loading (compiled shaders)

mod binary;
mod error;
mod logging;

pub use binary::load_binary;
pub use error::{Error, Result};
pub use logging::init_logging;
