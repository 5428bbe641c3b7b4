//! Vulkan abstraction layer for the Vro renderer.
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance creation with optional validation
//! - Device and queue selection
//! - Swapchain, image view, and framebuffer management
//! - Render pass and graphics pipeline creation
//! - Command pool/buffer recording
//! - Synchronization primitives

mod error;

pub mod command;
pub mod device;
pub mod instance;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
