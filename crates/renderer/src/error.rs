//! Renderer-level error types.

use thiserror::Error;

use vro_rhi::RhiError;

/// Renderer-level error type.
#[derive(Error, Debug)]
pub enum RendererError {
    /// Error from the Vulkan abstraction layer
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Error from the core or platform layers
    #[error(transparent)]
    Core(#[from] vro_core::Error),

    /// Raw Vulkan error from queue operations
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] ash::vk::Result),
}

/// Result type alias for renderer operations.
pub type RendererResult<T> = std::result::Result<T, RendererError>;
