//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// No Vulkan-capable GPU found
    #[error("No Vulkan-capable device found")]
    NoSuitableGpu,

    /// No queue family supports both graphics and presentation
    #[error("No queue family supports graphics and presentation")]
    NoSuitableQueueFamily,

    /// Shader loading or module creation error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_error_names_the_file() {
        let err = RhiError::ShaderError("Missing shader at 'shaders/triangle.vert.spv'".into());
        assert!(err.to_string().contains("shaders/triangle.vert.spv"));
    }

    #[test]
    fn test_vk_result_conversion() {
        let err: RhiError = ash::vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, RhiError::VulkanError(_)));
    }
}
