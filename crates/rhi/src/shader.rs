//! Shader module management.
//!
//! This module handles loading precompiled SPIR-V blobs and VkShaderModule
//! creation. Shader bytecode is consumed as opaque bytes through the core
//! binary-loading collaborator; the only validation performed here is the
//! 4-byte alignment SPIR-V requires, everything else is left to the driver's
//! own module-creation check.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Shader stage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader stage
    Vertex,
    /// Fragment shader stage
    Fragment,
}

impl ShaderStage {
    /// Converts the shader stage to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Returns a human-readable name for the shader stage.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Vulkan shader module wrapper.
///
/// Manages the lifecycle of a VkShaderModule and carries the stage and entry
/// point information needed for pipeline creation. Immutable once created.
pub struct Shader {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan shader module handle.
    module: vk::ShaderModule,
    /// Shader stage type.
    stage: ShaderStage,
    /// Entry point function name.
    entry_point: CString,
}

impl Shader {
    /// Creates a shader module from a SPIR-V file.
    ///
    /// The file is read through [`vro_core::load_binary`]; a missing file or
    /// a module-creation failure produces an error naming the path.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if:
    /// - The file cannot be opened
    /// - The SPIR-V data is misaligned
    /// - Shader module creation fails
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        let code = load_spirv(path)?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe {
            device
                .handle()
                .create_shader_module(&create_info, None)
                .map_err(|e| {
                    RhiError::ShaderError(format!(
                        "Error in shader creation '{}': {:?}",
                        path.display(),
                        e
                    ))
                })?
        };

        info!("Created {} shader module from {:?}", stage, path);

        Ok(Self {
            device,
            module,
            stage,
            entry_point: CString::from(c"main"),
        })
    }

    /// Returns the Vulkan shader module handle.
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Creates a pipeline shader stage create info structure.
    ///
    /// The returned structure borrows from this shader and must not outlive
    /// it.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        tracing::debug!("Destroyed {} shader module", self.stage);
    }
}

/// Loads a SPIR-V file as 32-bit code words.
///
/// A missing or unreadable file produces an error naming the path.
fn load_spirv(path: &Path) -> RhiResult<Vec<u32>> {
    let bytes = vro_core::load_binary(path)
        .ok_or_else(|| RhiError::ShaderError(format!("Missing shader at '{}'", path.display())))?;

    spirv_words(&bytes)
}

/// Reinterprets a SPIR-V byte stream as 32-bit code words.
///
/// SPIR-V requires 4-byte alignment; anything else is rejected before it
/// reaches the driver.
fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be 4-byte aligned, got {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_spirv_words_rejects_misaligned_input() {
        let misaligned = vec![0u8; 5];
        assert!(spirv_words(&misaligned).is_err());
    }

    #[test]
    fn test_spirv_words_little_endian() {
        let bytes = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
        let words = spirv_words(&bytes).unwrap();
        // SPIR-V magic number followed by a version word
        assert_eq!(words, vec![0x0723_0203, 0x0001_0000]);
    }

    #[test]
    fn test_spirv_words_empty_input() {
        let words = spirv_words(&[]).unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn test_load_spirv_missing_file_names_path() {
        let err = load_spirv(Path::new("shaders/does_not_exist.spv")).unwrap_err();
        assert!(err.to_string().contains("shaders/does_not_exist.spv"));
    }

    #[test]
    fn test_load_spirv_reads_words_from_disk() {
        let mut path = std::env::temp_dir();
        path.push("vro_rhi_load_spirv_test.spv");

        std::fs::write(&path, [0x03, 0x02, 0x23, 0x07]).unwrap();

        let words = load_spirv(&path).unwrap();
        assert_eq!(words, vec![0x0723_0203]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_spirv_rejects_misaligned_file() {
        let mut path = std::env::temp_dir();
        path.push("vro_rhi_load_spirv_misaligned.spv");

        std::fs::write(&path, [0x03, 0x02, 0x23]).unwrap();

        assert!(load_spirv(&path).is_err());

        let _ = std::fs::remove_file(&path);
    }
}
