//! Graphics pipeline and render pass for the triangle.
//!
//! This module builds the single-subpass render pass and the fixed graphics
//! pipeline that draws a full-screen-independent triangle from hardcoded
//! vertex positions in the vertex shader.
//!
//! # Overview
//!
//! [`TrianglePipeline`] owns the render pass, the pipeline layout, the two
//! shader modules, and the pipeline itself. Viewport and scissor are dynamic
//! state so the pipeline survives window resizes; everything else is baked
//! in at creation time.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::shader::{Shader, ShaderStage};

/// Path to the compiled vertex shader, relative to the working directory.
const VERTEX_SHADER_PATH: &str = "shaders/triangle.vert.spv";
/// Path to the compiled fragment shader, relative to the working directory.
const FRAGMENT_SHADER_PATH: &str = "shaders/triangle.frag.spv";

/// The render pass and graphics pipeline that draw the triangle.
///
/// Field order matters for drop order: the pipeline is destroyed explicitly
/// in `Drop` before the render pass and layout, and the shader modules are
/// kept alive for the pipeline's whole lifetime even though Vulkan would
/// permit destroying them after pipeline creation.
pub struct TrianglePipeline {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vertex shader module.
    #[allow(dead_code)]
    vertex_shader: Shader,
    /// Fragment shader module.
    #[allow(dead_code)]
    fragment_shader: Shader,
    /// Pipeline layout (empty, no descriptors or push constants).
    layout: vk::PipelineLayout,
    /// Single-subpass render pass targeting one color attachment.
    render_pass: vk::RenderPass,
    /// Graphics pipeline handle.
    pipeline: vk::Pipeline,
}

impl TrianglePipeline {
    /// Creates the render pass and graphics pipeline.
    ///
    /// `color_format` must match the format of the swapchain images the
    /// pipeline will render into.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader cannot be loaded or any of the Vulkan
    /// objects fail to create.
    pub fn new(device: Arc<Device>, color_format: vk::Format) -> RhiResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERTEX_SHADER_PATH),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAGMENT_SHADER_PATH),
            ShaderStage::Fragment,
        )?;

        let render_pass = create_render_pass(&device, color_format)?;
        let layout = create_pipeline_layout(&device)?;
        let pipeline =
            create_graphics_pipeline(&device, &vertex_shader, &fragment_shader, layout, render_pass)?;

        info!("Graphics pipeline created (color format {:?})", color_format);

        Ok(Self {
            device,
            vertex_shader,
            fragment_shader,
            layout,
            render_pass,
            pipeline,
        })
    }

    /// Returns the graphics pipeline handle.
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Returns the render pass handle.
    #[inline]
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

}

impl Drop for TrianglePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Destroyed graphics pipeline, render pass and layout");
    }
}

/// Creates the single-subpass render pass.
///
/// One color attachment: cleared on load, stored on completion, transitioned
/// from UNDEFINED straight to PRESENT_SRC_KHR. The external subpass
/// dependency delays the color write until the acquired image is actually
/// available.
fn create_render_pass(device: &Device, color_format: vk::Format) -> RhiResult<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    let color_attachment_ref = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpass = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_attachment_ref)];

    let dependency = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

    let attachments = [color_attachment];
    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpass)
        .dependencies(&dependency);

    let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

    debug!("Render pass created");

    Ok(render_pass)
}

/// Creates the empty pipeline layout (no descriptor sets, no push constants).
fn create_pipeline_layout(device: &Device) -> RhiResult<vk::PipelineLayout> {
    let create_info = vk::PipelineLayoutCreateInfo::default();
    let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };
    Ok(layout)
}

/// Creates the graphics pipeline.
///
/// Fixed-function state: no vertex input (positions live in the vertex
/// shader), triangle list topology, fill mode, back-face culling with
/// counter-clockwise front faces, no multisampling, no blending. Viewport
/// and scissor are dynamic.
fn create_graphics_pipeline(
    device: &Device,
    vertex_shader: &Shader,
    fragment_shader: &Shader,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> RhiResult<vk::Pipeline> {
    let stages = [
        vertex_shader.stage_create_info(),
        fragment_shader.stage_create_info(),
    ];

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Counts only; the actual viewport and scissor are set per frame.
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false)
        .line_width(1.0);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false);

    let blend_attachment = [vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(false)
        .color_write_mask(vk::ColorComponentFlags::RGBA)];

    let color_blend =
        vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachment);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device
            .handle()
            .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
            .map_err(|(_, e)| RhiError::VulkanError(e))?
    };

    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| RhiError::PipelineError("No pipeline returned by driver".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_paths_point_into_shaders_dir() {
        assert!(VERTEX_SHADER_PATH.starts_with("shaders/"));
        assert!(FRAGMENT_SHADER_PATH.starts_with("shaders/"));
        assert!(VERTEX_SHADER_PATH.ends_with(".spv"));
        assert!(FRAGMENT_SHADER_PATH.ends_with(".spv"));
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        // Compile-time check that TrianglePipeline is Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrianglePipeline>();
    }
}
