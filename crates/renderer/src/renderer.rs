//! The renderer: owns the whole Vulkan object graph and drives the frame
//! loop.
//!
//! # Frame cycle
//!
//! Each call to [`Renderer::present_frame`] runs one cycle against the
//! current frame slot:
//!
//! 1. Wait on the slot's fence (the slot's previous submission).
//! 2. Reset the fence.
//! 3. Acquire a swapchain image, signaling the slot's semaphore.
//! 4. Re-record the slot's command buffer: one render pass, one triangle.
//! 5. Submit, waiting on the semaphore and signaling the fence.
//! 6. Present the image.
//! 7. Advance the frame cursor.
//!
//! A stale surface is handled at two points: an out-of-date error during
//! acquisition rebuilds the swapchain and retries the acquisition once (the
//! semaphore was not consumed, so reusing it is safe), while a suboptimal
//! result lets the frame complete and rebuilds afterwards for the next one.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vro_platform::window::{Surface, Window};
use vro_rhi::command::{CommandBuffer, CommandPool};
use vro_rhi::device::Device;
use vro_rhi::instance::Instance;
use vro_rhi::pipeline::TrianglePipeline;
use vro_rhi::swapchain::{Swapchain, SWAPCHAIN_FORMAT};
use vro_rhi::sync::{Fence, Semaphore};
use vro_rhi::RhiResult;

use crate::error::{RendererError, RendererResult};
use crate::frame::{FrameCursor, FRAMES_IN_FLIGHT};

/// Background color the render pass clears to.
const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Vertices in the triangle draw (positions are hardcoded in the shader).
const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Per-slot resources for one in-flight frame.
struct FrameSlot {
    /// Signaled when this slot's submission has completed on the GPU.
    fence: Fence,
    /// Signaled when the acquired swapchain image is ready to render to.
    image_available: Semaphore,
    /// Re-recorded every time this slot comes around.
    command_buffer: CommandBuffer,
}

impl FrameSlot {
    /// Creates one slot's resources. The fence starts signaled so the first
    /// wait on it falls through immediately.
    fn new(device: &Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        Ok(Self {
            fence: Fence::new(device.clone(), true)?,
            image_available: Semaphore::new(device.clone())?,
            command_buffer: pool.allocate_buffer()?,
        })
    }
}

/// Owns every Vulkan object and drives the frame loop.
///
/// Field order is drop order: per-frame resources, pool and pipeline go
/// before the swapchain; the device's last `Arc` is released before the
/// surface, and the surface before the instance. `Drop` drains the device
/// first so nothing is destroyed while still in use.
pub struct Renderer {
    /// Per-frame slots, indexed by the cursor.
    frames: [FrameSlot; FRAMES_IN_FLIGHT],
    /// Pool the per-slot command buffers were allocated from.
    command_pool: CommandPool,
    /// Render pass and graphics pipeline.
    pipeline: TrianglePipeline,
    /// Swapchain with its image views and framebuffers.
    swapchain: Swapchain,
    /// Logical device and queue.
    device: Arc<Device>,
    /// Presentation surface. Held only for its lifetime; the raw handle it
    /// owns is referenced by the swapchain above.
    #[allow(dead_code)]
    surface: Surface,
    /// Vulkan instance. Held only for its lifetime.
    #[allow(dead_code)]
    instance: Instance,
    /// Which frame slot the next frame uses.
    cursor: FrameCursor,
    /// Most recent client-area width, used when rebuilding the swapchain.
    width: u32,
    /// Most recent client-area height, used when rebuilding the swapchain.
    height: u32,
}

impl Renderer {
    /// Brings up the full Vulkan object graph for `window`.
    ///
    /// Validation layers are enabled in debug builds only.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage of device or resource creation fails.
    /// Every such error is fatal to the caller; there is no partial bring-up.
    pub fn new(window: &Window) -> RendererResult<Self> {
        let display_handle = window
            .display_handle()
            .map_err(|e| vro_core::Error::Window(format!("No display handle: {}", e)))?
            .as_raw();

        let instance = Instance::new(display_handle, cfg!(debug_assertions))?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;
        let device = Device::new(&instance, surface.handle(), surface.loader())?;

        let pipeline = TrianglePipeline::new(device.clone(), SWAPCHAIN_FORMAT)?;
        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            surface.loader(),
            pipeline.render_pass(),
            window.width(),
            window.height(),
        )?;

        let command_pool = CommandPool::new(device.clone())?;
        let frames = [
            FrameSlot::new(&device, &command_pool)?,
            FrameSlot::new(&device, &command_pool)?,
        ];

        info!("Renderer initialized ({} frames in flight)", FRAMES_IN_FLIGHT);

        Ok(Self {
            frames,
            command_pool,
            pipeline,
            swapchain,
            device,
            surface,
            instance,
            cursor: FrameCursor::new(),
            width: window.width(),
            height: window.height(),
        })
    }

    /// Renders and presents one frame.
    ///
    /// A minimized window (zero-sized client area) makes this a no-op until
    /// a usable size arrives.
    ///
    /// # Errors
    ///
    /// Returns an error on any Vulkan failure other than the stale-surface
    /// results, which are absorbed by rebuilding the swapchain.
    pub fn present_frame(&mut self) -> RendererResult<()> {
        if vro_rhi::swapchain::is_degenerate_extent(self.width, self.height) {
            return Ok(());
        }

        let slot_index = self.cursor.index();

        self.frames[slot_index].fence.wait(u64::MAX)?;
        self.frames[slot_index].fence.reset()?;

        // Copy of the handle so the rebuild below can borrow self mutably.
        let image_available = self.frames[slot_index].image_available.handle();

        let (image_index, acquire_suboptimal) =
            match self.swapchain.acquire_next_image(image_available) {
                Ok(result) => result,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    // The semaphore was not signaled, so it can go straight
                    // into the retried acquisition.
                    debug!("Swapchain out of date on acquire, rebuilding");
                    self.swapchain.rebuild(self.width, self.height)?;
                    self.swapchain
                        .acquire_next_image(image_available)
                        .map_err(RendererError::Vulkan)?
                }
                Err(e) => return Err(RendererError::Vulkan(e)),
            };

        self.record_frame(slot_index, image_index)?;
        self.submit_frame(slot_index)?;

        let needs_rebuild = match self
            .swapchain
            .present(self.device.queue(), image_index)
        {
            Ok(suboptimal) => suboptimal || acquire_suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => true,
            Err(e) => return Err(RendererError::Vulkan(e)),
        };

        if needs_rebuild {
            debug!("Swapchain stale after present, rebuilding");
            self.swapchain.rebuild(self.width, self.height)?;
        }

        self.cursor.advance();

        Ok(())
    }

    /// Handles a window resize.
    ///
    /// Records the new size and rebuilds the swapchain; a zero-sized extent
    /// only records the size, leaving the rebuild for when the window
    /// becomes visible again.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuild fails.
    pub fn resize(&mut self, width: u32, height: u32) -> RendererResult<()> {
        self.width = width;
        self.height = height;
        self.swapchain.rebuild(width, height)?;
        Ok(())
    }

    /// Re-records the slot's command buffer for `image_index`.
    fn record_frame(&self, slot_index: usize, image_index: u32) -> RendererResult<()> {
        let cmd = &self.frames[slot_index].command_buffer;
        let extent = self.swapchain.extent();

        cmd.reset()?;
        cmd.begin()?;
        cmd.begin_render_pass(
            self.pipeline.render_pass(),
            self.swapchain.framebuffer(image_index),
            extent,
            CLEAR_COLOR,
        );
        cmd.bind_pipeline(self.pipeline.handle());
        cmd.set_viewport_and_scissor(extent);
        cmd.draw(TRIANGLE_VERTEX_COUNT, 1);
        cmd.end_render_pass();
        cmd.end()?;

        Ok(())
    }

    /// Submits the slot's command buffer, waiting on its image-available
    /// semaphore and signaling its fence.
    fn submit_frame(&self, slot_index: usize) -> RendererResult<()> {
        let slot = &self.frames[slot_index];

        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [slot.command_buffer.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers);

        unsafe {
            self.device.handle().queue_submit(
                self.device.queue(),
                &[submit_info],
                slot.fence.handle(),
            )?;
        }

        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Drain the GPU before field drops start destroying objects.
        if let Err(e) = self.device.wait_idle() {
            tracing::error!("Failed to drain device during renderer teardown: {:?}", e);
        }
        info!("Renderer shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_is_opaque_dark_gray() {
        assert_eq!(CLEAR_COLOR, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn test_triangle_vertex_count() {
        assert_eq!(TRIANGLE_VERTEX_COUNT, 3);
    }
}
