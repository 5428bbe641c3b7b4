//! Swapchain management.
//!
//! This module handles VkSwapchainKHR creation, its image views and
//! framebuffers, and the in-place rebuild used after window resizes.
//!
//! # Overview
//!
//! The swapchain always uses the same fixed configuration: RGBA8 UNORM
//! images in the sRGB-nonlinear color space, FIFO presentation (vsync, the
//! only mode Vulkan guarantees), at least two images, identity transform and
//! opaque composite. What varies between builds is only the extent.
//!
//! Rebuilds are atomic from the caller's point of view: the new swapchain is
//! created first, chained to the old handle so in-flight presents can
//! complete, and the old objects are destroyed only after the new creation
//! succeeded.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// The image format every swapchain build requests.
pub const SWAPCHAIN_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// The color space every swapchain build requests.
pub const SWAPCHAIN_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;

/// Minimum number of swapchain images requested.
const MIN_IMAGE_COUNT: u32 = 2;

/// Vulkan swapchain wrapper.
///
/// Owns the swapchain, one image view per swapchain image, and one
/// framebuffer per image bound to the render pass given at creation. The
/// surface itself is borrowed; its owner must keep it alive for the
/// swapchain's whole lifetime.
pub struct Swapchain {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Swapchain extension loader.
    swapchain_loader: ash::khr::swapchain::Device,
    /// Surface extension loader, for capability queries on rebuild.
    surface_loader: ash::khr::surface::Instance,
    /// Surface the swapchain presents to (not owned).
    surface: vk::SurfaceKHR,
    /// Render pass the framebuffers are bound to (not owned).
    render_pass: vk::RenderPass,
    /// Vulkan swapchain handle.
    swapchain: vk::SwapchainKHR,
    /// Swapchain images (owned by the swapchain).
    images: Vec<vk::Image>,
    /// One image view per swapchain image.
    image_views: Vec<vk::ImageView>,
    /// One framebuffer per swapchain image.
    framebuffers: Vec<vk::Framebuffer>,
    /// Current extent width in pixels.
    width: u32,
    /// Current extent height in pixels.
    height: u32,
}

impl Swapchain {
    /// Creates a new swapchain and its per-image views and framebuffers.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface reports no usable capabilities or any
    /// of the Vulkan objects fail to create.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        render_pass: vk::RenderPass,
        width: u32,
        height: u32,
    ) -> RhiResult<Self> {
        let swapchain_loader =
            ash::khr::swapchain::Device::new(instance.handle(), device.handle());

        let mut swapchain = Self {
            device,
            swapchain_loader,
            surface_loader: surface_loader.clone(),
            surface,
            render_pass,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            width: 0,
            height: 0,
        };

        swapchain.build(width, height, vk::SwapchainKHR::null())?;

        info!(
            "Swapchain created: {}x{}, {} images, {:?}",
            swapchain.width,
            swapchain.height,
            swapchain.images.len(),
            SWAPCHAIN_FORMAT
        );

        Ok(swapchain)
    }

    /// Returns the swapchain handle.
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Returns the current extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    /// Returns the framebuffer for the given image index.
    #[inline]
    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize]
    }

    /// Acquires the next swapchain image.
    ///
    /// `semaphore` is signaled once the image is actually ready to render to.
    /// On success returns the image index and whether the swapchain is
    /// suboptimal for the surface. `ERROR_OUT_OF_DATE_KHR` is surfaced to the
    /// caller so it can rebuild; in that case the semaphore was not signaled
    /// and may be reused.
    pub fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    /// Presents the given image on `queue`.
    ///
    /// Submission-order guarantees against the preceding render submit on the
    /// same queue stand in for a present-wait semaphore here. On success
    /// returns whether the swapchain is suboptimal; `ERROR_OUT_OF_DATE_KHR`
    /// is surfaced to the caller.
    pub fn present(&self, queue: vk::Queue, image_index: u32) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    /// Rebuilds the swapchain for a new extent.
    ///
    /// A degenerate extent (zero width or height, e.g. a minimized window)
    /// is a no-op; the existing swapchain stays in place until a usable size
    /// arrives. Otherwise the device is drained, the new swapchain is created
    /// chained to the old one, and the old objects are destroyed exactly once
    /// after the new creation succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the device drain or any creation fails. On
    /// creation failure the old swapchain is left untouched.
    pub fn rebuild(&mut self, width: u32, height: u32) -> RhiResult<()> {
        if is_degenerate_extent(width, height) {
            debug!("Skipping swapchain rebuild for degenerate extent {}x{}", width, height);
            return Ok(());
        }

        self.device.wait_idle()?;

        let old_swapchain = self.swapchain;
        let old_views = std::mem::take(&mut self.image_views);
        let old_framebuffers = std::mem::take(&mut self.framebuffers);

        match self.build(width, height, old_swapchain) {
            Ok(()) => {
                self.destroy_objects(old_swapchain, &old_views, &old_framebuffers);
                info!("Swapchain rebuilt: {}x{}", self.width, self.height);
                Ok(())
            }
            Err(e) => {
                // Put the old objects back; the caller may retry later.
                self.image_views = old_views;
                self.framebuffers = old_framebuffers;
                Err(e)
            }
        }
    }

    /// Creates the swapchain, image views and framebuffers for `width` x
    /// `height`, replacing the handles in `self`. Does not destroy anything.
    fn build(&mut self, width: u32, height: u32, old_swapchain: vk::SwapchainKHR) -> RhiResult<()> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(
                    self.device.physical_device(),
                    self.surface,
                )?
        };

        let extent = surface_extent(&capabilities, width, height);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(resolve_image_count(&capabilities))
            .image_format(SWAPCHAIN_FORMAT)
            .image_color_space(SWAPCHAIN_COLOR_SPACE)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| RhiError::SwapchainError(format!("Creation failed: {:?}", e)))?
        };

        // From here on a failure must not leak the new swapchain: destroy
        // whatever of the new generation exists before returning.
        let images = match unsafe { self.swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e.into());
            }
        };

        let image_views = match create_image_views(&self.device, &images) {
            Ok(views) => views,
            Err(e) => {
                unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e);
            }
        };

        let framebuffers =
            match create_framebuffers(&self.device, self.render_pass, &image_views, extent) {
                Ok(framebuffers) => framebuffers,
                Err(e) => {
                    self.destroy_objects(swapchain, &image_views, &[]);
                    return Err(e);
                }
            };

        self.swapchain = swapchain;
        self.images = images;
        self.image_views = image_views;
        self.framebuffers = framebuffers;
        self.width = extent.width;
        self.height = extent.height;

        Ok(())
    }

    /// Destroys one generation of swapchain objects.
    fn destroy_objects(
        &self,
        swapchain: vk::SwapchainKHR,
        views: &[vk::ImageView],
        framebuffers: &[vk::Framebuffer],
    ) {
        unsafe {
            for &framebuffer in framebuffers {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
            for &view in views {
                self.device.handle().destroy_image_view(view, None);
            }
            if swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(swapchain, None);
            }
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        let views = std::mem::take(&mut self.image_views);
        let framebuffers = std::mem::take(&mut self.framebuffers);
        self.destroy_objects(self.swapchain, &views, &framebuffers);
        info!("Swapchain destroyed");
    }
}

/// Returns true if either dimension is zero, meaning there is nothing to
/// present to (minimized window).
pub fn is_degenerate_extent(width: u32, height: u32) -> bool {
    width == 0 || height == 0
}

/// Resolves the image count to request: at least [`MIN_IMAGE_COUNT`], inside
/// the range the surface supports (a max of 0 means unbounded).
fn resolve_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = MIN_IMAGE_COUNT.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Resolves the swapchain extent from the surface capabilities.
///
/// When the surface reports a fixed current extent, that wins; otherwise the
/// requested size is clamped into the supported range.
fn surface_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Creates one color image view per swapchain image. On failure, views
/// created so far are destroyed before the error is returned.
fn create_image_views(device: &Device, images: &[vk::Image]) -> RhiResult<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());

    for &image in images {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(SWAPCHAIN_FORMAT)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => views.push(view),
            Err(e) => {
                unsafe {
                    for &view in &views {
                        device.handle().destroy_image_view(view, None);
                    }
                }
                return Err(e.into());
            }
        }
    }

    Ok(views)
}

/// Creates one framebuffer per image view, bound to `render_pass`. On
/// failure, framebuffers created so far are destroyed before the error is
/// returned.
fn create_framebuffers(
    device: &Device,
    render_pass: vk::RenderPass,
    image_views: &[vk::ImageView],
    extent: vk::Extent2D,
) -> RhiResult<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(image_views.len());

    for &view in image_views {
        let attachments = [view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        match unsafe { device.handle().create_framebuffer(&create_info, None) } {
            Ok(framebuffer) => framebuffers.push(framebuffer),
            Err(e) => {
                unsafe {
                    for &framebuffer in &framebuffers {
                        device.handle().destroy_framebuffer(framebuffer, None);
                    }
                }
                return Err(e.into());
            }
        }
    }

    Ok(framebuffers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_extent() {
        assert!(is_degenerate_extent(0, 600));
        assert!(is_degenerate_extent(800, 0));
        assert!(is_degenerate_extent(0, 0));
        assert!(!is_degenerate_extent(800, 600));
        assert!(!is_degenerate_extent(1, 1));
    }

    #[test]
    fn test_surface_extent_uses_fixed_current_extent() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            ..Default::default()
        };
        let extent = surface_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn test_surface_extent_clamps_requested_size() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        };

        let extent = surface_extent(&capabilities, 8192, 16);
        assert_eq!(extent.width, 4096);
        assert_eq!(extent.height, 64);

        let extent = surface_extent(&capabilities, 1024, 768);
        assert_eq!(extent.width, 1024);
        assert_eq!(extent.height, 768);
    }

    #[test]
    fn test_resolve_image_count_respects_surface_range() {
        let unbounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 1,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(resolve_image_count(&unbounded), MIN_IMAGE_COUNT);

        let raised_min = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 8,
            ..Default::default()
        };
        assert_eq!(resolve_image_count(&raised_min), 3);

        let capped = vk::SurfaceCapabilitiesKHR {
            min_image_count: 1,
            max_image_count: 1,
            ..Default::default()
        };
        assert_eq!(resolve_image_count(&capped), 1);
    }
}
