//! Vulkan device and queue selection.
//!
//! This module handles physical device selection, queue family selection, and
//! VkDevice creation.
//!
//! # Overview
//!
//! The [`Device`] struct wraps the logical device together with the single
//! queue the renderer uses. Selection is deliberately simple: the first
//! enumerated physical device is taken (no scoring heuristic), and the first
//! queue family that supports both graphics commands and presentation to the
//! given surface is used. The surface therefore has to exist before the
//! device is created.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::error::RhiError;
use crate::instance::Instance;

/// Required device extensions.
const DEVICE_EXTENSIONS: &[&std::ffi::CStr] = &[ash::khr::swapchain::NAME];

/// Vulkan logical device wrapper.
///
/// Owns the logical device and the single graphics+present queue. Shared
/// across the renderer via `Arc`; dropped last among device-level resources.
pub struct Device {
    /// Vulkan logical device handle.
    device: ash::Device,
    /// Physical device handle.
    physical_device: vk::PhysicalDevice,
    /// The single queue used for both graphics and presentation.
    queue: vk::Queue,
    /// Family index the queue was created from.
    queue_family_index: u32,
}

impl Device {
    /// Creates a new logical device.
    ///
    /// Selects the first enumerated physical device and its first queue
    /// family that supports both graphics and presentation to `surface`,
    /// then creates a logical device exposing one queue from that family and
    /// the swapchain extension.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No physical device is available ([`RhiError::NoSuitableGpu`])
    /// - No queue family supports graphics + present
    ///   ([`RhiError::NoSuitableQueueFamily`])
    /// - Logical device creation fails
    pub fn new(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Arc<Self>, RhiError> {
        let devices = unsafe { instance.handle().enumerate_physical_devices()? };

        // First enumerated device, no preference heuristic.
        let physical_device = *devices.first().ok_or(RhiError::NoSuitableGpu)?;
        debug!("Found {} physical device(s), using the first", devices.len());

        let queue_family_index = find_graphics_present_family(
            instance.handle(),
            physical_device,
            surface,
            surface_loader,
        )?
        .ok_or(RhiError::NoSuitableQueueFamily)?;

        let queue_priorities = [1.0f32];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];

        let extension_names: Vec<*const i8> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device, &create_info, None)?
        };

        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        info!(
            "Logical device created, graphics+present queue from family {}",
            queue_family_index
        );

        Ok(Arc::new(Self {
            device,
            physical_device,
            queue,
            queue_family_index,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device handle.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Returns the graphics+present queue handle.
    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Returns the queue family index the queue was created from.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Waits for the device to become idle.
    ///
    /// Blocks until all outstanding operations on all queues have completed.
    /// Used before rebuilding the swapchain and before teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            // Wait for all operations to complete before cleanup
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

/// Finds the first queue family supporting both graphics commands and
/// presentation to `surface`.
///
/// `Ok(None)` means no family qualifies; a failing surface-support query is
/// an error in its own right and is propagated, not treated as "unsupported".
fn find_graphics_present_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<Option<u32>, RhiError> {
    let queue_families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if !family_accepts_graphics(family) {
            continue;
        }

        let present_support = unsafe {
            surface_loader.get_physical_device_surface_support(physical_device, i, surface)?
        };

        if present_support {
            debug!("Selected queue family {} (graphics + present)", i);
            return Ok(Some(i));
        }
    }

    Ok(None)
}

/// Whether a queue family can take graphics work at all.
fn family_accepts_graphics(family: &vk::QueueFamilyProperties) -> bool {
    family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_extensions_defined() {
        assert!(DEVICE_EXTENSIONS.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_family_accepts_graphics() {
        let graphics = vk::QueueFamilyProperties {
            queue_count: 1,
            queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
            ..Default::default()
        };
        assert!(family_accepts_graphics(&graphics));

        let transfer_only = vk::QueueFamilyProperties {
            queue_count: 1,
            queue_flags: vk::QueueFlags::TRANSFER,
            ..Default::default()
        };
        assert!(!family_accepts_graphics(&transfer_only));

        let empty_family = vk::QueueFamilyProperties {
            queue_count: 0,
            queue_flags: vk::QueueFlags::GRAPHICS,
            ..Default::default()
        };
        assert!(!family_accepts_graphics(&empty_family));
    }

    #[test]
    fn test_device_is_send_sync() {
        // Compile-time check that Device is Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
