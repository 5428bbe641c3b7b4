//! Frame presentation loop for the Vro renderer.
//!
//! This crate drives the per-frame cycle on top of the `vro-rhi` Vulkan
//! layer: wait for a frame slot, acquire a swapchain image, record and
//! submit the triangle draw, present, advance to the next slot.

mod error;
mod frame;
mod renderer;

pub use error::{RendererError, RendererResult};
pub use frame::{FrameCursor, FRAMES_IN_FLIGHT};
pub use renderer::Renderer;
