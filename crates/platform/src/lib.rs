//! Platform glue for the Vro renderer.
//!
//! This crate provides the thin OS-facing collaborators the renderer needs:
//! - Window management via winit
//! - Vulkan surface creation via ash-window
//! - Fatal error reporting (dialog + process exit)

pub mod fatal;
pub mod window;

pub use fatal::report_fatal;
pub use window::{Surface, Window};
