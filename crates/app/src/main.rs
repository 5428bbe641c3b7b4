//! Vro application entry point.
//!
//! Creates the window and the renderer, then runs the event loop in poll
//! mode so a frame is presented every iteration. Any renderer error is
//! fatal: it is reported to the user through a message dialog and the
//! process exits.

use tracing::info;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use vro_platform::fatal::report_fatal;
use vro_platform::window::Window;
use vro_renderer::Renderer;

const WINDOW_TITLE: &str = "Vro";
const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;

/// Application state for the winit event loop.
///
/// Window and renderer are created on `resumed` (the first point the event
/// loop allows window creation). The renderer field comes first so it is
/// torn down before the window on exit.
#[derive(Default)]
struct App {
    renderer: Option<Renderer>,
    window: Option<Window>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE) {
            Ok(window) => window,
            Err(e) => report_fatal(&format!("Failed to create window: {}", e)),
        };

        let renderer = match Renderer::new(&window) {
            Ok(renderer) => renderer,
            Err(e) => report_fatal(&format!("Failed to initialize renderer: {}", e)),
        };

        window.request_redraw();

        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(window) = &mut self.window {
                    window.resize(size.width, size.height);
                }
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.resize(size.width, size.height) {
                        report_fatal(&format!("Failed to resize swapchain: {}", e));
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.present_frame() {
                        report_fatal(&format!("Failed to present frame: {}", e));
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Continuous rendering: kick off the next frame as soon as the
        // current batch of events is drained.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    vro_core::init_logging();

    info!("Starting {}", WINDOW_TITLE);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    event_loop.run_app(&mut app)?;

    info!("Event loop finished");

    Ok(())
}
