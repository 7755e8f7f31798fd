use std::time::Duration;

use log::*;
use vulkanalia::{vk, window as vk_window, Instance};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use crate::config::EngineConfig;
use crate::error::{RenderError, Result};

/// The configured size in physical pixels, unaffected by display scaling.
fn window_size(config: &EngineConfig) -> PhysicalSize<u32> {
    PhysicalSize::new(config.width, config.height)
}

/// Where the frame loop learns that it should stop.
pub trait EventSource {
    /// Drains pending window events without blocking.
    fn poll_events(&mut self);
    fn should_close(&self) -> bool;
}

/// The OS window the triangle is presented to.
///
/// Events are pumped by the caller once per frame instead of handing
/// control to the event loop, so the frame loop stays a plain `while`.
#[derive(Debug)]
pub struct PlatformWindow {
    window: Window,
    event_loop: EventLoop<()>,
    close_requested: bool,
}

impl PlatformWindow {
    pub fn new(config: &EngineConfig) -> Result<PlatformWindow> {
        let event_loop = EventLoop::new().map_err(|e| RenderError::Window(e.to_string()))?;
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(window_size(config))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(|e| RenderError::Window(e.to_string()))?;

        info!("Created window `{}` ({}x{}).", config.title, config.width, config.height);

        Ok(PlatformWindow {
            window,
            event_loop,
            close_requested: false,
        })
    }

    /// Instance extensions the platform needs to present to this window.
    pub fn required_extensions(&self) -> &'static [&'static vk::ExtensionName] {
        vk_window::get_required_instance_extensions(&self.window)
    }

    pub unsafe fn create_surface(&self, instance: &Instance) -> Result<vk::SurfaceKHR> {
        Ok(vk_window::create_surface(instance, &self.window, &self.window)?)
    }

    /// Size of the drawable area in pixels.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

impl EventSource for PlatformWindow {
    fn poll_events(&mut self) {
        let close_requested = &mut self.close_requested;
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _| {
                if let Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } = event
                {
                    info!("Close requested.");
                    *close_requested = true;
                }
            });

        if let PumpStatus::Exit(code) = status {
            debug!("Event loop exited with code {}.", code);
            self.close_requested = true;
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_sized_in_physical_pixels() {
        let size = window_size(&EngineConfig::default());
        assert_eq!((size.width, size.height), (720, 560));
        assert_eq!(size.to_logical::<u32>(2.0), winit::dpi::LogicalSize::new(360, 280));
    }
}
