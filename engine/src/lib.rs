use log::*;

pub mod config;
pub mod error;
mod renderer;
mod vulkan;
pub mod window;

use config::EngineConfig;
use error::Result;
use renderer::Renderer;
use window::{EventSource, PlatformWindow};

/// The window and the renderer drawing into it.
#[derive(Debug)]
pub struct Engine {
    // Declared first so it is dropped before the window it presents to.
    renderer: Renderer,
    window: PlatformWindow,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Engine> {
        let window = PlatformWindow::new(&config)?;
        let renderer = Renderer::create(&window, &config)?;

        Ok(Engine { renderer, window })
    }

    /// Draws frames until the window is closed or a frame fails.
    pub fn run(mut self) -> Result<()> {
        let renderer = &mut self.renderer;
        let result = frame_loop(&mut self.window, || renderer.render());

        // Nothing may be destroyed while the last submission is still running.
        let idle = self.renderer.wait_idle();
        self.renderer.destroy();

        result.and(idle)
    }
}

/// Every error ends the loop. A stale swapchain is the one error that could
/// be recovered from, but recreation is not implemented.
fn frame_loop<W, R>(window: &mut W, mut render: R) -> Result<()>
where
    W: EventSource,
    R: FnMut() -> Result<()>,
{
    while !window.should_close() {
        window.poll_events();

        if let Err(error) = render() {
            if error.is_recoverable() {
                warn!("{} Swapchain recreation is not supported.", error);
            }
            error!("Frame loop stopped ({:?}): {}", error.kind(), error);
            return Err(error);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use vulkanalia::vk;

    /// Requests a close after a fixed number of polls.
    struct ScriptedWindow {
        polls: usize,
        close_after: usize,
    }

    impl EventSource for ScriptedWindow {
        fn poll_events(&mut self) {
            self.polls += 1;
        }

        fn should_close(&self) -> bool {
            self.polls >= self.close_after
        }
    }

    #[test]
    fn draws_once_per_poll_until_closed() {
        let mut window = ScriptedWindow {
            polls: 0,
            close_after: 4,
        };
        let mut frames = 0;

        frame_loop(&mut window, || {
            frames += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(frames, 4);
        assert_eq!(window.polls, 4);
    }

    #[test]
    fn closed_window_draws_nothing() {
        let mut window = ScriptedWindow {
            polls: 0,
            close_after: 0,
        };
        let mut frames = 0;

        frame_loop(&mut window, || {
            frames += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(frames, 0);
        assert_eq!(window.polls, 0);
    }

    #[test]
    fn first_error_ends_the_loop() {
        let mut window = ScriptedWindow {
            polls: 0,
            close_after: 100,
        };
        let mut frames = 0;

        let error = frame_loop(&mut window, || {
            frames += 1;
            if frames == 3 {
                Err(vk::ErrorCode::DEVICE_LOST.into())
            } else {
                Ok(())
            }
        })
        .unwrap_err();

        assert!(matches!(error, RenderError::Vulkan(vk::ErrorCode::DEVICE_LOST)));
        assert_eq!(frames, 3);
    }

    #[test]
    fn stale_swapchain_is_still_fatal() {
        let mut window = ScriptedWindow {
            polls: 0,
            close_after: 100,
        };

        let error = frame_loop(&mut window, || Err(vk::ErrorCode::OUT_OF_DATE_KHR.into()))
            .unwrap_err();

        assert!(error.is_recoverable());
        assert_eq!(window.polls, 1);
    }
}
