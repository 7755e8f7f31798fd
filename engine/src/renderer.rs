use crate::config::EngineConfig;
use crate::error::Result;
use crate::vulkan::VulkanRenderer;
use crate::window::PlatformWindow;

#[derive(Debug)]
pub struct Renderer {
    vk_renderer: VulkanRenderer,
}

impl Renderer {
    /// Creates the Vulkan renderer for `window`.
    pub fn create(window: &PlatformWindow, config: &EngineConfig) -> Result<Self> {
        let vk_renderer = unsafe { VulkanRenderer::new(window, config)? };

        Ok(Self { vk_renderer })
    }

    /// Draws and presents one frame.
    pub fn render(&mut self) -> Result<()> {
        unsafe { self.vk_renderer.render() }
    }

    /// Blocks until the GPU has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.vk_renderer.device_wait_idle() }
    }

    /// Destroys the Vulkan renderer.
    pub fn destroy(&mut self) {
        unsafe { self.vk_renderer.destroy() };
    }
}
