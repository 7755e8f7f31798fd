use log::*;
use vulkanalia::vk::{self, KhrSurfaceExtension};

use super::instance::VulkanInstance;
use crate::error::Result;
use crate::window::PlatformWindow;

/// The presentable target bound to the window.
#[derive(Debug)]
pub struct VulkanSurface {
    pub vk_surface: vk::SurfaceKHR,
}

impl VulkanSurface {
    pub unsafe fn new(window: &PlatformWindow, instance: &VulkanInstance) -> Result<VulkanSurface> {
        let vk_surface = window.create_surface(&instance.vk_instance)?;
        info!("Created window surface.");

        Ok(VulkanSurface { vk_surface })
    }

    pub fn destroyer(&self, instance: &VulkanInstance) -> impl FnOnce() + 'static {
        let (instance, surface) = (instance.vk_instance.clone(), self.vk_surface);
        move || unsafe { instance.destroy_surface_khr(surface, None) }
    }
}
