use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::{
    context::create_each, device::VulkanDevice, image::VulkanImageViews,
    render_pass::VulkanRenderPass, swapchain::VulkanSwapchain,
};
use crate::error::Result;

/// One framebuffer per image view, index-aligned with the swapchain images.
#[derive(Debug)]
pub struct VulkanFramebuffers {
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl VulkanFramebuffers {
    pub unsafe fn create(
        device: &VulkanDevice,
        render_pass: &VulkanRenderPass,
        swapchain: &VulkanSwapchain,
        image_views: &VulkanImageViews,
    ) -> Result<VulkanFramebuffers> {
        let framebuffers = create_each(
            &image_views.views,
            |view| {
                let attachments = &[*view];
                let create_info =
                    framebuffer_info(render_pass.vk_render_pass, attachments, swapchain.extent);

                device.vk_device.create_framebuffer(&create_info, None)
            },
            |f| device.vk_device.destroy_framebuffer(f, None),
        )?;

        debug!("Created {} framebuffers.", framebuffers.len());

        Ok(VulkanFramebuffers { framebuffers })
    }

    pub fn get(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize]
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, framebuffers) = (device.vk_device.clone(), self.framebuffers.clone());
        move || unsafe {
            framebuffers
                .iter()
                .for_each(|f| device.destroy_framebuffer(*f, None));
        }
    }
}

fn framebuffer_info(
    render_pass: vk::RenderPass,
    attachments: &[vk::ImageView],
    extent: vk::Extent2D,
) -> vk::FramebufferCreateInfoBuilder<'_> {
    vk::FramebufferCreateInfo::builder()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1)
}
