use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::{context::create_each, device::VulkanDevice, swapchain::VulkanSwapchain};
use crate::error::Result;

/// One color view per swapchain image, in swapchain order.
#[derive(Debug)]
pub struct VulkanImageViews {
    pub views: Vec<vk::ImageView>,
}

impl VulkanImageViews {
    pub unsafe fn create(
        device: &VulkanDevice,
        swapchain: &VulkanSwapchain,
    ) -> Result<VulkanImageViews> {
        let components = vk::ComponentMapping::builder()
            .r(vk::ComponentSwizzle::IDENTITY)
            .g(vk::ComponentSwizzle::IDENTITY)
            .b(vk::ComponentSwizzle::IDENTITY)
            .a(vk::ComponentSwizzle::IDENTITY);

        let subresource_range = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);

        let views = create_each(
            &swapchain.images,
            |i| {
                let info = vk::ImageViewCreateInfo::builder()
                    .image(*i)
                    .view_type(vk::ImageViewType::_2D)
                    .format(swapchain.format)
                    .components(components)
                    .subresource_range(subresource_range);

                device.vk_device.create_image_view(&info, None)
            },
            |v| device.vk_device.destroy_image_view(v, None),
        )?;

        debug!("Created {} swapchain image views.", views.len());

        Ok(VulkanImageViews { views })
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, views) = (device.vk_device.clone(), self.views.clone());
        move || unsafe {
            views
                .iter()
                .for_each(|v| device.destroy_image_view(*v, None));
        }
    }
}
