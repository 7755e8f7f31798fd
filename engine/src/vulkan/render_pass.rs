use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::device::VulkanDevice;
use crate::error::Result;

/// A single color attachment cleared on load and handed to presentation.
pub fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build()
}

/// Holds color output of subpass 0 until the image-available wait, which is
/// issued at the same stage, has been satisfied.
pub fn external_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build()
}

#[derive(Debug)]
pub struct VulkanRenderPass {
    pub vk_render_pass: vk::RenderPass,
}

impl VulkanRenderPass {
    pub unsafe fn create(device: &VulkanDevice, format: vk::Format) -> Result<VulkanRenderPass> {
        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let color_attachments = &[color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(color_attachments);

        let attachments = &[color_attachment(format)];
        let subpasses = &[subpass];
        let dependencies = &[external_dependency()];
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(attachments)
            .subpasses(subpasses)
            .dependencies(dependencies);

        let vk_render_pass = device.vk_device.create_render_pass(&info, None)?;
        debug!("Created render pass ({:?}).", format);

        Ok(VulkanRenderPass { vk_render_pass })
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, render_pass) = (device.vk_device.clone(), self.vk_render_pass);
        move || unsafe { device.destroy_render_pass(render_pass, None) }
    }
}
