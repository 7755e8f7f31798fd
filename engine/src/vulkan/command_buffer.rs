use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

use super::constants;
use super::device::VulkanDevice;
use crate::error::Result;

/// The commands a frame is recorded with.
pub trait CommandEncoder {
    fn begin(&mut self) -> Result<()>;
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear: [f32; 4],
    );
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);
    fn set_viewport(&mut self, extent: vk::Extent2D);
    fn set_scissor(&mut self, extent: vk::Extent2D);
    fn draw(&mut self, vertices: u32, instances: u32, first_vertex: u32, first_instance: u32);
    fn end_render_pass(&mut self);
    fn end(&mut self) -> Result<()>;
}

/// Everything one triangle frame is recorded against.
#[derive(Copy, Clone, Debug)]
pub struct TrianglePass {
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

pub fn record_triangle<E: CommandEncoder>(encoder: &mut E, pass: &TrianglePass) -> Result<()> {
    encoder.begin()?;
    encoder.begin_render_pass(
        pass.render_pass,
        pass.framebuffer,
        pass.extent,
        constants::CLEAR_COLOR,
    );
    encoder.bind_pipeline(pass.pipeline);
    encoder.set_viewport(pass.extent);
    encoder.set_scissor(pass.extent);
    encoder.draw(constants::TRIANGLE_VERTEX_COUNT, 1, 0, 0);
    encoder.end_render_pass();
    encoder.end()
}

/// A pool on the graphics family and the single primary buffer allocated
/// from it. The buffer is reset and re-recorded every frame.
#[derive(Debug)]
pub struct VulkanCommandBuffer {
    pub vk_command_pool: vk::CommandPool,
    pub vk_command_buffer: vk::CommandBuffer,
}

impl VulkanCommandBuffer {
    pub unsafe fn create(device: &VulkanDevice) -> Result<VulkanCommandBuffer> {
        let info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.selection.indices.graphics);

        let vk_command_pool = device.vk_device.create_command_pool(&info, None)?;

        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(vk_command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let vk_command_buffer = match device.vk_device.allocate_command_buffers(&allocate_info) {
            Ok(buffers) => buffers[0],
            Err(error) => {
                device.vk_device.destroy_command_pool(vk_command_pool, None);
                return Err(error.into());
            }
        };

        debug!(
            "Created command pool on queue family {}.",
            device.selection.indices.graphics
        );

        Ok(VulkanCommandBuffer {
            vk_command_pool,
            vk_command_buffer,
        })
    }

    pub unsafe fn reset(&self, device: &VulkanDevice) -> Result<()> {
        device
            .vk_device
            .reset_command_buffer(self.vk_command_buffer, vk::CommandBufferResetFlags::empty())?;
        Ok(())
    }

    pub fn encoder<'a>(&self, device: &'a VulkanDevice) -> VulkanEncoder<'a> {
        VulkanEncoder {
            device: &device.vk_device,
            command_buffer: self.vk_command_buffer,
        }
    }

    /// Freeing the pool frees the buffer allocated from it.
    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, pool) = (device.vk_device.clone(), self.vk_command_pool);
        move || unsafe { device.destroy_command_pool(pool, None) }
    }
}

/// Records straight into a Vulkan command buffer.
pub struct VulkanEncoder<'a> {
    device: &'a Device,
    command_buffer: vk::CommandBuffer,
}

impl CommandEncoder for VulkanEncoder<'_> {
    fn begin(&mut self) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::builder();
        unsafe { self.device.begin_command_buffer(self.command_buffer, &info)? };
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear: [f32; 4],
    ) {
        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D::default())
            .extent(extent);

        let color_clear_value = vk::ClearValue {
            color: vk::ClearColorValue { float32: clear },
        };

        let clear_values = &[color_clear_value];
        let info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &info, vk::SubpassContents::INLINE)
        };
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            )
        };
    }

    fn set_viewport(&mut self, extent: vk::Extent2D) {
        let viewport = vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0);
        unsafe { self.device.cmd_set_viewport(self.command_buffer, 0, &[viewport]) };
    }

    fn set_scissor(&mut self, extent: vk::Extent2D) {
        let scissor = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(extent);
        unsafe { self.device.cmd_set_scissor(self.command_buffer, 0, &[scissor]) };
    }

    fn draw(&mut self, vertices: u32, instances: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            self.device.cmd_draw(
                self.command_buffer,
                vertices,
                instances,
                first_vertex,
                first_instance,
            )
        };
    }

    fn end_render_pass(&mut self) {
        unsafe { self.device.cmd_end_render_pass(self.command_buffer) };
    }

    fn end(&mut self) -> Result<()> {
        unsafe { self.device.end_command_buffer(self.command_buffer)? };
        Ok(())
    }
}
