use std::fmt;

use command_buffer::{record_triangle, TrianglePass, VulkanCommandBuffer};
use context::ResourceChain;
use device::VulkanDevice;
use framebuffer::VulkanFramebuffers;
use image::VulkanImageViews;
use instance::VulkanInstance;
use log::*;
use pipeline::VulkanPipeline;
use render_pass::VulkanRenderPass;
use surface::VulkanSurface;
use swapchain::VulkanSwapchain;
use sync::{FrameBackend, FrameSync};
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    vk::{self, DeviceV1_0, Handle, HasBuilder, KhrSwapchainExtension},
    Entry,
};

use crate::config::EngineConfig;
use crate::error::{RenderError, Result};
use crate::window::PlatformWindow;

mod command_buffer;
mod constants;
mod context;
mod device;
mod framebuffer;
mod image;
mod instance;
mod pipeline;
mod render_pass;
mod surface;
mod swapchain;
mod sync;

pub use context::{ChainError, Resource};
pub use device::SuitabilityError;

pub struct VulkanRenderer {
    _entry: Entry,
    device: VulkanDevice,
    swapchain: VulkanSwapchain,
    render_pass: VulkanRenderPass,
    pipeline: VulkanPipeline,
    framebuffers: VulkanFramebuffers,
    command_buffer: VulkanCommandBuffer,
    sync: FrameSync,
    chain: ResourceChain,
    frame: u64,
}

impl VulkanRenderer {
    pub unsafe fn new(window: &PlatformWindow, config: &EngineConfig) -> Result<VulkanRenderer> {
        VulkanRenderer::create(window, config).map_err(RenderError::during_setup)
    }

    /// Runs the whole init chain. Whatever was created before a failing step
    /// is destroyed again, newest first, when `chain` goes out of scope.
    unsafe fn create(window: &PlatformWindow, config: &EngineConfig) -> Result<VulkanRenderer> {
        let loader =
            LibloadingLoader::new(LIBRARY).map_err(|e| RenderError::Loader(e.to_string()))?;
        let entry = Entry::new(loader).map_err(|b| RenderError::Loader(b.to_string()))?;

        let mut chain = ResourceChain::default();

        let instance = VulkanInstance::new(window, &entry, config)?;
        chain.push(Resource::Instance, instance.destroyer())?;
        for extension in &instance.extensions {
            debug!("Enabled instance extension: {}", extension);
        }
        if let Some(destroy) = instance.messenger_destroyer() {
            chain.push(Resource::DebugMessenger, destroy)?;
        }

        let surface = VulkanSurface::new(window, &instance)?;
        chain.push(Resource::Surface, surface.destroyer(&instance))?;

        let device = VulkanDevice::new(&entry, &instance, &surface)?;
        chain.push(Resource::Device, device.destroyer())?;

        let swapchain = VulkanSwapchain::create(window.framebuffer_size(), &surface, &device)?;
        chain.push(Resource::Swapchain, swapchain.destroyer(&device))?;

        let image_views = VulkanImageViews::create(&device, &swapchain)?;
        chain.push(Resource::ImageViews, image_views.destroyer(&device))?;

        let render_pass = VulkanRenderPass::create(&device, swapchain.format)?;
        chain.push(Resource::RenderPass, render_pass.destroyer(&device))?;

        let layout = VulkanPipeline::create_layout(&device)?;
        chain.push(
            Resource::PipelineLayout,
            VulkanPipeline::layout_destroyer(&device, layout),
        )?;

        let pipeline = VulkanPipeline::create(&device, &render_pass, layout, config)?;
        chain.push(Resource::Pipeline, pipeline.destroyer(&device))?;

        let framebuffers =
            VulkanFramebuffers::create(&device, &render_pass, &swapchain, &image_views)?;
        chain.push(Resource::Framebuffers, framebuffers.destroyer(&device))?;

        let command_buffer = VulkanCommandBuffer::create(&device)?;
        chain.push(Resource::CommandPool, command_buffer.destroyer(&device))?;

        let sync = FrameSync::create(&device)?;
        chain.push(Resource::SyncObjects, sync.destroyer(&device))?;

        info!("Vulkan renderer ready ({} resources).", chain.created().len());

        Ok(VulkanRenderer {
            _entry: entry,
            device,
            swapchain,
            render_pass,
            pipeline,
            framebuffers,
            command_buffer,
            sync,
            chain,
            frame: 0,
        })
    }

    pub unsafe fn render(&mut self) -> Result<()> {
        let mut frame = VulkanFrame {
            device: &self.device,
            swapchain: &self.swapchain,
            command_buffer: &self.command_buffer,
            pass: TrianglePass {
                render_pass: self.render_pass.vk_render_pass,
                pipeline: self.pipeline.vk_pipeline,
                framebuffer: vk::Framebuffer::null(),
                extent: self.swapchain.extent,
            },
            framebuffers: &self.framebuffers,
        };

        let image_index = self.sync.draw_frame(&mut frame)?;
        self.frame += 1;
        trace!("Presented frame {} on image {}.", self.frame, image_index);

        Ok(())
    }

    pub unsafe fn device_wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    /// Waits for the GPU, then destroys every resource in reverse creation
    /// order. Calling it again does nothing.
    pub unsafe fn destroy(&mut self) {
        if self.chain.is_empty() {
            return;
        }
        if let Err(error) = self.device.wait_idle() {
            error!("Failed to wait for device idle before teardown: {}", error);
        }
        self.chain.teardown();
        info!("Destroyed Vulkan renderer after {} frames.", self.frame);
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe { self.destroy() };
    }
}

impl fmt::Debug for VulkanRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanRenderer")
            .field("swapchain", &self.swapchain)
            .field("chain", &self.chain)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// One frame's view of the renderer's handles.
struct VulkanFrame<'a> {
    device: &'a VulkanDevice,
    swapchain: &'a VulkanSwapchain,
    command_buffer: &'a VulkanCommandBuffer,
    framebuffers: &'a VulkanFramebuffers,
    pass: TrianglePass,
}

impl FrameBackend for VulkanFrame<'_> {
    fn wait_for_fence(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe { self.device.vk_device.wait_for_fences(&[fence], true, u64::MAX)? };
        Ok(())
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe { self.device.vk_device.reset_fences(&[fence])? };
        Ok(())
    }

    fn acquire_next_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
        let (image_index, code) = unsafe {
            self.device.vk_device.acquire_next_image_khr(
                self.swapchain.vk_swapchain,
                u64::MAX,
                signal,
                vk::Fence::null(),
            )?
        };
        if code == vk::SuccessCode::SUBOPTIMAL_KHR {
            debug!("Acquired image {} from a suboptimal swapchain.", image_index);
        }
        Ok(image_index)
    }

    fn reset_command_buffer(&mut self) -> Result<()> {
        unsafe { self.command_buffer.reset(self.device) }
    }

    fn record(&mut self, image_index: u32) -> Result<()> {
        let pass = TrianglePass {
            framebuffer: self.framebuffers.get(image_index),
            ..self.pass
        };
        record_triangle(&mut self.command_buffer.encoder(self.device), &pass)
    }

    fn submit(
        &mut self,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = &[wait];
        let wait_stages = &[wait_stage];
        let command_buffers = &[self.command_buffer.vk_command_buffer];
        let signal_semaphores = &[signal];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signal_semaphores);

        unsafe {
            self.device
                .vk_device
                .queue_submit(self.device.graphics_queue, &[submit_info], fence)?
        };
        Ok(())
    }

    fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> Result<()> {
        let wait_semaphores = &[wait];
        let swapchains = &[self.swapchain.vk_swapchain];
        let image_indices = &[image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        let code = unsafe {
            self.device
                .vk_device
                .queue_present_khr(self.device.present_queue, &present_info)?
        };
        if code == vk::SuccessCode::SUBOPTIMAL_KHR {
            debug!("Presented image {} to a suboptimal swapchain.", image_index);
        }
        Ok(())
    }
}
