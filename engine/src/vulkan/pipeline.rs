use super::constants;
use super::device::VulkanDevice;
use super::render_pass::VulkanRenderPass;
use crate::config::EngineConfig;
use crate::error::{RenderError, Result};
use log::*;
use std::path::Path;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder};

/// Reads a precompiled SPIR-V blob from disk.
pub fn read_shader(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| RenderError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded shader `{}` ({} bytes).", path.display(), bytes.len());
    Ok(bytes)
}

/// Filled polygons, back faces culled, clockwise winding is front facing.
pub fn rasterization_state() -> vk::PipelineRasterizationStateCreateInfo {
    vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false)
        .build()
}

/// Straight alpha: `src * a + dst * (1 - a)` on color, source alpha kept.
pub fn alpha_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::all())
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .build()
}

#[derive(Debug)]
pub struct VulkanPipeline {
    pub vk_pipeline: vk::Pipeline,
}

impl VulkanPipeline {
    pub unsafe fn create_layout(device: &VulkanDevice) -> Result<vk::PipelineLayout> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        Ok(device
            .vk_device
            .create_pipeline_layout(&layout_info, None)?)
    }

    /// Builds the triangle pipeline against `layout`; the shader modules only
    /// live until the pipeline has been linked.
    pub unsafe fn create(
        device: &VulkanDevice,
        render_pass: &VulkanRenderPass,
        layout: vk::PipelineLayout,
        config: &EngineConfig,
    ) -> Result<VulkanPipeline> {
        let vert = read_shader(&config.vertex_shader_path())?;
        let frag = read_shader(&config.fragment_shader_path())?;

        let vertex_shader_module = VulkanPipeline::create_shader_module(device, &vert)?;
        let fragment_shader_module =
            match VulkanPipeline::create_shader_module(device, &frag) {
                Ok(module) => module,
                Err(error) => {
                    device
                        .vk_device
                        .destroy_shader_module(vertex_shader_module, None);
                    return Err(error);
                }
            };

        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        // The three vertices are generated in the vertex shader.
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // viewport and scissor are set while recording
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = &[vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(dynamic_states);

        let rasterization_state = rasterization_state();
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::_1);

        let attachments = &[alpha_blend_attachment()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        let stages = &[vert_stage, frag_stage];
        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass.vk_render_pass)
            .subpass(0)
            .base_pipeline_handle(vk::Pipeline::null())
            .base_pipeline_index(-1);

        let pipeline = device.vk_device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            &[info],
            None,
        );

        [vertex_shader_module, fragment_shader_module]
            .into_iter()
            .for_each(|m| device.vk_device.destroy_shader_module(m, None));

        let vk_pipeline = pipeline?.0[0];
        info!("Created graphics pipeline.");

        Ok(VulkanPipeline {
            vk_pipeline,
        })
    }

    unsafe fn create_shader_module(
        device: &VulkanDevice,
        bytecode: &[u8],
    ) -> Result<vk::ShaderModule> {
        let bytecode = Bytecode::new(bytecode)
            .map_err(|e| RenderError::ShaderBytecode(format!("{:?}", e)))?;
        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(bytecode.code_size())
            .code(bytecode.code());

        Ok(device.vk_device.create_shader_module(&info, None)?)
    }

    pub fn layout_destroyer(
        device: &VulkanDevice,
        layout: vk::PipelineLayout,
    ) -> impl FnOnce() + 'static {
        let device = device.vk_device.clone();
        move || unsafe { device.destroy_pipeline_layout(layout, None) }
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, pipeline) = (device.vk_device.clone(), self.vk_pipeline);
        move || unsafe { device.destroy_pipeline(pipeline, None) }
    }
}
