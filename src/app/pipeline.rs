use super::app_data;
use super::app_defines;
use super::shader;
use super::vertex::Vertex;

use anyhow::Result;
use log::*;
use nalgebra_glm as glm;
use std::mem::size_of;
use vulkanalia::prelude::v1_2::*;

/// Size of the per-object model matrix pushed at draw time.
pub const PUSH_CONSTANT_SIZE: u32 = size_of::<glm::Mat4>() as u32;

/// Builds the single graphics pipeline. Viewport and scissor are dynamic
/// and rendering targets the swapchain format directly, so resizes never
/// require a rebuild.
pub unsafe fn create_pipeline(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let vert = shader::load(app_defines::VERTEX_SHADER_PATH)?;
    let frag = shader::load(app_defines::FRAGMENT_SHADER_PATH)?;

    let vert_shader_module = shader::create_shader_module(device, &vert)?;
    let frag_shader_module = match shader::create_shader_module(device, &frag) {
        Ok(module) => module,
        Err(e) => {
            device.destroy_shader_module(vert_shader_module, None);
            return Err(e);
        }
    };

    let result = create_pipeline_with_modules(device, data, vert_shader_module, frag_shader_module);

    device.destroy_shader_module(vert_shader_module, None);
    device.destroy_shader_module(frag_shader_module, None);

    result
}

unsafe fn create_pipeline_with_modules(
    device: &Device,
    data: &mut app_data::Data,
    vert_shader_module: vk::ShaderModule,
    frag_shader_module: vk::ShaderModule,
) -> Result<()> {
    // Stages

    let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::VERTEX)
        .module(vert_shader_module)
        .name(app_defines::SHADER_ENTRY_POINT);

    let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::FRAGMENT)
        .module(frag_shader_module)
        .name(app_defines::SHADER_ENTRY_POINT);

    // Vertex Input State

    let binding_descriptions = &[Vertex::binding_description()];
    let attribute_descriptions = Vertex::attribute_descriptions();
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(binding_descriptions)
        .vertex_attribute_descriptions(&attribute_descriptions);

    // Input Assembly State

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Viewport State (the actual values are set while recording)

    let viewport = vk::Viewport::builder()
        .x(0.0)
        .y(0.0)
        .width(data.swapchain_extent.width as f32)
        .height(data.swapchain_extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0);

    let scissor = vk::Rect2D::builder()
        .offset(vk::Offset2D { x: 0, y: 0 })
        .extent(data.swapchain_extent);

    let viewports = &[viewport];
    let scissors = &[scissor];
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewports(viewports)
        .scissors(scissors);

    let dynamic_states = &[vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(dynamic_states);

    // Rasterization State

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    // Multisample State

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::_1);

    // Color Blend State

    let attachment = vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::all())
        .blend_enable(false);

    let attachments = &[attachment];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .logic_op(vk::LogicOp::COPY)
        .attachments(attachments)
        .blend_constants([0.0, 0.0, 0.0, 0.0]);

    // Layout

    let push_constant_range = vk::PushConstantRange::builder()
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .offset(0)
        .size(PUSH_CONSTANT_SIZE);

    let set_layouts = &[data.descriptor_set_layout];
    let push_constant_ranges = &[push_constant_range];
    let layout_info = vk::PipelineLayoutCreateInfo::builder()
        .set_layouts(set_layouts)
        .push_constant_ranges(push_constant_ranges);

    data.pipeline_layout = device.create_pipeline_layout(&layout_info, None)?;

    // Dynamic Rendering

    let color_attachment_formats = &[data.swapchain_format];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::builder()
        .color_attachment_formats(color_attachment_formats);

    // Create

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
        .layout(data.pipeline_layout)
        .push_next(&mut rendering_info);

    data.pipeline = device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)?.0[0];

    debug!("Created graphics pipeline for {:?}.", data.swapchain_format);

    Ok(())
}

pub unsafe fn destroy(device: &Device, data: &mut app_data::Data) {
    device.destroy_pipeline(data.pipeline, None);
    device.destroy_pipeline_layout(data.pipeline_layout, None);
    data.pipeline = vk::Pipeline::null();
    data.pipeline_layout = vk::PipelineLayout::null();
}
