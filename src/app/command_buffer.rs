use super::app_data;
use super::app_defines;
use super::draw_list::DrawList;

use anyhow::Result;
use log::*;
use std::mem::size_of;
use nalgebra_glm as glm;
use vulkanalia::prelude::v1_2::*;
use vulkanalia::vk::DeviceV1_3;

/// Stage at which a submit waits on the image-acquired semaphore.
pub const ACQUIRE_WAIT_STAGE: vk::PipelineStageFlags = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;

/// `(source, destination)` pairs for one image layout transition.
#[derive(Copy, Clone, Debug)]
struct LayoutTransition {
    layouts: (vk::ImageLayout, vk::ImageLayout),
    access: (vk::AccessFlags2, vk::AccessFlags2),
    stages: (vk::PipelineStageFlags2, vk::PipelineStageFlags2),
}

/// Starts at the acquire wait stage so the transition happens after the
/// presentation engine has released the image.
const TO_ATTACHMENT: LayoutTransition = LayoutTransition {
    layouts: (vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
    access: (vk::AccessFlags2::empty(), vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
    stages: (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT),
};

const TO_PRESENT: LayoutTransition = LayoutTransition {
    layouts: (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR),
    access: (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, vk::AccessFlags2::empty()),
    stages: (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags2::BOTTOM_OF_PIPE),
};

pub unsafe fn create_command_pool(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(data.queue_families.graphics);

    data.command_pool = device.create_command_pool(&info, None)?;

    Ok(())
}

/// One primary command buffer per frame slot, reused for the engine's lifetime.
pub unsafe fn create_command_buffers(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(data.command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(app_defines::MAX_FRAMES_IN_FLIGHT as u32);

    data.command_buffers = device.allocate_command_buffers(&info)?;

    Ok(())
}

/// Re-records the command buffer of `slot` to draw `draw_list` into the
/// swapchain image `image_index`, in submission order.
pub unsafe fn record(
    device: &Device,
    data: &app_data::Data,
    slot: usize,
    image_index: usize,
    draw_list: &DrawList,
) -> Result<()> {
    let command_buffer = data.command_buffers[slot];
    let image = data.swapchain_images[image_index];

    device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

    let info = vk::CommandBufferBeginInfo::builder();
    device.begin_command_buffer(command_buffer, &info)?;

    transition_image_layout(device, command_buffer, image, TO_ATTACHMENT);

    // Rendering

    let clear_value = vk::ClearValue {
        color: vk::ClearColorValue { float32: app_defines::CLEAR_COLOR },
    };

    let color_attachment = vk::RenderingAttachmentInfo::builder()
        .image_view(data.swapchain_image_views[image_index])
        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .clear_value(clear_value);

    let render_area = vk::Rect2D::builder()
        .offset(vk::Offset2D::default())
        .extent(data.swapchain_extent)
        .build();

    let color_attachments = &[color_attachment];
    let rendering_info = vk::RenderingInfo::builder()
        .render_area(render_area)
        .layer_count(1)
        .color_attachments(color_attachments);

    device.cmd_begin_rendering(command_buffer, &rendering_info);
    device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, data.pipeline);

    let viewport = vk::Viewport::builder()
        .x(0.0)
        .y(0.0)
        .width(data.swapchain_extent.width as f32)
        .height(data.swapchain_extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0);
    device.cmd_set_viewport(command_buffer, 0, &[viewport]);
    device.cmd_set_scissor(command_buffer, 0, &[render_area]);

    device.cmd_bind_descriptor_sets(
        command_buffer,
        vk::PipelineBindPoint::GRAPHICS,
        data.pipeline_layout,
        0,
        &[data.descriptor_sets[slot]],
        &[],
    );

    if draw_list.is_empty() {
        trace!("Recording a clear-only frame.");
    }

    for command in draw_list.iter() {
        device.cmd_bind_vertex_buffers(command_buffer, 0, &[command.vertex_buffer], &[0]);
        device.cmd_bind_index_buffer(command_buffer, command.index_buffer, 0, vk::IndexType::UINT16);
        device.cmd_push_constants(
            command_buffer,
            data.pipeline_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            model_bytes(&command.model),
        );
        device.cmd_draw_indexed(command_buffer, command.index_count, 1, 0, 0, 0);
    }

    device.cmd_end_rendering(command_buffer);

    transition_image_layout(device, command_buffer, image, TO_PRESENT);

    device.end_command_buffer(command_buffer)?;

    Ok(())
}

unsafe fn transition_image_layout(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    transition: LayoutTransition,
) {
    let LayoutTransition {
        layouts: (old_layout, new_layout),
        access: (src_access_mask, dst_access_mask),
        stages: (src_stage_mask, dst_stage_mask),
    } = transition;

    let subresource = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let barrier = vk::ImageMemoryBarrier2::builder()
        .src_stage_mask(src_stage_mask)
        .src_access_mask(src_access_mask)
        .dst_stage_mask(dst_stage_mask)
        .dst_access_mask(dst_access_mask)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(subresource);

    let barriers = &[barrier];
    let info = vk::DependencyInfo::builder().image_memory_barriers(barriers);

    device.cmd_pipeline_barrier2(command_buffer, &info);
}

fn model_bytes(model: &glm::Mat4) -> &[u8] {
    // SAFETY: a Mat4 is 16 contiguous f32s.
    unsafe { std::slice::from_raw_parts(model as *const glm::Mat4 as *const u8, size_of::<glm::Mat4>()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::pipeline;

    #[test]
    fn model_push_constant_matches_range() {
        let model = glm::translation(&glm::vec3(1.0, 2.0, 3.0));
        let bytes = model_bytes(&model);

        assert_eq!(bytes.len() as u32, pipeline::PUSH_CONSTANT_SIZE);
        // Column-major: the translation sits in the last column.
        let x = f32::from_ne_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]);
        assert_eq!(x, 1.0);
    }

    #[test]
    fn attachment_transition_waits_for_image_acquisition() {
        let (src_stage, _) = TO_ATTACHMENT.stages;
        assert_eq!(src_stage.bits(), u64::from(ACQUIRE_WAIT_STAGE.bits()));
        assert_ne!(src_stage, vk::PipelineStageFlags2::TOP_OF_PIPE);
    }

    #[test]
    fn transitions_chain_into_present_layout() {
        assert_eq!(TO_ATTACHMENT.layouts.1, TO_PRESENT.layouts.0);
        assert_eq!(TO_PRESENT.layouts.1, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(TO_ATTACHMENT.access.1, TO_PRESENT.access.0);
    }
}
